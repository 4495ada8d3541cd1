//! Small utility helpers used across modules.

use serde_json::Value;

/// Normalize free text for lenient equality: trimmed and lower-cased.
pub fn normalize(s: &str) -> String {
  s.trim().to_lowercase()
}

/// Compact JSON text of any value. Falls back to an empty string, never panics.
pub fn compact_json(v: &Value) -> String {
  serde_json::to_string(v).unwrap_or_default()
}

/// Wrap a non-object JSON value as `{"value": v}` so stores never receive a bare scalar.
pub fn wrap_object(v: Value) -> Value {
  match v {
    Value::Object(_) => v,
    other => serde_json::json!({ "value": other }),
  }
}

/// Log-safe truncation for large strings.
/// Avoids spamming logs with huge answers; cuts on a char boundary.
pub fn trunc_for_log(s: &str, max: usize) -> String {
  if s.len() <= max {
    return s.to_string();
  }
  let cut = s.char_indices().map(|(i, _)| i).take_while(|i| *i <= max).last().unwrap_or(0);
  format!("{}… ({} bytes total)", &s[..cut], s.len())
}
