//! Answer validation per question type.
//!
//! Raw JSON answers are parsed at the boundary into an [`Answer`] shaped by the
//! question type, then scored all-or-nothing. Rendering of the readable answer
//! never fails: anything it cannot render falls back to compact JSON.

use std::collections::BTreeMap;

use serde_json::Value;

use crate::domain::{QuestionBankItem, QuestionKind};
use crate::util::{compact_json, normalize, wrap_object};

/// Typed answer payload.
#[derive(Clone, Debug, PartialEq)]
pub enum Answer {
  /// Option index for choice-based questions.
  Index(i64),
  /// One string per blank.
  Strings(Vec<String>),
  /// Left index → right index.
  Pairs(BTreeMap<usize, usize>),
  /// Anything else: speaking payloads, or answers of the wrong shape.
  Blob(Value),
}

impl Answer {
  pub fn parse(kind: QuestionKind, raw: &Value) -> Answer {
    let parsed = match kind {
      k if k.is_choice() => as_int(raw).map(Answer::Index),
      QuestionKind::FillBlank => parse_strings(raw).map(Answer::Strings),
      QuestionKind::Matching => parse_pairs(raw).map(Answer::Pairs),
      _ => None,
    };
    parsed.unwrap_or_else(|| Answer::Blob(raw.clone()))
  }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Validation {
  pub is_correct: bool,
  /// Binary for every type: 1 when correct, 0 otherwise.
  pub score: u32,
  pub normalized_answer: Value,
  pub readable_answer: String,
}

pub fn validate(question: &QuestionBankItem, raw: &Value) -> Validation {
  let answer = Answer::parse(question.kind, raw);
  let is_correct = is_correct(question, &answer);
  Validation {
    is_correct,
    score: u32::from(is_correct),
    normalized_answer: wrap_object(raw.clone()),
    readable_answer: render(question, &answer).unwrap_or_else(|| compact_json(raw)),
  }
}

fn is_correct(question: &QuestionBankItem, answer: &Answer) -> bool {
  match (question.kind, answer) {
    (k, Answer::Index(i)) if k.is_choice() => usize::try_from(*i)
      .ok()
      .and_then(|i| question.options.get(i))
      .map(|o| o.is_correct)
      .unwrap_or(false),
    (QuestionKind::FillBlank, Answer::Strings(values)) => {
      !question.blanks.is_empty()
        && question.blanks.iter().enumerate().all(|(i, blank)| {
          let Some(given) = values.get(i) else { return false };
          let given = normalize(given);
          blank
            .accept
            .split('|')
            .map(normalize)
            .filter(|a| !a.is_empty())
            .any(|a| a == given)
        })
    }
    (QuestionKind::Matching, Answer::Pairs(map)) => {
      let n = question.pairs.len();
      n > 0 && map.len() == n && map.iter().all(|(l, r)| *l < n && l == r)
    }
    // Pronunciation is judged upstream; here any non-empty answer passes.
    (QuestionKind::Speaking, Answer::Blob(v)) => is_non_empty(v),
    _ => false,
  }
}

fn render(question: &QuestionBankItem, answer: &Answer) -> Option<String> {
  match answer {
    Answer::Index(i) => {
      let i = usize::try_from(*i).ok()?;
      question.options.get(i).map(|o| o.text.clone())
    }
    Answer::Strings(values) => Some(values.join(", ")),
    Answer::Pairs(map) => {
      let mut parts = Vec::with_capacity(map.len());
      for (l, r) in map {
        let left = &question.pairs.get(*l)?.left;
        let right = &question.pairs.get(*r)?.right;
        parts.push(format!("{left} → {right}"));
      }
      Some(parts.join("; "))
    }
    Answer::Blob(Value::String(s)) if question.kind == QuestionKind::Speaking => Some(s.clone()),
    Answer::Blob(_) => None,
  }
}

fn as_int(v: &Value) -> Option<i64> {
  match v {
    Value::Number(n) => n.as_i64(),
    Value::String(s) => s.trim().parse().ok(),
    _ => None,
  }
}

fn as_index(v: &Value) -> Option<usize> {
  as_int(v).and_then(|i| usize::try_from(i).ok())
}

fn parse_strings(v: &Value) -> Option<Vec<String>> {
  match v {
    Value::String(s) => Some(vec![s.clone()]),
    Value::Array(items) => items
      .iter()
      .map(|item| match item {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Null => Some(String::new()),
        _ => None,
      })
      .collect(),
    _ => None,
  }
}

/// Accepts `{"0": 0, "1": 1}`, `[[0, 0], [1, 1]]` or a plain `[0, 1]` (position = left).
fn parse_pairs(v: &Value) -> Option<BTreeMap<usize, usize>> {
  match v {
    Value::Object(map) => map
      .iter()
      .map(|(k, r)| Some((k.trim().parse::<usize>().ok()?, as_index(r)?)))
      .collect(),
    Value::Array(items) => items
      .iter()
      .enumerate()
      .map(|(pos, item)| match item {
        Value::Array(pair) if pair.len() == 2 => Some((as_index(&pair[0])?, as_index(&pair[1])?)),
        other => Some((pos, as_index(other)?)),
      })
      .collect(),
    _ => None,
  }
}

fn is_non_empty(v: &Value) -> bool {
  match v {
    Value::Null => false,
    Value::String(s) => !s.trim().is_empty(),
    Value::Array(a) => !a.is_empty(),
    Value::Object(o) => !o.is_empty(),
    Value::Bool(_) | Value::Number(_) => true,
  }
}
