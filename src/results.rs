//! Final result computation: score, pass/fail, per-skill breakdown, level verdict.

use std::collections::BTreeMap;

use tracing::debug;

use crate::domain::{FinalResult, HistoryItem, SkillScore};
use crate::error::EngineResult;
use crate::levels::DifficultyStandard;
use crate::store::ContentStore;

/// Strictly above this ratio passes.
pub const PASS_THRESHOLD: f64 = 0.6;

/// Score a history without any level verdict.
pub fn score_history(history: &[HistoryItem]) -> FinalResult {
  let score: u32 = history.iter().map(|h| h.awarded_score).sum();
  let max_score = history.len() as u32;
  let ratio = if max_score == 0 { 0.0 } else { f64::from(score) / f64::from(max_score) };

  let mut skill_breakdown: BTreeMap<String, SkillScore> = BTreeMap::new();
  for item in history {
    for tag in &item.tags {
      let entry = skill_breakdown.entry(tag.clone()).or_default();
      entry.total += 1;
      if item.is_correct {
        entry.correct += 1;
      }
    }
  }

  FinalResult {
    score,
    max_score,
    percentage: (ratio * 100.0).round() as u32,
    passed: max_score > 0 && ratio > PASS_THRESHOLD,
    skill_breakdown,
    standard: None,
    level: None,
    level_title: None,
    level_description: None,
  }
}

/// Full result; `adaptive` carries the standard and final level of adaptive sessions.
pub async fn aggregate(
  history: &[HistoryItem],
  adaptive: Option<(DifficultyStandard, u8)>,
  content: &dyn ContentStore,
) -> EngineResult<FinalResult> {
  let mut result = score_history(history);
  if let Some((standard, level)) = adaptive {
    let code = standard.label(i64::from(level)).code();
    result.standard = Some(standard);
    result.level = Some(code.to_string());
    match content.level_description(standard, code).await? {
      Some(d) => {
        result.level_title = Some(d.title);
        result.level_description = Some(d.description);
      }
      None => debug!(target: "test_session", standard = standard.as_str(), level = code, "No level description"),
    }
  }
  Ok(result)
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::Utc;
  use serde_json::json;

  use crate::domain::LevelDescription;
  use crate::store::MemoryContentStore;

  fn item(score: u32, tags: &[&str]) -> HistoryItem {
    HistoryItem {
      question_id: format!("q{}", tags.join("-")),
      tags: tags.iter().map(|t| t.to_string()).collect(),
      user_answer: json!({ "value": 0 }),
      readable_answer: String::new(),
      is_correct: score == 1,
      awarded_score: score,
      time_taken: 1.5,
      timestamp: Utc::now(),
      submission_id: None,
    }
  }

  #[test]
  fn two_of_three_passes_the_threshold() {
    let r = score_history(&[item(1, &[]), item(0, &[]), item(1, &[])]);
    assert_eq!(r.score, 2);
    assert_eq!(r.max_score, 3);
    assert_eq!(r.percentage, 67);
    assert!(r.passed);
  }

  #[test]
  fn exactly_sixty_percent_fails() {
    let r = score_history(&[item(1, &[]), item(1, &[]), item(1, &[]), item(0, &[]), item(0, &[])]);
    assert_eq!(r.percentage, 60);
    assert!(!r.passed);
  }

  #[test]
  fn empty_history_fails_without_dividing_by_zero() {
    let r = score_history(&[]);
    assert_eq!((r.score, r.max_score, r.percentage), (0, 0, 0));
    assert!(!r.passed);
    assert!(r.skill_breakdown.is_empty());
  }

  #[test]
  fn skill_breakdown_counts_per_tag() {
    let r = score_history(&[item(1, &["grammar"]), item(0, &["grammar"]), item(1, &["vocab"])]);
    assert_eq!(r.skill_breakdown.len(), 2);
    assert_eq!(r.skill_breakdown["grammar"], SkillScore { correct: 1, total: 2 });
    assert_eq!(r.skill_breakdown["vocab"], SkillScore { correct: 1, total: 1 });
  }

  #[test]
  fn multi_tag_items_count_toward_each_tag() {
    let r = score_history(&[item(0, &["listening", "vocab"])]);
    assert_eq!(r.skill_breakdown["listening"], SkillScore { correct: 0, total: 1 });
    assert_eq!(r.skill_breakdown["vocab"], SkillScore { correct: 0, total: 1 });
  }

  #[tokio::test]
  async fn adaptive_result_resolves_level_and_description() {
    let content = MemoryContentStore::new();
    content
      .insert_level_description(LevelDescription {
        standard: DifficultyStandard::Cefr,
        level: "B2".into(),
        title: "Upper intermediate".into(),
        description: "Can interact with a degree of fluency.".into(),
      })
      .await;

    let r = aggregate(&[item(1, &[])], Some((DifficultyStandard::Cefr, 4)), &content).await.unwrap();
    assert_eq!(r.standard, Some(DifficultyStandard::Cefr));
    assert_eq!(r.level.as_deref(), Some("B2"));
    assert_eq!(r.level_title.as_deref(), Some("Upper intermediate"));

    // No description for this level: fields simply omitted.
    let r = aggregate(&[item(1, &[])], Some((DifficultyStandard::Actfl, 20)), &content).await.unwrap();
    assert_eq!(r.level.as_deref(), Some("distinguished"));
    assert!(r.level_title.is_none());
    assert!(r.level_description.is_none());
    let v = serde_json::to_value(&r).unwrap();
    assert!(v.get("levelTitle").is_none());
  }

  #[tokio::test]
  async fn non_adaptive_result_has_no_level() {
    let content = MemoryContentStore::new();
    let r = aggregate(&[item(1, &["grammar"])], None, &content).await.unwrap();
    assert!(r.level.is_none());
    assert!(r.standard.is_none());
  }
}
