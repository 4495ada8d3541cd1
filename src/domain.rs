//! Domain models: blueprints, question bank items, questionnaires, sessions and results.
//!
//! Field names follow the document store's camelCase shape so the same structs
//! round-trip through JSON bodies, TOML content banks and session documents.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::levels::{ActflLevel, CefrLevel, DifficultyLabel, DifficultyStandard};

/// Question selection algorithm configured on a blueprint.
///
/// Unknown names are kept as `Other` so a blueprint still loads and the
/// engine can report it as not implemented when a test is started.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Strategy {
  Linear,
  RandomizedPool,
  AdaptiveRuleBased,
  Other(String),
}

impl From<String> for Strategy {
  fn from(s: String) -> Self {
    match s.as_str() {
      "linear" => Strategy::Linear,
      "randomized_pool" => Strategy::RandomizedPool,
      "adaptive_rule_based" => Strategy::AdaptiveRuleBased,
      _ => Strategy::Other(s),
    }
  }
}

impl From<Strategy> for String {
  fn from(s: Strategy) -> Self {
    s.as_str().to_string()
  }
}

impl Strategy {
  pub fn as_str(&self) -> &str {
    match self {
      Strategy::Linear => "linear",
      Strategy::RandomizedPool => "randomized_pool",
      Strategy::AdaptiveRuleBased => "adaptive_rule_based",
      Strategy::Other(s) => s,
    }
  }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PoolConfig {
  #[serde(default = "default_pool_size")]
  pub pool_size: usize,
}
impl Default for PoolConfig {
  fn default() -> Self { Self { pool_size: default_pool_size() } }
}
fn default_pool_size() -> usize { 10 }

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdaptiveConfig {
  /// Starting level on the 1..N scale of `difficulty_standard`; clamped on use.
  #[serde(default = "default_initial_difficulty")]
  pub initial_difficulty: i64,
  #[serde(default)]
  pub difficulty_standard: DifficultyStandard,
  #[serde(default = "default_max_questions")]
  pub max_questions: u32,
}
impl Default for AdaptiveConfig {
  fn default() -> Self {
    Self {
      initial_difficulty: default_initial_difficulty(),
      difficulty_standard: DifficultyStandard::default(),
      max_questions: default_max_questions(),
    }
  }
}
fn default_initial_difficulty() -> i64 { 1 }
fn default_max_questions() -> u32 { 10 }

/// Immutable per-test configuration authored in the CMS.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestBlueprint {
  pub id: String,
  #[serde(default)] pub title: String,
  pub strategy: Strategy,
  #[serde(default)] pub pre_test_questionnaire: Option<String>,
  #[serde(default)] pub post_test_questionnaire: Option<String>,
  #[serde(default)] pub linear_questions: Vec<String>,
  #[serde(default)] pub pool_config: PoolConfig,
  #[serde(default)] pub adaptive_config: AdaptiveConfig,
}

impl TestBlueprint {
  /// First id listed twice in `linear_questions`. Such a blueprint cannot complete:
  /// a second answer to the same id replays instead of recording.
  pub fn repeated_linear_question(&self) -> Option<&str> {
    self
      .linear_questions
      .iter()
      .enumerate()
      .find(|(i, id)| self.linear_questions[..*i].contains(id))
      .map(|(_, id)| id.as_str())
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
  MultipleChoice,
  FillBlank,
  Matching,
  ListeningComprehension,
  ReadingComprehension,
  Speaking,
}

impl QuestionKind {
  /// Kinds answered by picking one option index.
  pub fn is_choice(self) -> bool {
    matches!(
      self,
      QuestionKind::MultipleChoice | QuestionKind::ListeningComprehension | QuestionKind::ReadingComprehension
    )
  }
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerOption {
  pub text: String,
  #[serde(default)] pub is_correct: bool,
}

/// One gap of a fill-blank question; `accept` is a `|`-separated list.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Blank {
  pub accept: String,
}

/// Matching pairs are aligned by construction: left `i` belongs with right `i`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct MatchPair {
  pub left: String,
  pub right: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionBankItem {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: QuestionKind,
  #[serde(default)] pub prompt: String,
  #[serde(default)] pub passage: Option<String>,
  #[serde(default)] pub audio_url: Option<String>,
  #[serde(default)] pub options: Vec<AnswerOption>,
  #[serde(default)] pub blanks: Vec<Blank>,
  #[serde(default)] pub pairs: Vec<MatchPair>,
  #[serde(default)] pub difficulty_cefr: Option<CefrLevel>,
  #[serde(default)] pub difficulty_actfl: Option<ActflLevel>,
  #[serde(default)] pub tags: Vec<String>,
}

impl QuestionBankItem {
  /// Difficulty label under one standard; the other scheme is never consulted.
  pub fn difficulty(&self, standard: DifficultyStandard) -> Option<DifficultyLabel> {
    match standard {
      DifficultyStandard::Cefr => self.difficulty_cefr.map(DifficultyLabel::Cefr),
      DifficultyStandard::Actfl => self.difficulty_actfl.map(DifficultyLabel::Actfl),
    }
  }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionnaireItemKind {
  #[default]
  FreeText,
  Choice,
  Scale,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireItem {
  pub id: String,
  pub prompt: String,
  #[serde(default)] pub kind: QuestionnaireItemKind,
  #[serde(default, skip_serializing_if = "Vec::is_empty")]
  pub options: Vec<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scale_min: Option<i32>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub scale_max: Option<i32>,
}

/// Pre/post survey; answers are stored but never scored.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Questionnaire {
  pub id: String,
  #[serde(default)] pub title: String,
  #[serde(default)] pub questions: Vec<QuestionnaireItem>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDescription {
  pub standard: DifficultyStandard,
  /// Label code, e.g. "B1" or "intermediate_mid".
  pub level: String,
  pub title: String,
  pub description: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
  Started,
  Completed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Estimate {
  pub level: u8,
  pub questions_count: u32,
}

/// Record of one answered question. Never edited after it is appended.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryItem {
  pub question_id: String,
  pub tags: Vec<String>,
  /// Always a JSON object; primitives are wrapped as `{"value": ...}`.
  pub user_answer: Value,
  pub readable_answer: String,
  pub is_correct: bool,
  pub awarded_score: u32,
  pub time_taken: f64,
  pub timestamp: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub submission_id: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionnaireAnswer {
  pub questionnaire_id: String,
  pub answers: Value,
  pub submitted_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillScore {
  pub correct: u32,
  pub total: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalResult {
  pub score: u32,
  pub max_score: u32,
  pub percentage: u32,
  pub passed: bool,
  pub skill_breakdown: BTreeMap<String, SkillScore>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub standard: Option<DifficultyStandard>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level_title: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub level_description: Option<String>,
}

/// Mutable state machine instance. Only the session engine writes it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestSession {
  pub id: String,
  pub blueprint_id: String,
  pub status: SessionStatus,
  pub start_time: DateTime<Utc>,
  #[serde(default)] pub end_time: Option<DateTime<Utc>>,
  #[serde(default)] pub history: Vec<HistoryItem>,
  #[serde(default)] pub questionnaire_answers: Vec<QuestionnaireAnswer>,
  #[serde(default)] pub generated_questions: Option<Vec<String>>,
  #[serde(default)] pub current_estimate: Option<Estimate>,
  /// Question served last and not answered yet.
  #[serde(default)] pub current_question: Option<String>,
  #[serde(default)] pub final_result: Option<FinalResult>,
  #[serde(default)] pub version: u64,
}

impl TestSession {
  pub fn new(id: String, blueprint_id: String, estimate: Option<Estimate>) -> Self {
    Self {
      id,
      blueprint_id,
      status: SessionStatus::Started,
      start_time: Utc::now(),
      end_time: None,
      history: Vec::new(),
      questionnaire_answers: Vec::new(),
      generated_questions: None,
      current_estimate: estimate,
      current_question: None,
      final_result: None,
      version: 0,
    }
  }

  pub fn answered_ids(&self) -> Vec<String> {
    self.history.iter().map(|h| h.question_id.clone()).collect()
  }

  /// True when this answer was already recorded, matched by idempotency key or question id.
  pub fn already_answered(&self, question_id: &str, submission_id: Option<&str>) -> bool {
    self.history.iter().any(|h| {
      h.question_id == question_id
        || matches!((submission_id, h.submission_id.as_deref()), (Some(a), Some(b)) if a == b)
    })
  }

  pub fn has_questionnaire(&self, questionnaire_id: &str) -> bool {
    self.questionnaire_answers.iter().any(|q| q.questionnaire_id == questionnaire_id)
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use serde_json::json;

  #[test]
  fn strategy_parses_known_and_unknown_names() {
    let s: Strategy = serde_json::from_value(json!("randomized_pool")).unwrap();
    assert_eq!(s, Strategy::RandomizedPool);
    let s: Strategy = serde_json::from_value(json!("irt_3pl")).unwrap();
    assert_eq!(s, Strategy::Other("irt_3pl".into()));
    assert_eq!(serde_json::to_value(Strategy::AdaptiveRuleBased).unwrap(), json!("adaptive_rule_based"));
  }

  #[test]
  fn blueprint_defaults_fill_missing_configs() {
    let bp: TestBlueprint = serde_json::from_value(json!({
      "id": "bp1",
      "strategy": "adaptive_rule_based",
      "adaptiveConfig": { "difficultyStandard": "actfl" }
    }))
    .unwrap();
    assert_eq!(bp.adaptive_config.difficulty_standard, DifficultyStandard::Actfl);
    assert_eq!(bp.adaptive_config.initial_difficulty, 1);
    assert_eq!(bp.adaptive_config.max_questions, 10);
    assert_eq!(bp.pool_config.pool_size, 10);
    assert!(bp.linear_questions.is_empty());
  }

  #[test]
  fn repeated_linear_question_is_reported() {
    let mut bp: TestBlueprint = serde_json::from_value(json!({
      "id": "bp1",
      "strategy": "linear",
      "linearQuestions": ["q1", "q2", "q3"]
    }))
    .unwrap();
    assert_eq!(bp.repeated_linear_question(), None);
    bp.linear_questions = vec!["q1".into(), "q2".into(), "q1".into()];
    assert_eq!(bp.repeated_linear_question(), Some("q1"));
  }

  #[test]
  fn question_reads_only_the_requested_scheme() {
    let q: QuestionBankItem = serde_json::from_value(json!({
      "id": "q1",
      "type": "multiple_choice",
      "difficultyCefr": "B1",
      "options": [{ "text": "a", "isCorrect": true }]
    }))
    .unwrap();
    assert_eq!(q.difficulty(DifficultyStandard::Cefr), Some(DifficultyLabel::Cefr(CefrLevel::B1)));
    assert_eq!(q.difficulty(DifficultyStandard::Actfl), None);
    assert!(q.options[0].is_correct);
  }

  #[test]
  fn already_answered_matches_question_or_submission_key() {
    let mut s = TestSession::new("s1".into(), "bp".into(), None);
    s.history.push(HistoryItem {
      question_id: "q1".into(),
      tags: vec![],
      user_answer: json!({ "value": 0 }),
      readable_answer: "a".into(),
      is_correct: true,
      awarded_score: 1,
      time_taken: 0.0,
      timestamp: Utc::now(),
      submission_id: Some("k1".into()),
    });
    assert!(s.already_answered("q1", None));
    assert!(s.already_answered("q2", Some("k1")));
    assert!(!s.already_answered("q2", Some("k2")));
    assert!(!s.already_answered("q2", None));
  }
}
