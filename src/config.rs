//! Runtime settings (environment) and the TOML content bank.
//!
//! The content bank mirrors the document store shape, so keys are camelCase:
//!
//! ```toml
//! [[blueprints]]
//! id = "fr-placement"
//! strategy = "adaptive_rule_based"
//! adaptiveConfig = { initialDifficulty = 2, difficultyStandard = "cefr", maxQuestions = 8 }
//!
//! [[questions]]
//! id = "fr-001"
//! type = "fill_blank"
//! prompt = "La capitale de la France est ___."
//! blanks = [{ accept = "Paris" }]
//! difficultyCefr = "A1"
//! tags = ["culture"]
//! ```

use std::net::SocketAddr;

use serde::Deserialize;
use tracing::{error, info, warn};

use crate::domain::{LevelDescription, QuestionBankItem, Questionnaire, TestBlueprint};

/// Content loaded from TOML: everything the engine reads but never writes.
#[derive(Clone, Debug, Deserialize, Default)]
pub struct ContentConfig {
  #[serde(default)]
  pub blueprints: Vec<TestBlueprint>,
  #[serde(default)]
  pub questions: Vec<QuestionBankItem>,
  #[serde(default)]
  pub questionnaires: Vec<Questionnaire>,
  #[serde(default)]
  pub level_descriptions: Vec<LevelDescription>,
}

/// Process settings read from the environment.
#[derive(Clone, Debug)]
pub struct Settings {
  pub addr: SocketAddr,
  /// Path to the TOML content bank (TEST_CONTENT_PATH).
  pub content_path: Option<String>,
  /// Fixed seed for pool draws (SELECTION_SEED); entropy when absent.
  pub selection_seed: Option<u64>,
}

impl Settings {
  pub fn from_env() -> Self {
    Self::from_lookup(|k| std::env::var(k).ok())
  }

  /// Build from any key lookup; invalid values fall back to defaults with a warning.
  pub fn from_lookup(get: impl Fn(&str) -> Option<String>) -> Self {
    let port = match get("PORT") {
      Some(p) => p.parse::<u16>().unwrap_or_else(|e| {
        warn!(target: "lingotest_backend", port = %p, error = %e, "Invalid PORT; using 3000");
        3000
      }),
      None => 3000,
    };
    let selection_seed = get("SELECTION_SEED").and_then(|s| match s.parse::<u64>() {
      Ok(v) => Some(v),
      Err(e) => {
        warn!(target: "lingotest_backend", seed = %s, error = %e, "Invalid SELECTION_SEED; using entropy");
        None
      }
    });
    Self {
      addr: SocketAddr::from(([0, 0, 0, 0], port)),
      content_path: get("TEST_CONTENT_PATH").filter(|p| !p.trim().is_empty()),
      selection_seed,
    }
  }
}

pub fn parse_content(s: &str) -> Result<ContentConfig, toml::de::Error> {
  toml::from_str::<ContentConfig>(s)
}

/// Attempt to load the content bank from `path`. On any parsing/IO error, returns None.
pub fn load_content(path: &str) -> Option<ContentConfig> {
  match std::fs::read_to_string(path) {
    Ok(s) => match parse_content(&s) {
      Ok(cfg) => {
        info!(
          target: "lingotest_backend",
          %path,
          blueprints = cfg.blueprints.len(),
          questions = cfg.questions.len(),
          questionnaires = cfg.questionnaires.len(),
          level_descriptions = cfg.level_descriptions.len(),
          "Loaded content bank (TOML)"
        );
        Some(cfg)
      }
      Err(e) => {
        error!(target: "lingotest_backend", %path, error = %e, "Failed to parse TOML content bank");
        None
      }
    },
    Err(e) => {
      error!(target: "lingotest_backend", %path, error = %e, "Failed to read TOML content bank");
      None
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::collections::HashMap;

  use crate::domain::{QuestionKind, Strategy};
  use crate::levels::{ActflLevel, DifficultyStandard};

  #[test]
  fn settings_defaults_and_overrides() {
    let s = Settings::from_lookup(|_| None);
    assert_eq!(s.addr.port(), 3000);
    assert!(s.content_path.is_none());
    assert!(s.selection_seed.is_none());

    let env: HashMap<&str, &str> =
      [("PORT", "8088"), ("TEST_CONTENT_PATH", "bank.toml"), ("SELECTION_SEED", "42")].into_iter().collect();
    let s = Settings::from_lookup(|k| env.get(k).map(|v| v.to_string()));
    assert_eq!(s.addr.port(), 8088);
    assert_eq!(s.content_path.as_deref(), Some("bank.toml"));
    assert_eq!(s.selection_seed, Some(42));
  }

  #[test]
  fn settings_ignore_garbage() {
    let s = Settings::from_lookup(|k| match k {
      "PORT" => Some("eighty".into()),
      "SELECTION_SEED" => Some("-1".into()),
      _ => None,
    });
    assert_eq!(s.addr.port(), 3000);
    assert!(s.selection_seed.is_none());
  }

  #[test]
  fn parses_full_content_bank() {
    let cfg = parse_content(
      r#"
      [[blueprints]]
      id = "es-adaptive"
      strategy = "adaptive_rule_based"
      postTestQuestionnaire = "exit"
      adaptiveConfig = { initialDifficulty = 4, difficultyStandard = "actfl", maxQuestions = 5 }

      [[blueprints]]
      id = "future"
      strategy = "item_response_theory"

      [[questions]]
      id = "es-1"
      type = "multiple_choice"
      prompt = "¿Cómo estás?"
      options = [{ text = "Bien", isCorrect = true }, { text = "Azul" }]
      difficultyActfl = "intermediate_low"
      tags = ["conversation"]

      [[questionnaires]]
      id = "exit"
      title = "How did it go?"
      questions = [{ id = "ease", prompt = "How hard was it?", kind = "scale", scaleMin = 1, scaleMax = 5 }]

      [[level_descriptions]]
      standard = "actfl"
      level = "intermediate_low"
      title = "Intermediate Low"
      description = "Can handle simple, uncomplicated tasks."
      "#,
    )
    .unwrap();

    assert_eq!(cfg.blueprints.len(), 2);
    assert_eq!(cfg.blueprints[0].adaptive_config.difficulty_standard, DifficultyStandard::Actfl);
    assert_eq!(cfg.blueprints[0].post_test_questionnaire.as_deref(), Some("exit"));
    assert_eq!(cfg.blueprints[1].strategy, Strategy::Other("item_response_theory".into()));
    assert_eq!(cfg.questions[0].kind, QuestionKind::MultipleChoice);
    assert_eq!(cfg.questions[0].difficulty_actfl, Some(ActflLevel::IntermediateLow));
    assert!(!cfg.questions[0].options[1].is_correct);
    assert_eq!(cfg.questionnaires[0].questions[0].scale_max, Some(5));
    assert_eq!(cfg.level_descriptions[0].level, "intermediate_low");
  }

  #[test]
  fn broken_toml_is_an_error() {
    assert!(parse_content("[[blueprints]]\nid = 3").is_err());
  }

  #[test]
  fn missing_file_yields_none() {
    assert!(load_content("/definitely/not/here.toml").is_none());
  }
}
