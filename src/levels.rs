//! Proficiency scales (CEFR, ACTFL) and the rule-based level adjustment.
//!
//! Levels are 1-based integers on each scale. Any index outside the scale is
//! clamped to the nearest valid label.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DifficultyStandard {
  #[default]
  Cefr,
  Actfl,
}

impl DifficultyStandard {
  pub fn as_str(self) -> &'static str {
    match self {
      DifficultyStandard::Cefr => "cefr",
      DifficultyStandard::Actfl => "actfl",
    }
  }

  /// Number of levels on the scale (N).
  pub fn scale_len(self) -> u8 {
    match self {
      DifficultyStandard::Cefr => CEFR_SCALE.len() as u8,
      DifficultyStandard::Actfl => ACTFL_SCALE.len() as u8,
    }
  }

  /// Clamp any integer into `1..=N`.
  pub fn clamp(self, level: i64) -> u8 {
    level.clamp(1, i64::from(self.scale_len())) as u8
  }

  /// Label for a 1-based level, clamped.
  pub fn label(self, level: i64) -> DifficultyLabel {
    let idx = usize::from(self.clamp(level)) - 1;
    match self {
      DifficultyStandard::Cefr => DifficultyLabel::Cefr(CEFR_SCALE[idx]),
      DifficultyStandard::Actfl => DifficultyLabel::Actfl(ACTFL_SCALE[idx]),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CefrLevel {
  A1,
  A2,
  B1,
  B2,
  C1,
  C2,
}

impl CefrLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      CefrLevel::A1 => "A1",
      CefrLevel::A2 => "A2",
      CefrLevel::B1 => "B1",
      CefrLevel::B2 => "B2",
      CefrLevel::C1 => "C1",
      CefrLevel::C2 => "C2",
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActflLevel {
  NoviceLow,
  NoviceMid,
  NoviceHigh,
  IntermediateLow,
  IntermediateMid,
  IntermediateHigh,
  AdvancedLow,
  AdvancedMid,
  AdvancedHigh,
  Superior,
  Distinguished,
}

impl ActflLevel {
  pub fn as_str(self) -> &'static str {
    match self {
      ActflLevel::NoviceLow => "novice_low",
      ActflLevel::NoviceMid => "novice_mid",
      ActflLevel::NoviceHigh => "novice_high",
      ActflLevel::IntermediateLow => "intermediate_low",
      ActflLevel::IntermediateMid => "intermediate_mid",
      ActflLevel::IntermediateHigh => "intermediate_high",
      ActflLevel::AdvancedLow => "advanced_low",
      ActflLevel::AdvancedMid => "advanced_mid",
      ActflLevel::AdvancedHigh => "advanced_high",
      ActflLevel::Superior => "superior",
      ActflLevel::Distinguished => "distinguished",
    }
  }
}

pub const CEFR_SCALE: [CefrLevel; 6] = [
  CefrLevel::A1,
  CefrLevel::A2,
  CefrLevel::B1,
  CefrLevel::B2,
  CefrLevel::C1,
  CefrLevel::C2,
];

pub const ACTFL_SCALE: [ActflLevel; 11] = [
  ActflLevel::NoviceLow,
  ActflLevel::NoviceMid,
  ActflLevel::NoviceHigh,
  ActflLevel::IntermediateLow,
  ActflLevel::IntermediateMid,
  ActflLevel::IntermediateHigh,
  ActflLevel::AdvancedLow,
  ActflLevel::AdvancedMid,
  ActflLevel::AdvancedHigh,
  ActflLevel::Superior,
  ActflLevel::Distinguished,
];

/// A difficulty label on one of the two scales; used as a bank query filter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DifficultyLabel {
  Cefr(CefrLevel),
  Actfl(ActflLevel),
}

impl DifficultyLabel {
  pub fn standard(self) -> DifficultyStandard {
    match self {
      DifficultyLabel::Cefr(_) => DifficultyStandard::Cefr,
      DifficultyLabel::Actfl(_) => DifficultyStandard::Actfl,
    }
  }

  pub fn code(self) -> &'static str {
    match self {
      DifficultyLabel::Cefr(l) => l.as_str(),
      DifficultyLabel::Actfl(l) => l.as_str(),
    }
  }
}

/// One step up on a correct answer, one step down otherwise, never leaving `1..=N`.
pub fn adjust(standard: DifficultyStandard, level: u8, correct: bool) -> u8 {
  let level = i64::from(level);
  let next = if correct { level + 1 } else { level - 1 };
  standard.clamp(next)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn scales_have_expected_lengths() {
    assert_eq!(DifficultyStandard::Cefr.scale_len(), 6);
    assert_eq!(DifficultyStandard::Actfl.scale_len(), 11);
  }

  #[test]
  fn labels_map_one_based_and_clamp() {
    assert_eq!(DifficultyStandard::Cefr.label(1).code(), "A1");
    assert_eq!(DifficultyStandard::Cefr.label(3).code(), "B1");
    assert_eq!(DifficultyStandard::Cefr.label(6).code(), "C2");
    assert_eq!(DifficultyStandard::Cefr.label(0).code(), "A1");
    assert_eq!(DifficultyStandard::Cefr.label(-4).code(), "A1");
    assert_eq!(DifficultyStandard::Cefr.label(99).code(), "C2");
    assert_eq!(DifficultyStandard::Actfl.label(1).code(), "novice_low");
    assert_eq!(DifficultyStandard::Actfl.label(5).code(), "intermediate_mid");
    assert_eq!(DifficultyStandard::Actfl.label(11).code(), "distinguished");
    assert_eq!(DifficultyStandard::Actfl.label(12).code(), "distinguished");
  }

  #[test]
  fn adjust_moves_one_step() {
    assert_eq!(adjust(DifficultyStandard::Cefr, 3, true), 4);
    assert_eq!(adjust(DifficultyStandard::Cefr, 3, false), 2);
  }

  #[test]
  fn adjust_never_leaves_scale() {
    for standard in [DifficultyStandard::Cefr, DifficultyStandard::Actfl] {
      let n = standard.scale_len();
      let mut level = 1u8;
      // Long runs in both directions plus an alternating tail.
      let pattern = std::iter::repeat(true)
        .take(30)
        .chain(std::iter::repeat(false).take(30))
        .chain((0..30).map(|i| i % 3 == 0));
      for correct in pattern {
        level = adjust(standard, level, correct);
        assert!((1..=n).contains(&level), "{standard:?} level {level} out of range");
      }
      assert_eq!(adjust(standard, n, true), n);
      assert_eq!(adjust(standard, 1, false), 1);
    }
  }

  #[test]
  fn label_serialization_matches_codes() {
    for l in CEFR_SCALE {
      assert_eq!(serde_json::to_value(l).unwrap(), serde_json::json!(l.as_str()));
    }
    for l in ACTFL_SCALE {
      assert_eq!(serde_json::to_value(l).unwrap(), serde_json::json!(l.as_str()));
    }
  }
}
