//! Built-in content so the service is usable without a TOML bank.

use crate::domain::{
  AdaptiveConfig, AnswerOption, Blank, LevelDescription, MatchPair, PoolConfig, QuestionBankItem, QuestionKind,
  Questionnaire, QuestionnaireItem, QuestionnaireItemKind, Strategy, TestBlueprint,
};
use crate::levels::{ActflLevel, CefrLevel, DifficultyStandard};

fn base(id: &str, kind: QuestionKind, prompt: &str, cefr: CefrLevel, actfl: ActflLevel, tags: &[&str]) -> QuestionBankItem {
  QuestionBankItem {
    id: id.into(),
    kind,
    prompt: prompt.into(),
    passage: None,
    audio_url: None,
    options: vec![],
    blanks: vec![],
    pairs: vec![],
    difficulty_cefr: Some(cefr),
    difficulty_actfl: Some(actfl),
    tags: tags.iter().map(|t| t.to_string()).collect(),
  }
}

fn options(correct: usize, texts: &[&str]) -> Vec<AnswerOption> {
  texts
    .iter()
    .enumerate()
    .map(|(i, t)| AnswerOption { text: t.to_string(), is_correct: i == correct })
    .collect()
}

fn blanks(accept: &[&str]) -> Vec<Blank> {
  accept.iter().map(|a| Blank { accept: a.to_string() }).collect()
}

fn pairs(items: &[(&str, &str)]) -> Vec<MatchPair> {
  items.iter().map(|(l, r)| MatchPair { left: l.to_string(), right: r.to_string() }).collect()
}

/// Small Mandarin question bank covering every question type and CEFR level.
pub fn seed_questions() -> Vec<QuestionBankItem> {
  use ActflLevel::*;
  use CefrLevel::*;
  use QuestionKind::*;

  let mut out = Vec::new();

  let mut q = base("zh-a1-01", MultipleChoice, "“你好” means…", A1, NoviceLow, &["vocab"]);
  q.options = options(1, &["Goodbye", "Hello", "Thank you"]);
  out.push(q);

  let mut q = base("zh-a1-02", Matching, "Match the numbers.", A1, NoviceMid, &["vocab"]);
  q.pairs = pairs(&[("一", "one"), ("二", "two"), ("三", "three")]);
  out.push(q);

  let mut q = base("zh-a2-01", FillBlank, "我___学生。(I am a student.)", A2, NoviceHigh, &["grammar"]);
  q.blanks = blanks(&["是|shi|shì"]);
  out.push(q);

  let mut q = base("zh-a2-02", ListeningComprehension, "Where does the speaker want to go?", A2, IntermediateLow, &["listening"]);
  q.audio_url = Some("media/zh-a2-02.mp3".into());
  q.options = options(0, &["北京", "上海", "广州"]);
  out.push(q);

  let mut q = base("zh-b1-01", MultipleChoice, "他昨天___北京。", B1, IntermediateMid, &["grammar"]);
  q.options = options(2, &["去", "去过了吗", "去了"]);
  out.push(q);

  let mut q = base("zh-b1-02", ReadingComprehension, "Why did Xiao Wang stay home?", B1, IntermediateHigh, &["reading"]);
  q.passage = Some("小王今天没有去上班，因为他感冒了。".into());
  q.options = options(1, &["He was on holiday", "He had a cold", "It was raining"]);
  out.push(q);

  let mut q = base("zh-b2-01", FillBlank, "___下雨，___我们还是去了公园。", B2, AdvancedLow, &["grammar"]);
  q.blanks = blanks(&["虽然", "但是|可是"]);
  out.push(q);

  let q = base("zh-b2-02", Speaking, "Describe your weekend in three sentences.", B2, AdvancedMid, &["speaking"]);
  out.push(q);

  let mut q = base("zh-c1-01", Matching, "Match each idiom with its meaning.", C1, AdvancedHigh, &["vocab", "idioms"]);
  q.pairs = pairs(&[("一举两得", "kill two birds with one stone"), ("画蛇添足", "overdo it"), ("马马虎虎", "so-so")]);
  out.push(q);

  let mut q = base("zh-c1-02", ReadingComprehension, "What is the author's attitude?", C1, Superior, &["reading"]);
  q.passage = Some("尽管城市化带来了便利，作者认为传统社区的人情味正在消失。".into());
  q.options = options(0, &["Ambivalent, with regret", "Wholly enthusiastic", "Indifferent"]);
  out.push(q);

  let mut q = base("zh-c2-01", MultipleChoice, "Which word best fits: 他的说法___，令人信服。", C2, Distinguished, &["vocab"]);
  q.options = options(1, &["莫名其妙", "有理有据", "半途而废"]);
  out.push(q);

  let q = base("zh-c2-02", Speaking, "Argue for or against remote work for two minutes.", C2, Distinguished, &["speaking"]);
  out.push(q);

  out
}

pub fn seed_questionnaires() -> Vec<Questionnaire> {
  vec![
    Questionnaire {
      id: "demo-pre".into(),
      title: "Before you start".into(),
      questions: vec![
        QuestionnaireItem {
          id: "goal".into(),
          prompt: "Why are you learning Chinese?".into(),
          kind: QuestionnaireItemKind::Choice,
          options: vec!["Travel".into(), "Work".into(), "Family".into(), "Other".into()],
          scale_min: None,
          scale_max: None,
        },
        QuestionnaireItem {
          id: "years".into(),
          prompt: "How long have you studied?".into(),
          kind: QuestionnaireItemKind::FreeText,
          options: vec![],
          scale_min: None,
          scale_max: None,
        },
      ],
    },
    Questionnaire {
      id: "demo-post".into(),
      title: "How did it go?".into(),
      questions: vec![QuestionnaireItem {
        id: "difficulty".into(),
        prompt: "How difficult did the test feel?".into(),
        kind: QuestionnaireItemKind::Scale,
        options: vec![],
        scale_min: Some(1),
        scale_max: Some(5),
      }],
    },
  ]
}

pub fn seed_blueprints() -> Vec<TestBlueprint> {
  vec![
    TestBlueprint {
      id: "demo-linear".into(),
      title: "Beginner check".into(),
      strategy: Strategy::Linear,
      pre_test_questionnaire: Some("demo-pre".into()),
      post_test_questionnaire: None,
      linear_questions: vec!["zh-a1-01".into(), "zh-a1-02".into(), "zh-a2-01".into(), "zh-a2-02".into()],
      pool_config: PoolConfig::default(),
      adaptive_config: AdaptiveConfig::default(),
    },
    TestBlueprint {
      id: "demo-pool".into(),
      title: "Random practice".into(),
      strategy: Strategy::RandomizedPool,
      pre_test_questionnaire: None,
      post_test_questionnaire: None,
      linear_questions: vec![],
      pool_config: PoolConfig { pool_size: 5 },
      adaptive_config: AdaptiveConfig::default(),
    },
    TestBlueprint {
      id: "demo-adaptive".into(),
      title: "Placement test (CEFR)".into(),
      strategy: Strategy::AdaptiveRuleBased,
      pre_test_questionnaire: None,
      post_test_questionnaire: Some("demo-post".into()),
      linear_questions: vec![],
      pool_config: PoolConfig::default(),
      adaptive_config: AdaptiveConfig {
        initial_difficulty: 2,
        difficulty_standard: DifficultyStandard::Cefr,
        max_questions: 6,
      },
    },
  ]
}

pub fn seed_level_descriptions() -> Vec<LevelDescription> {
  [
    ("A1", "Breakthrough", "Can understand and use familiar everyday expressions and very basic phrases."),
    ("A2", "Waystage", "Can communicate in simple and routine tasks on familiar topics."),
    ("B1", "Threshold", "Can deal with most situations likely to arise while travelling."),
    ("B2", "Vantage", "Can interact with a degree of fluency and spontaneity with native speakers."),
    ("C1", "Effective operational proficiency", "Can express ideas fluently and spontaneously without much obvious searching for expressions."),
    ("C2", "Mastery", "Can understand with ease virtually everything heard or read."),
  ]
  .into_iter()
  .map(|(level, title, description)| LevelDescription {
    standard: DifficultyStandard::Cefr,
    level: level.into(),
    title: title.into(),
    description: description.into(),
  })
  .collect()
}
