//! Question selection strategies.
//!
//! Every strategy implements [`QuestionSelector`]; the engine picks one from
//! the blueprint with [`selector_for`] and never branches on strategy names
//! itself.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use tracing::{debug, info, instrument};

use crate::domain::{Estimate, Strategy, TestBlueprint, TestSession};
use crate::error::{EngineError, EngineResult};
use crate::levels;
use crate::store::{ContentStore, QuestionQuery};

/// Shared seeded RNG; locked only for the duration of one shuffle.
pub type SharedRng = Arc<Mutex<StdRng>>;

/// Outcome of choosing the first question of a session.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FirstPick {
    pub question_id: Option<String>,
    /// Materialized draw order the engine must persist (randomized pool only).
    pub generated_questions: Option<Vec<String>>,
}

/// Outcome of choosing what follows an answered question.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct NextPick {
    pub next: Option<String>,
    pub finished: bool,
    /// Updated proficiency estimate (adaptive only).
    pub estimate: Option<Estimate>,
}

impl NextPick {
    fn next(id: String) -> Self {
        Self {
            next: Some(id),
            finished: false,
            estimate: None,
        }
    }

    fn finished() -> Self {
        Self {
            next: None,
            finished: true,
            estimate: None,
        }
    }

    fn with_estimate(mut self, estimate: Estimate) -> Self {
        self.estimate = Some(estimate);
        self
    }
}

#[async_trait]
pub trait QuestionSelector: Send + Sync {
    async fn select_first(&self, blueprint: &TestBlueprint, session: &TestSession) -> EngineResult<FirstPick>;

    /// `session.history` already contains the answer to `just_answered`.
    async fn select_next(
        &self,
        blueprint: &TestBlueprint,
        session: &TestSession,
        just_answered: &str,
        was_correct: bool,
    ) -> EngineResult<NextPick>;
}

/// Resolve the selector for a blueprint's strategy.
pub fn selector_for(
    blueprint: &TestBlueprint,
    content: Arc<dyn ContentStore>,
    rng: SharedRng,
) -> EngineResult<Box<dyn QuestionSelector>> {
    match &blueprint.strategy {
        Strategy::Linear => Ok(Box::new(LinearSelector)),
        Strategy::RandomizedPool => Ok(Box::new(RandomizedPoolSelector { content, rng })),
        Strategy::AdaptiveRuleBased => Ok(Box::new(AdaptiveSelector { content })),
        Strategy::Other(name) => Err(EngineError::StrategyNotImplemented {
            blueprint_id: blueprint.id.clone(),
            strategy: name.clone(),
        }),
    }
}

/// Item following `current` in `order`. A missing `current` ends the walk.
fn walk(order: &[String], current: &str) -> NextPick {
    match order.iter().position(|id| id == current) {
        Some(pos) => order.get(pos + 1).cloned().map(NextPick::next).unwrap_or_else(NextPick::finished),
        None => NextPick::finished(),
    }
}

/// Fixed order from `linearQuestions`.
pub struct LinearSelector;

#[async_trait]
impl QuestionSelector for LinearSelector {
    async fn select_first(&self, blueprint: &TestBlueprint, _session: &TestSession) -> EngineResult<FirstPick> {
        Ok(FirstPick {
            question_id: blueprint.linear_questions.first().cloned(),
            generated_questions: None,
        })
    }

    async fn select_next(
        &self,
        blueprint: &TestBlueprint,
        _session: &TestSession,
        just_answered: &str,
        _was_correct: bool,
    ) -> EngineResult<NextPick> {
        Ok(walk(&blueprint.linear_questions, just_answered))
    }
}

/// Draws `poolSize` questions once per session, then walks that order.
pub struct RandomizedPoolSelector {
    content: Arc<dyn ContentStore>,
    rng: SharedRng,
}

#[async_trait]
impl QuestionSelector for RandomizedPoolSelector {
    #[instrument(level = "debug", skip_all, fields(blueprint = %blueprint.id, pool_size = blueprint.pool_config.pool_size))]
    async fn select_first(&self, blueprint: &TestBlueprint, _session: &TestSession) -> EngineResult<FirstPick> {
        let bank = self.content.query_questions(&QuestionQuery::default()).await?;
        let mut ids: Vec<String> = bank.into_iter().map(|q| q.id).collect();
        {
            let mut rng = self
                .rng
                .lock()
                .map_err(|_| EngineError::Internal("selection rng lock poisoned".into()))?;
            ids.shuffle(&mut *rng);
        }
        ids.truncate(blueprint.pool_config.pool_size);
        debug!(target: "test_session", drawn = ids.len(), "Materialized randomized pool");
        Ok(FirstPick {
            question_id: ids.first().cloned(),
            generated_questions: Some(ids),
        })
    }

    async fn select_next(
        &self,
        _blueprint: &TestBlueprint,
        session: &TestSession,
        just_answered: &str,
        _was_correct: bool,
    ) -> EngineResult<NextPick> {
        Ok(match &session.generated_questions {
            Some(order) => walk(order, just_answered),
            None => NextPick::finished(),
        })
    }
}

/// One step up on a correct answer, one down otherwise; serves questions at the
/// current level until `maxQuestions` answers or the level runs dry.
pub struct AdaptiveSelector {
    content: Arc<dyn ContentStore>,
}

impl AdaptiveSelector {
    fn current_estimate(blueprint: &TestBlueprint, session: &TestSession) -> Estimate {
        let cfg = &blueprint.adaptive_config;
        session.current_estimate.unwrap_or(Estimate {
            level: cfg.difficulty_standard.clamp(cfg.initial_difficulty),
            questions_count: 0,
        })
    }
}

#[async_trait]
impl QuestionSelector for AdaptiveSelector {
    #[instrument(level = "debug", skip_all, fields(blueprint = %blueprint.id))]
    async fn select_first(&self, blueprint: &TestBlueprint, session: &TestSession) -> EngineResult<FirstPick> {
        let standard = blueprint.adaptive_config.difficulty_standard;
        let estimate = Self::current_estimate(blueprint, session);
        let label = standard.label(i64::from(estimate.level));

        let exact = self
            .content
            .query_questions(&QuestionQuery {
                difficulty: Some(label),
                exclude_ids: session.answered_ids(),
                limit: Some(1),
            })
            .await?;
        if let Some(q) = exact.into_iter().next() {
            return Ok(FirstPick {
                question_id: Some(q.id),
                generated_questions: None,
            });
        }

        // The opening question may come from anywhere in the bank.
        info!(target: "test_session", level = label.code(), "No question at initial level; falling back to whole bank");
        let any = self
            .content
            .query_questions(&QuestionQuery {
                difficulty: None,
                exclude_ids: session.answered_ids(),
                limit: Some(1),
            })
            .await?;
        Ok(FirstPick {
            question_id: any.into_iter().next().map(|q| q.id),
            generated_questions: None,
        })
    }

    #[instrument(level = "debug", skip_all, fields(blueprint = %blueprint.id, %was_correct))]
    async fn select_next(
        &self,
        blueprint: &TestBlueprint,
        session: &TestSession,
        _just_answered: &str,
        was_correct: bool,
    ) -> EngineResult<NextPick> {
        let cfg = &blueprint.adaptive_config;
        let standard = cfg.difficulty_standard;
        let previous = Self::current_estimate(blueprint, session);
        let estimate = Estimate {
            level: levels::adjust(standard, previous.level, was_correct),
            questions_count: previous.questions_count + 1,
        };
        debug!(target: "test_session", from = previous.level, to = estimate.level, count = estimate.questions_count, "Adjusted estimate");

        if estimate.questions_count >= cfg.max_questions {
            return Ok(NextPick::finished().with_estimate(estimate));
        }

        let label = standard.label(i64::from(estimate.level));
        let candidates = self
            .content
            .query_questions(&QuestionQuery {
                difficulty: Some(label),
                exclude_ids: session.answered_ids(),
                limit: Some(1),
            })
            .await?;

        // No broadening here: an exhausted level ends the test.
        Ok(match candidates.into_iter().next() {
            Some(q) => NextPick::next(q.id).with_estimate(estimate),
            None => {
                info!(target: "test_session", level = label.code(), "Level exhausted; finishing session");
                NextPick::finished().with_estimate(estimate)
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rand::SeedableRng;
    use serde_json::json;

    use crate::domain::{AdaptiveConfig, HistoryItem, PoolConfig, QuestionBankItem, QuestionKind};
    use crate::levels::{CefrLevel, DifficultyStandard};
    use crate::store::MemoryContentStore;

    fn blueprint(strategy: Strategy) -> TestBlueprint {
        TestBlueprint {
            id: "bp".into(),
            title: String::new(),
            strategy,
            pre_test_questionnaire: None,
            post_test_questionnaire: None,
            linear_questions: vec!["q1".into(), "q2".into(), "q3".into()],
            pool_config: PoolConfig { pool_size: 3 },
            adaptive_config: AdaptiveConfig {
                initial_difficulty: 2,
                difficulty_standard: DifficultyStandard::Cefr,
                max_questions: 4,
            },
        }
    }

    fn question(id: &str, cefr: CefrLevel) -> QuestionBankItem {
        QuestionBankItem {
            id: id.into(),
            kind: QuestionKind::Speaking,
            prompt: String::new(),
            passage: None,
            audio_url: None,
            options: vec![],
            blanks: vec![],
            pairs: vec![],
            difficulty_cefr: Some(cefr),
            difficulty_actfl: None,
            tags: vec![],
        }
    }

    fn answered(session: &mut TestSession, id: &str) {
        session.history.push(HistoryItem {
            question_id: id.into(),
            tags: vec![],
            user_answer: json!({ "value": "x" }),
            readable_answer: "x".into(),
            is_correct: true,
            awarded_score: 1,
            time_taken: 0.0,
            timestamp: Utc::now(),
            submission_id: None,
        });
    }

    async fn bank(items: Vec<QuestionBankItem>) -> Arc<dyn ContentStore> {
        let store = MemoryContentStore::new();
        for q in items {
            store.insert_question(q).await;
        }
        Arc::new(store)
    }

    fn rng(seed: u64) -> SharedRng {
        Arc::new(Mutex::new(StdRng::seed_from_u64(seed)))
    }

    #[tokio::test]
    async fn linear_walks_list_then_finishes() {
        let bp = blueprint(Strategy::Linear);
        let session = TestSession::new("s".into(), "bp".into(), None);
        let sel = LinearSelector;

        let first = sel.select_first(&bp, &session).await.unwrap();
        assert_eq!(first.question_id.as_deref(), Some("q1"));

        let mut current = "q1".to_string();
        let mut steps = 1;
        loop {
            let pick = sel.select_next(&bp, &session, &current, true).await.unwrap();
            if pick.finished {
                assert!(pick.next.is_none());
                break;
            }
            current = pick.next.unwrap();
            steps += 1;
        }
        assert_eq!(steps, bp.linear_questions.len());
    }

    #[tokio::test]
    async fn linear_unknown_id_finishes() {
        let bp = blueprint(Strategy::Linear);
        let session = TestSession::new("s".into(), "bp".into(), None);
        let pick = LinearSelector.select_next(&bp, &session, "ghost", true).await.unwrap();
        assert!(pick.finished);
        assert!(pick.next.is_none());
    }

    #[tokio::test]
    async fn linear_empty_list_yields_nothing() {
        let mut bp = blueprint(Strategy::Linear);
        bp.linear_questions.clear();
        let session = TestSession::new("s".into(), "bp".into(), None);
        assert_eq!(LinearSelector.select_first(&bp, &session).await.unwrap(), FirstPick::default());
    }

    #[tokio::test]
    async fn pool_draws_once_and_walks_persisted_order() {
        let content = bank((1..=6).map(|i| question(&format!("p{i}"), CefrLevel::A1)).collect()).await;
        let bp = blueprint(Strategy::RandomizedPool);
        let sel = RandomizedPoolSelector { content, rng: rng(7) };
        let mut session = TestSession::new("s".into(), "bp".into(), None);

        let first = sel.select_first(&bp, &session).await.unwrap();
        let order = first.generated_questions.clone().unwrap();
        assert_eq!(order.len(), 3);
        assert_eq!(first.question_id.as_ref(), order.first());
        let mut unique = order.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 3);

        session.generated_questions = Some(order.clone());
        // Repeated traversal gives the same answers every time.
        for _ in 0..3 {
            let a = sel.select_next(&bp, &session, &order[0], true).await.unwrap();
            assert_eq!(a.next.as_ref(), Some(&order[1]));
            let b = sel.select_next(&bp, &session, &order[1], false).await.unwrap();
            assert_eq!(b.next.as_ref(), Some(&order[2]));
            let c = sel.select_next(&bp, &session, &order[2], true).await.unwrap();
            assert!(c.finished);
        }
    }

    #[tokio::test]
    async fn pool_draw_is_reproducible_with_same_seed() {
        let items: Vec<_> = (1..=20).map(|i| question(&format!("p{i}"), CefrLevel::B2)).collect();
        let bp = blueprint(Strategy::RandomizedPool);
        let session = TestSession::new("s".into(), "bp".into(), None);

        let a = RandomizedPoolSelector { content: bank(items.clone()).await, rng: rng(42) };
        let b = RandomizedPoolSelector { content: bank(items).await, rng: rng(42) };
        assert_eq!(
            a.select_first(&bp, &session).await.unwrap(),
            b.select_first(&bp, &session).await.unwrap()
        );
    }

    #[tokio::test]
    async fn pool_smaller_bank_than_pool_size() {
        let content = bank(vec![question("only", CefrLevel::A1)]).await;
        let bp = blueprint(Strategy::RandomizedPool);
        let sel = RandomizedPoolSelector { content, rng: rng(1) };
        let session = TestSession::new("s".into(), "bp".into(), None);
        let first = sel.select_first(&bp, &session).await.unwrap();
        assert_eq!(first.generated_questions, Some(vec!["only".to_string()]));
    }

    #[tokio::test]
    async fn pool_without_persisted_order_finishes() {
        let sel = RandomizedPoolSelector { content: bank(vec![]).await, rng: rng(1) };
        let bp = blueprint(Strategy::RandomizedPool);
        let session = TestSession::new("s".into(), "bp".into(), None);
        assert!(sel.select_next(&bp, &session, "x", true).await.unwrap().finished);
    }

    #[tokio::test]
    async fn adaptive_first_prefers_exact_level_then_falls_back() {
        let bp = blueprint(Strategy::AdaptiveRuleBased);
        let session = TestSession::new("s".into(), "bp".into(), None);

        let sel = AdaptiveSelector {
            content: bank(vec![question("c1", CefrLevel::C1), question("a2", CefrLevel::A2)]).await,
        };
        let first = sel.select_first(&bp, &session).await.unwrap();
        assert_eq!(first.question_id.as_deref(), Some("a2"));

        let sel = AdaptiveSelector { content: bank(vec![question("c1", CefrLevel::C1)]).await };
        let first = sel.select_first(&bp, &session).await.unwrap();
        assert_eq!(first.question_id.as_deref(), Some("c1"));

        let sel = AdaptiveSelector { content: bank(vec![]).await };
        assert_eq!(sel.select_first(&bp, &session).await.unwrap().question_id, None);
    }

    #[tokio::test]
    async fn adaptive_moves_level_and_excludes_answered() {
        let content = bank(vec![
            question("a2-1", CefrLevel::A2),
            question("b1-1", CefrLevel::B1),
            question("b1-2", CefrLevel::B1),
            question("a1-1", CefrLevel::A1),
        ])
        .await;
        let bp = blueprint(Strategy::AdaptiveRuleBased);
        let sel = AdaptiveSelector { content };
        let mut session = TestSession::new(
            "s".into(),
            "bp".into(),
            Some(Estimate { level: 2, questions_count: 0 }),
        );

        answered(&mut session, "a2-1");
        let up = sel.select_next(&bp, &session, "a2-1", true).await.unwrap();
        assert_eq!(up.next.as_deref(), Some("b1-1"));
        assert_eq!(up.estimate, Some(Estimate { level: 3, questions_count: 1 }));

        session.current_estimate = up.estimate;
        answered(&mut session, "b1-1");
        let down = sel.select_next(&bp, &session, "b1-1", false).await.unwrap();
        // Level 2 has nothing left unanswered: fail fast rather than broaden.
        assert!(down.finished);
        assert!(down.next.is_none());
        assert_eq!(down.estimate, Some(Estimate { level: 2, questions_count: 2 }));
    }

    #[tokio::test]
    async fn adaptive_stops_at_max_questions() {
        let content = bank((0..10).map(|i| question(&format!("b{i}"), CefrLevel::A2)).collect()).await;
        let mut bp = blueprint(Strategy::AdaptiveRuleBased);
        bp.adaptive_config.max_questions = 2;
        let sel = AdaptiveSelector { content };
        let mut session = TestSession::new(
            "s".into(),
            "bp".into(),
            Some(Estimate { level: 2, questions_count: 1 }),
        );
        answered(&mut session, "b0");
        let pick = sel.select_next(&bp, &session, "b0", true).await.unwrap();
        assert!(pick.finished);
        assert_eq!(pick.estimate, Some(Estimate { level: 3, questions_count: 2 }));
    }

    #[test]
    fn unknown_strategy_is_not_implemented() {
        let bp = blueprint(Strategy::Other("irt".into()));
        let content: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        let err = selector_for(&bp, content, rng(0)).err().unwrap();
        assert_eq!(
            err,
            EngineError::StrategyNotImplemented { blueprint_id: "bp".into(), strategy: "irt".into() }
        );
    }
}
