//! Test-session state machine.
//!
//! `start` creates a session and serves the first unit (pre-test questionnaire
//! or first question). `submit` records a questionnaire or an answer and serves
//! what comes next, finishing the session when the strategy runs out.
//!
//! Every mutation is written back with a version-checked replace before the
//! response is built. Resubmissions of an answer or questionnaire that is
//! already recorded do not touch the session; they replay the pending unit.

use std::sync::Arc;

use chrono::Utc;
use serde_json::Value;
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{
    Estimate, FinalResult, HistoryItem, QuestionBankItem, Questionnaire, QuestionnaireAnswer, SessionStatus, Strategy,
    TestBlueprint, TestSession,
};
use crate::error::{EngineError, EngineResult};
use crate::results;
use crate::selector::{selector_for, QuestionSelector, SharedRng};
use crate::store::{ContentStore, SessionStore};
use crate::util::{trunc_for_log, wrap_object};
use crate::validator;

/// What the client has to answer next.
#[derive(Clone, Debug)]
pub enum Unit {
    Question(QuestionBankItem),
    Questionnaire(Questionnaire),
}

#[derive(Clone, Debug)]
pub struct StartOutcome {
    pub session_id: String,
    pub unit: Unit,
}

#[derive(Clone, Debug)]
pub enum SubmitOutcome {
    Continue(Unit),
    Completed(FinalResult),
}

/// A validated submission; built from the request body at the boundary.
#[derive(Clone, Debug)]
pub enum Submission {
    Questionnaire {
        questionnaire_id: String,
        answers: Value,
    },
    Answer {
        question_id: String,
        answer: Value,
        time_taken: f64,
        submission_id: Option<String>,
    },
}

pub struct SessionEngine {
    content: Arc<dyn ContentStore>,
    sessions: Arc<dyn SessionStore>,
    rng: SharedRng,
}

impl SessionEngine {
    pub fn new(content: Arc<dyn ContentStore>, sessions: Arc<dyn SessionStore>, rng: SharedRng) -> Self {
        Self {
            content,
            sessions,
            rng,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn start(&self, blueprint_id: &str) -> EngineResult<StartOutcome> {
        let blueprint = self.load_blueprint(blueprint_id).await?;
        let selector = self.selector(&blueprint)?;
        if blueprint.strategy == Strategy::Linear {
            if let Some(repeated) = blueprint.repeated_linear_question() {
                return Err(EngineError::InvalidRequest(format!(
                    "blueprint {} lists question {repeated} more than once",
                    blueprint.id
                )));
            }
        }

        let estimate = (blueprint.strategy == Strategy::AdaptiveRuleBased).then(|| {
            let cfg = &blueprint.adaptive_config;
            Estimate {
                level: cfg.difficulty_standard.clamp(cfg.initial_difficulty),
                questions_count: 0,
            }
        });
        let session = TestSession::new(Uuid::new_v4().to_string(), blueprint.id.clone(), estimate);

        if let Some(pre_id) = &blueprint.pre_test_questionnaire {
            let questionnaire = self.load_questionnaire(pre_id).await?;
            self.sessions.create(&session).await?;
            info!(target: "test_session", session_id = %session.id, questionnaire = %pre_id, "Session started at pre-test questionnaire");
            return Ok(StartOutcome {
                session_id: session.id,
                unit: Unit::Questionnaire(questionnaire),
            });
        }

        let (session, question) = self.enter_question_loop(&blueprint, selector.as_ref(), session).await?;
        self.sessions.create(&session).await?;
        info!(target: "test_session", session_id = %session.id, question = %question.id, strategy = blueprint.strategy.as_str(), "Session started");
        Ok(StartOutcome {
            session_id: session.id,
            unit: Unit::Question(question),
        })
    }

    #[instrument(level = "info", skip(self, submission))]
    pub async fn submit(&self, session_id: &str, submission: Submission) -> EngineResult<SubmitOutcome> {
        let session = self
            .sessions
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("session", session_id))?;
        let blueprint = self.load_blueprint(&session.blueprint_id).await?;

        let duplicate = match &submission {
            Submission::Questionnaire { questionnaire_id, .. } => session.has_questionnaire(questionnaire_id),
            Submission::Answer {
                question_id,
                submission_id,
                ..
            } => session.already_answered(question_id, submission_id.as_deref()),
        };
        if duplicate {
            info!(target: "test_session", %session_id, "Duplicate submission; replaying current unit");
            return self.replay(&blueprint, &session).await;
        }
        if session.status != SessionStatus::Started {
            return Err(EngineError::InvalidState(format!(
                "session {session_id} is already completed"
            )));
        }

        let selector = self.selector(&blueprint)?;
        match submission {
            Submission::Questionnaire {
                questionnaire_id,
                answers,
            } => {
                self.submit_questionnaire(&blueprint, selector.as_ref(), session, questionnaire_id, answers)
                    .await
            }
            Submission::Answer {
                question_id,
                answer,
                time_taken,
                submission_id,
            } => {
                self.submit_answer(
                    &blueprint,
                    selector.as_ref(),
                    session,
                    question_id,
                    answer,
                    time_taken,
                    submission_id,
                )
                .await
            }
        }
    }

    /// Current session document, for audit and resume.
    pub async fn session(&self, session_id: &str) -> EngineResult<TestSession> {
        self.sessions
            .get(session_id)
            .await?
            .ok_or_else(|| EngineError::not_found("session", session_id))
    }

    async fn submit_questionnaire(
        &self,
        blueprint: &TestBlueprint,
        selector: &dyn QuestionSelector,
        mut session: TestSession,
        questionnaire_id: String,
        answers: Value,
    ) -> EngineResult<SubmitOutcome> {
        let is_pre = blueprint.pre_test_questionnaire.as_deref() == Some(questionnaire_id.as_str());
        let is_post = blueprint.post_test_questionnaire.as_deref() == Some(questionnaire_id.as_str());
        if !is_pre && !is_post {
            return Err(EngineError::InvalidRequest(format!(
                "questionnaire {questionnaire_id} is not part of blueprint {}",
                blueprint.id
            )));
        }

        let record = QuestionnaireAnswer {
            questionnaire_id: questionnaire_id.clone(),
            answers: wrap_object(answers),
            submitted_at: Utc::now(),
        };

        if is_post && session.final_result.is_some() {
            session.questionnaire_answers.push(record);
            session.status = SessionStatus::Completed;
            session.end_time = Some(Utc::now());
            let session = self.save(session).await?;
            info!(target: "test_session", session_id = %session.id, "Post-test questionnaire received; session completed");
            let result = session
                .final_result
                .ok_or_else(|| EngineError::Internal("completed session lost its result".into()))?;
            return Ok(SubmitOutcome::Completed(result));
        }
        if !is_pre {
            return Err(EngineError::InvalidState(format!(
                "post-test questionnaire {questionnaire_id} submitted before the test finished"
            )));
        }

        session.questionnaire_answers.push(record);
        let (session, question) = self.enter_question_loop(blueprint, selector, session).await?;
        let session = self.save(session).await?;
        info!(target: "test_session", session_id = %session.id, question = %question.id, "Pre-test questionnaire received; first question served");
        Ok(SubmitOutcome::Continue(Unit::Question(question)))
    }

    #[allow(clippy::too_many_arguments)]
    async fn submit_answer(
        &self,
        blueprint: &TestBlueprint,
        selector: &dyn QuestionSelector,
        mut session: TestSession,
        question_id: String,
        answer: Value,
        time_taken: f64,
        submission_id: Option<String>,
    ) -> EngineResult<SubmitOutcome> {
        if let Some(pre_id) = &blueprint.pre_test_questionnaire {
            if !session.has_questionnaire(pre_id) {
                return Err(EngineError::InvalidState(format!(
                    "pre-test questionnaire {pre_id} must be submitted first"
                )));
            }
        }
        if session.final_result.is_some() {
            return Err(EngineError::InvalidState(
                "test finished; only the post-test questionnaire is pending".into(),
            ));
        }

        let question = self.load_question(&question_id).await?;
        if session.current_question.as_deref() != Some(question_id.as_str()) {
            warn!(target: "test_session", session_id = %session.id, %question_id, expected = ?session.current_question, "Answer for a question that was not the one served");
        }

        let outcome = validator::validate(&question, &answer);
        info!(
            target: "test_session",
            session_id = %session.id,
            %question_id,
            correct = outcome.is_correct,
            answer = %trunc_for_log(&outcome.readable_answer, 120),
            "Answer evaluated"
        );

        session.history.push(HistoryItem {
            question_id: question_id.clone(),
            tags: question.tags.clone(),
            user_answer: outcome.normalized_answer,
            readable_answer: outcome.readable_answer,
            is_correct: outcome.is_correct,
            awarded_score: outcome.score,
            time_taken: time_taken.max(0.0),
            timestamp: Utc::now(),
            submission_id,
        });
        session.current_question = None;

        let pick = selector
            .select_next(blueprint, &session, &question_id, outcome.is_correct)
            .await?;
        if let Some(estimate) = pick.estimate {
            session.current_estimate = Some(estimate);
        }

        match pick.next.filter(|_| !pick.finished) {
            Some(next_id) => {
                let next = self.load_question(&next_id).await?;
                session.current_question = Some(next_id);
                self.save(session).await?;
                Ok(SubmitOutcome::Continue(Unit::Question(next)))
            }
            None => self.finish(blueprint, session).await,
        }
    }

    async fn finish(&self, blueprint: &TestBlueprint, mut session: TestSession) -> EngineResult<SubmitOutcome> {
        let adaptive = match blueprint.strategy {
            Strategy::AdaptiveRuleBased => session
                .current_estimate
                .map(|e| (blueprint.adaptive_config.difficulty_standard, e.level)),
            _ => None,
        };
        let result = results::aggregate(&session.history, adaptive, self.content.as_ref()).await?;
        info!(
            target: "test_session",
            session_id = %session.id,
            score = result.score,
            max_score = result.max_score,
            passed = result.passed,
            level = ?result.level,
            "Test finished"
        );
        session.final_result = Some(result.clone());

        if let Some(post_id) = &blueprint.post_test_questionnaire {
            let questionnaire = self.load_questionnaire(post_id).await?;
            self.save(session).await?;
            return Ok(SubmitOutcome::Continue(Unit::Questionnaire(questionnaire)));
        }

        session.status = SessionStatus::Completed;
        session.end_time = Some(Utc::now());
        self.save(session).await?;
        Ok(SubmitOutcome::Completed(result))
    }

    /// Ask the strategy for the first question and stage it on the session (not persisted).
    async fn enter_question_loop(
        &self,
        blueprint: &TestBlueprint,
        selector: &dyn QuestionSelector,
        mut session: TestSession,
    ) -> EngineResult<(TestSession, QuestionBankItem)> {
        let pick = selector.select_first(blueprint, &session).await?;
        if session.generated_questions.is_none() {
            session.generated_questions = pick.generated_questions;
        }
        let question_id = pick
            .question_id
            .ok_or_else(|| EngineError::NoQuestionsAvailable(blueprint.id.clone()))?;
        let question = self.load_question(&question_id).await?;
        session.current_question = Some(question_id);
        Ok((session, question))
    }

    /// Rebuild the response for the unit the session is currently waiting on.
    async fn replay(&self, blueprint: &TestBlueprint, session: &TestSession) -> EngineResult<SubmitOutcome> {
        if let Some(result) = &session.final_result {
            let post_pending = session.status == SessionStatus::Started;
            return match (&blueprint.post_test_questionnaire, post_pending) {
                (Some(post_id), true) => Ok(SubmitOutcome::Continue(Unit::Questionnaire(
                    self.load_questionnaire(post_id).await?,
                ))),
                _ => Ok(SubmitOutcome::Completed(result.clone())),
            };
        }
        if let Some(question_id) = &session.current_question {
            return Ok(SubmitOutcome::Continue(Unit::Question(
                self.load_question(question_id).await?,
            )));
        }
        Err(EngineError::InvalidState(format!(
            "session {} has no pending unit to replay",
            session.id
        )))
    }

    fn selector(&self, blueprint: &TestBlueprint) -> EngineResult<Box<dyn QuestionSelector>> {
        selector_for(blueprint, self.content.clone(), self.rng.clone())
    }

    async fn save(&self, session: TestSession) -> EngineResult<TestSession> {
        let expected = session.version;
        self.sessions.replace(&session, expected).await
    }

    async fn load_blueprint(&self, id: &str) -> EngineResult<TestBlueprint> {
        self.content
            .blueprint(id)
            .await?
            .ok_or_else(|| EngineError::not_found("blueprint", id))
    }

    async fn load_questionnaire(&self, id: &str) -> EngineResult<Questionnaire> {
        self.content
            .questionnaire(id)
            .await?
            .ok_or_else(|| EngineError::not_found("questionnaire", id))
    }

    async fn load_question(&self, id: &str) -> EngineResult<QuestionBankItem> {
        self.content
            .question(id)
            .await?
            .ok_or_else(|| EngineError::not_found("question", id))
    }
}
