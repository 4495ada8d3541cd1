//! Collaborator interfaces consumed by the engine, plus in-memory implementations.
//!
//! The engine only ever talks to these traits. The in-memory stores back the
//! binary and the tests; a document-store adapter would implement the same
//! traits.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, instrument};

use crate::domain::{LevelDescription, QuestionBankItem, Questionnaire, TestBlueprint, TestSession};
use crate::error::{EngineError, EngineResult};
use crate::levels::{DifficultyLabel, DifficultyStandard};

/// Question bank query: equality filter on one difficulty label, `id not_in`, limit.
#[derive(Clone, Debug, Default)]
pub struct QuestionQuery {
    pub difficulty: Option<DifficultyLabel>,
    pub exclude_ids: Vec<String>,
    pub limit: Option<usize>,
}

impl QuestionQuery {
    pub fn matches(&self, q: &QuestionBankItem) -> bool {
        let difficulty_ok = match self.difficulty {
            Some(label) => q.difficulty(label.standard()) == Some(label),
            None => true,
        };
        difficulty_ok && !self.exclude_ids.iter().any(|id| *id == q.id)
    }
}

/// Read-only content: blueprints, questionnaires, the question bank, level descriptions.
#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn blueprint(&self, id: &str) -> EngineResult<Option<TestBlueprint>>;

    async fn questionnaire(&self, id: &str) -> EngineResult<Option<Questionnaire>>;

    async fn question(&self, id: &str) -> EngineResult<Option<QuestionBankItem>>;

    /// Matching questions in bank order.
    async fn query_questions(&self, query: &QuestionQuery) -> EngineResult<Vec<QuestionBankItem>>;

    async fn level_description(
        &self,
        standard: DifficultyStandard,
        level: &str,
    ) -> EngineResult<Option<LevelDescription>>;
}

/// Session documents with version-checked whole-document replace.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Store a fresh session; fails if the id is already taken.
    async fn create(&self, session: &TestSession) -> EngineResult<()>;

    async fn get(&self, id: &str) -> EngineResult<Option<TestSession>>;

    /// Replace the stored document if its version still equals `expected_version`.
    /// Returns the stored copy with the bumped version.
    async fn replace(&self, session: &TestSession, expected_version: u64) -> EngineResult<TestSession>;
}

/// In-memory content bank. The question list keeps insertion order.
#[derive(Default)]
pub struct MemoryContentStore {
    blueprints: RwLock<HashMap<String, TestBlueprint>>,
    questionnaires: RwLock<HashMap<String, Questionnaire>>,
    questions: RwLock<Vec<QuestionBankItem>>,
    level_descriptions: RwLock<Vec<LevelDescription>>,
}

impl MemoryContentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert unless the id already exists. Returns whether it was inserted.
    pub async fn insert_blueprint(&self, bp: TestBlueprint) -> bool {
        let mut map = self.blueprints.write().await;
        if map.contains_key(&bp.id) {
            return false;
        }
        map.insert(bp.id.clone(), bp);
        true
    }

    pub async fn insert_questionnaire(&self, q: Questionnaire) -> bool {
        let mut map = self.questionnaires.write().await;
        if map.contains_key(&q.id) {
            return false;
        }
        map.insert(q.id.clone(), q);
        true
    }

    pub async fn insert_question(&self, q: QuestionBankItem) -> bool {
        let mut bank = self.questions.write().await;
        if bank.iter().any(|existing| existing.id == q.id) {
            return false;
        }
        bank.push(q);
        true
    }

    pub async fn insert_level_description(&self, d: LevelDescription) -> bool {
        let mut list = self.level_descriptions.write().await;
        if list.iter().any(|e| e.standard == d.standard && e.level == d.level) {
            return false;
        }
        list.push(d);
        true
    }

    /// Counts of (blueprints, questionnaires, questions, level descriptions).
    pub async fn inventory(&self) -> (usize, usize, usize, usize) {
        (
            self.blueprints.read().await.len(),
            self.questionnaires.read().await.len(),
            self.questions.read().await.len(),
            self.level_descriptions.read().await.len(),
        )
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn blueprint(&self, id: &str) -> EngineResult<Option<TestBlueprint>> {
        Ok(self.blueprints.read().await.get(id).cloned())
    }

    async fn questionnaire(&self, id: &str) -> EngineResult<Option<Questionnaire>> {
        Ok(self.questionnaires.read().await.get(id).cloned())
    }

    async fn question(&self, id: &str) -> EngineResult<Option<QuestionBankItem>> {
        Ok(self.questions.read().await.iter().find(|q| q.id == id).cloned())
    }

    #[instrument(level = "debug", skip(self))]
    async fn query_questions(&self, query: &QuestionQuery) -> EngineResult<Vec<QuestionBankItem>> {
        let bank = self.questions.read().await;
        let limit = query.limit.unwrap_or(usize::MAX);
        let hits: Vec<QuestionBankItem> = bank
            .iter()
            .filter(|q| query.matches(q))
            .take(limit)
            .cloned()
            .collect();
        debug!(target: "test_session", hits = hits.len(), "Question bank query");
        Ok(hits)
    }

    async fn level_description(
        &self,
        standard: DifficultyStandard,
        level: &str,
    ) -> EngineResult<Option<LevelDescription>> {
        Ok(self
            .level_descriptions
            .read()
            .await
            .iter()
            .find(|d| d.standard == standard && d.level == level)
            .cloned())
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, TestSession>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn create(&self, session: &TestSession) -> EngineResult<()> {
        let mut map = self.sessions.write().await;
        if map.contains_key(&session.id) {
            return Err(EngineError::Internal(format!("session id {} already exists", session.id)));
        }
        map.insert(session.id.clone(), session.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> EngineResult<Option<TestSession>> {
        Ok(self.sessions.read().await.get(id).cloned())
    }

    async fn replace(&self, session: &TestSession, expected_version: u64) -> EngineResult<TestSession> {
        let mut map = self.sessions.write().await;
        let current = map
            .get(&session.id)
            .ok_or_else(|| EngineError::not_found("session", session.id.clone()))?;
        if current.version != expected_version {
            return Err(EngineError::Conflict {
                session_id: session.id.clone(),
                expected: expected_version,
                found: current.version,
            });
        }
        let mut stored = session.clone();
        stored.version = expected_version + 1;
        map.insert(stored.id.clone(), stored.clone());
        Ok(stored)
    }
}
