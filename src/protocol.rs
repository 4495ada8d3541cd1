//! Public protocol structs for WebSocket and HTTP endpoints (serde ready).
//! Keep this small and stable to evolve backend and frontend independently.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{FinalResult, QuestionBankItem, QuestionKind, Questionnaire, TestSession};
use crate::engine::{StartOutcome, SubmitOutcome, Submission, Unit};
use crate::error::{EngineError, EngineResult};

/// Messages the client can send over WebSocket.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientWsMessage {
    Ping,
    StartTest(StartIn),
    Submit(SubmitIn),
    GetSession {
        #[serde(rename = "sessionId")]
        session_id: String,
    },
}

/// Messages the server sends back over WebSocket.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerWsMessage {
    Pong,
    Started { outcome: StartOut },
    Submitted { outcome: SubmitOut },
    Session { session: TestSession },
    Error { code: String, message: String },
}

impl From<EngineError> for ServerWsMessage {
    fn from(e: EngineError) -> Self {
        let out = e.to_out();
        ServerWsMessage::Error {
            code: out.error,
            message: out.message,
        }
    }
}

/// Question as shown to the learner: no correctness flags, no accepted answers.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionOut {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,
    #[serde(skip_serializing_if = "is_zero")]
    pub blank_count: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub left: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub right: Vec<String>,
    pub tags: Vec<String>,
}

fn is_zero(n: &usize) -> bool {
    *n == 0
}

/// Convert a bank item (internal) to the public DTO.
pub fn to_out(q: &QuestionBankItem) -> QuestionOut {
    QuestionOut {
        id: q.id.clone(),
        kind: q.kind,
        prompt: q.prompt.clone(),
        passage: q.passage.clone(),
        audio_url: q.audio_url.clone(),
        options: q.options.iter().map(|o| o.text.clone()).collect(),
        blank_count: q.blanks.len(),
        left: q.pairs.iter().map(|p| p.left.clone()).collect(),
        right: q.pairs.iter().map(|p| p.right.clone()).collect(),
        tags: q.tags.clone(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitKind {
    Question,
    Questionnaire,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum UnitData {
    Question(QuestionOut),
    Questionnaire(Questionnaire),
}

fn unit_parts(unit: Unit) -> (UnitKind, UnitData) {
    match unit {
        Unit::Question(q) => (UnitKind::Question, UnitData::Question(to_out(&q))),
        Unit::Questionnaire(q) => (UnitKind::Questionnaire, UnitData::Questionnaire(q)),
    }
}

//
// HTTP request/response DTOs
//

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StartIn {
    #[serde(default)]
    pub blueprint_id: Option<String>,
}

impl StartIn {
    pub fn blueprint_id(&self) -> EngineResult<&str> {
        self.blueprint_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| EngineError::InvalidRequest("missing blueprintId".into()))
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StartOut {
    pub session_id: String,
    #[serde(rename = "type")]
    pub kind: UnitKind,
    pub data: UnitData,
}

impl From<StartOutcome> for StartOut {
    fn from(o: StartOutcome) -> Self {
        let (kind, data) = unit_parts(o.unit);
        StartOut {
            session_id: o.session_id,
            kind,
            data,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitIn {
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub questionnaire_id: Option<String>,
    #[serde(default)]
    pub answer: Option<Value>,
    #[serde(default)]
    pub answers: Option<Value>,
    /// Seconds spent on the question.
    #[serde(default)]
    pub time_taken: Option<f64>,
    /// Client idempotency key for answer retries.
    #[serde(default)]
    pub submission_id: Option<String>,
}

fn present(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl SubmitIn {
    /// Validate the body shape. A questionnaire id takes precedence over a question id.
    pub fn into_submission(self) -> EngineResult<(String, Submission)> {
        let session_id =
            present(self.session_id).ok_or_else(|| EngineError::InvalidRequest("missing sessionId".into()))?;

        if let Some(questionnaire_id) = present(self.questionnaire_id) {
            let answers = self.answers.unwrap_or_else(|| Value::Object(Default::default()));
            return Ok((
                session_id,
                Submission::Questionnaire {
                    questionnaire_id,
                    answers,
                },
            ));
        }

        let question_id = present(self.question_id)
            .ok_or_else(|| EngineError::InvalidRequest("expected questionId or questionnaireId".into()))?;
        let answer = self
            .answer
            .ok_or_else(|| EngineError::InvalidRequest(format!("missing answer for question {question_id}")))?;
        Ok((
            session_id,
            Submission::Answer {
                question_id,
                answer,
                time_taken: self.time_taken.unwrap_or(0.0),
                submission_id: present(self.submission_id),
            },
        ))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmitStatus {
    Continue,
    Completed,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitOut {
    pub status: SubmitStatus,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<UnitKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<UnitData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<FinalResult>,
}

impl From<SubmitOutcome> for SubmitOut {
    fn from(o: SubmitOutcome) -> Self {
        match o {
            SubmitOutcome::Continue(unit) => {
                let (kind, data) = unit_parts(unit);
                SubmitOut {
                    status: SubmitStatus::Continue,
                    kind: Some(kind),
                    data: Some(data),
                    result: None,
                }
            }
            SubmitOutcome::Completed(result) => SubmitOut {
                status: SubmitStatus::Completed,
                kind: None,
                data: None,
                result: Some(result),
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorOut {
    pub error: String,
    pub message: String,
}

#[derive(Serialize)]
pub struct HealthOut {
    pub ok: bool,
}
