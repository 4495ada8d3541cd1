//! Engine error taxonomy and its HTTP mapping.
//!
//! Validation problems surface as 4xx with a readable message; collaborator
//! failures surface as 5xx after being logged.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{error, warn};

use crate::protocol::ErrorOut;

pub type EngineResult<T> = std::result::Result<T, EngineError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// Malformed or incomplete request body.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A blueprint, session, questionnaire or question id did not resolve.
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    /// Submission against a session that no longer accepts answers.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The strategy produced no question to serve.
    #[error("no questions available for blueprint {0}")]
    NoQuestionsAvailable(String),

    #[error("strategy '{strategy}' is not implemented (blueprint {blueprint_id})")]
    StrategyNotImplemented {
        blueprint_id: String,
        strategy: String,
    },

    /// Version-checked write lost against a concurrent writer.
    #[error("session {session_id} was modified concurrently (expected version {expected}, found {found})")]
    Conflict {
        session_id: String,
        expected: u64,
        found: u64,
    },

    #[error("internal error: {0}")]
    Internal(String),
}

impl EngineError {
    pub fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            id: id.into(),
        }
    }

    /// Stable machine-readable code used in error bodies and WebSocket replies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::NotFound { .. } => "not_found",
            Self::InvalidState(_) => "invalid_state",
            Self::NoQuestionsAvailable(_) => "no_questions_available",
            Self::StrategyNotImplemented { .. } => "strategy_not_implemented",
            Self::Conflict { .. } => "conflict",
            Self::Internal(_) => "internal",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::InvalidState(_) => StatusCode::BAD_REQUEST,
            Self::NotFound { .. } | Self::NoQuestionsAvailable(_) => StatusCode::NOT_FOUND,
            Self::StrategyNotImplemented { .. } => StatusCode::NOT_IMPLEMENTED,
            Self::Conflict { .. } => StatusCode::CONFLICT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_out(&self) -> ErrorOut {
        ErrorOut {
            error: self.code().to_string(),
            message: self.to_string(),
        }
    }
}

impl IntoResponse for EngineError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(target: "test_session", code = self.code(), error = %self, "Request failed");
        } else {
            warn!(target: "test_session", code = self.code(), error = %self, "Request rejected");
        }
        (status, Json(self.to_out())).into_response()
    }
}
