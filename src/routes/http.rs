//! HTTP endpoint handlers. These are thin wrappers that forward to the session engine.
//! Each handler is instrumented and logs the ids it touched and the outcome.

use std::sync::Arc;
use axum::{
  extract::{rejection::JsonRejection, Path, State},
  http::StatusCode,
  response::IntoResponse,
  Json,
};
use tracing::{info, instrument};

use crate::domain::TestSession;
use crate::error::{EngineError, EngineResult};
use crate::protocol::*;
use crate::state::AppState;

fn body<T>(payload: Result<Json<T>, JsonRejection>) -> EngineResult<T> {
  payload.map(|Json(v)| v).map_err(|e| EngineError::InvalidRequest(e.body_text()))
}

#[instrument(level = "info")]
pub async fn http_health() -> impl IntoResponse { Json(HealthOut { ok: true }) }

#[instrument(level = "info", skip_all)]
pub async fn http_start_test(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<StartIn>, JsonRejection>,
) -> Result<(StatusCode, Json<StartOut>), EngineError> {
  let start = body(payload)?;
  let blueprint_id = start.blueprint_id()?;
  let outcome = state.engine.start(blueprint_id).await?;
  info!(target: "test_session", %blueprint_id, session_id = %outcome.session_id, "HTTP test started");
  Ok((StatusCode::CREATED, Json(outcome.into())))
}

#[instrument(level = "info", skip_all)]
pub async fn http_submit(
  State(state): State<Arc<AppState>>,
  payload: Result<Json<SubmitIn>, JsonRejection>,
) -> Result<Json<SubmitOut>, EngineError> {
  let (session_id, submission) = body(payload)?.into_submission()?;
  let outcome = state.engine.submit(&session_id, submission).await?;
  let out = SubmitOut::from(outcome);
  info!(target: "test_session", %session_id, status = ?out.status, "HTTP submission handled");
  Ok(Json(out))
}

#[instrument(level = "info", skip(state))]
pub async fn http_get_session(
  State(state): State<Arc<AppState>>,
  Path(session_id): Path<String>,
) -> Result<Json<TestSession>, EngineError> {
  Ok(Json(state.engine.session(&session_id).await?))
}
