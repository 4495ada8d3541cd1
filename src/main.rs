//! LingoTest · Adaptive Test-Session Backend
//!
//! - Axum HTTP + WebSocket API for starting and answering test sessions
//! - Linear, randomized-pool and rule-based adaptive question strategies
//! - Content from an optional TOML bank plus built-in seeds
//!
//! Important env variables:
//!   PORT               : u16 (default 3000)
//!   TEST_CONTENT_PATH  : path to TOML content bank (blueprints, questions, questionnaires, levels)
//!   SELECTION_SEED     : u64 seed for reproducible pool draws
//!   LOG_LEVEL          : tracing filter, e.g. "debug" or full directives
//!   LOG_FORMAT         : "pretty" (default) or "json"

mod telemetry;
mod util;
mod domain;
mod levels;
mod config;
mod seeds;
mod error;
mod store;
mod validator;
mod selector;
mod results;
mod engine;
mod state;
mod protocol;
mod routes;

use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, instrument};

use crate::config::Settings;
use crate::routes::build_router;
use crate::state::AppState;

#[instrument(level = "info", skip_all)]
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
  telemetry::init_tracing();

  let settings = Settings::from_env();

  // Build shared application state (content bank, session store, engine).
  let state = Arc::new(AppState::new(&settings).await);

  // Build the HTTP router with routes, CORS and tracing layers.
  let app = build_router(state.clone());

  let listener = TcpListener::bind(settings.addr).await?;
  info!(target: "lingotest_backend", addr = %settings.addr, "HTTP server listening");
  axum::serve(listener, app).await?;
  Ok(())
}
