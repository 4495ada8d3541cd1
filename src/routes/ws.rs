//! WebSocket upgrade + message loop. Each client message is parsed as JSON and
//! forwarded to the session engine. We reply with a single JSON message per request.

use std::sync::Arc;
use axum::{
  extract::{
    ws::{Message, WebSocket},
    State, WebSocketUpgrade,
  },
  response::IntoResponse,
};
use tracing::{info, error, instrument, debug};

use crate::protocol::{ClientWsMessage, ServerWsMessage};
use crate::state::AppState;

#[instrument(level = "info", skip(state))]
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> impl IntoResponse {
  info!(target: "lingotest_backend", "WebSocket upgrade requested");
  ws.on_upgrade(move |socket| handle_ws(socket, state))
}

#[instrument(level = "info", skip(socket, state))]
async fn handle_ws(mut socket: WebSocket, state: Arc<AppState>) {
  info!(target: "lingotest_backend", "WebSocket connected");
  while let Some(Ok(msg)) = socket.recv().await {
    match msg {
      Message::Text(txt) => {
        // Parse, dispatch, serialize response.
        let reply_msg = match serde_json::from_str::<ClientWsMessage>(&txt) {
          Ok(incoming) => {
            debug!(target: "lingotest_backend", "WS received: {:?}", &incoming);
            handle_client_ws(incoming, &state).await
          }
          Err(e) => ServerWsMessage::Error { code: "invalid_request".into(), message: format!("Invalid JSON: {}", e) },
        };

        let out = serde_json::to_string(&reply_msg).unwrap_or_else(|e| {
          serde_json::json!({ "type": "error", "code": "internal", "message": format!("Serialization error: {}", e) }).to_string()
        });

        if let Err(e) = socket.send(Message::Text(out)).await {
          error!(target: "lingotest_backend", error = %e, "WS send error");
          break;
        }
      }
      Message::Ping(payload) => { let _ = socket.send(Message::Pong(payload)).await; }
      Message::Close(_) => break,
      _ => {}
    }
  }
  info!(target: "lingotest_backend", "WebSocket disconnected");
}

#[instrument(level = "info", skip(state))]
pub(crate) async fn handle_client_ws(msg: ClientWsMessage, state: &AppState) -> ServerWsMessage {
  match msg {
    ClientWsMessage::Ping => ServerWsMessage::Pong,

    ClientWsMessage::StartTest(start) => {
      let outcome = match start.blueprint_id() {
        Ok(id) => state.engine.start(id).await,
        Err(e) => Err(e),
      };
      match outcome {
        Ok(o) => {
          info!(target: "test_session", session_id = %o.session_id, "WS test started");
          ServerWsMessage::Started { outcome: o.into() }
        }
        Err(e) => e.into(),
      }
    }

    ClientWsMessage::Submit(body) => {
      let outcome = match body.into_submission() {
        Ok((session_id, submission)) => state.engine.submit(&session_id, submission).await,
        Err(e) => Err(e),
      };
      match outcome {
        Ok(o) => ServerWsMessage::Submitted { outcome: o.into() },
        Err(e) => e.into(),
      }
    }

    ClientWsMessage::GetSession { session_id } => match state.engine.session(&session_id).await {
      Ok(session) => ServerWsMessage::Session { session },
      Err(e) => e.into(),
    },
  }
}
