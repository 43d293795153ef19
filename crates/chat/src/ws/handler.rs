use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_services::auth;

use crate::error::ChatError;
use crate::state::ChatState;
use crate::ws::dispatcher;
use crate::ws::events::{ClientEvent, ServerEvent};
use crate::ws::registry::SessionHandle;

/// A subscriber that cannot take a frame within this window is closed rather
/// than allowed to stall its writer.
const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Handshake: the token comes from the `token` query parameter, falling back
/// to the `Authorization` header on the upgrade request. Chat never admits
/// unauthenticated sessions.
pub async fn ws_upgrade(
    State(state): State<ChatState>,
    Query(params): Query<WsParams>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let token = params.token.clone().or_else(|| {
        headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(auth::bearer_token)
            .map(String::from)
    });

    let Some(token) = token else {
        return reject(&ChatError::AuthRequired);
    };

    match state.verifier.verify(&token).await {
        Ok(user) => ws.on_upgrade(move |socket| handle_socket(socket, state, user)),
        Err(e) => {
            debug!(error = %e, "Chat handshake rejected");
            reject(&ChatError::AuthFailed)
        }
    }
}

fn reject(err: &ChatError) -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(serde_json::json!({ "success": false, "error": err.code() })),
    )
        .into_response()
}

async fn handle_socket(socket: WebSocket, state: ChatState, user: auth::UserDescriptor) {
    let session_id = Uuid::new_v4().to_string();
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

    // Single writer per connection: events keep the order they were
    // enqueued in, and a stuck socket only ever blocks its own task.
    let writer_session = session_id.clone();
    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            match tokio::time::timeout(SEND_TIMEOUT, sink.send(frame)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    debug!(session_id = %writer_session, error = %e, "WS send failed");
                    break;
                }
                Err(_) => {
                    warn!(session_id = %writer_session, "WS send timed out, closing slow consumer");
                    break;
                }
            }
        }
    });

    let handle = Arc::new(SessionHandle::new(session_id.clone(), user, tx));
    state.engine.attach_session(&handle).await;

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => state.engine.dispatch(&handle, event).await,
                Err(e) => {
                    debug!(session_id = %session_id, error = %e, "Undecodable client frame");
                    dispatcher::send_to(
                        &handle,
                        &ServerEvent::error(&ChatError::Validation(format!(
                            "Unrecognized event: {e}"
                        ))),
                    );
                }
            },
            Ok(Message::Ping(data)) => handle.send_frame(Message::Pong(data)),
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                debug!(session_id = %session_id, error = %e, "WS receive error");
                break;
            }
        }
    }

    state.engine.detach_session(&session_id);
    drop(handle);
    writer.abort();
    info!(session_id = %session_id, "Chat socket closed");
}
