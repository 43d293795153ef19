use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header::AUTHORIZATION, HeaderMap},
    response::Response,
};
use futures::{SinkExt, StreamExt};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use huddle_services::auth::{self, UserDescriptor};

use crate::error::VideoError;
use crate::state::VideoState;
use crate::ws::dispatcher;
use crate::ws::events::{ClientEvent, ServerEvent};
use crate::ws::registry::SessionHandle;

const SEND_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Deserialize)]
pub struct WsParams {
    pub token: Option<String>,
}

/// Handshake: authenticated sessions get their real descriptor; everyone
/// else is admitted anonymously. A token that is present but bad still
/// downgrades to anonymous rather than rejecting, so a stale credential
/// cannot lock a guest out of a call.
pub async fn ws_upgrade(
    State(state): State<VideoState>,
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

    ws.on_upgrade(move |socket| async move {
        let session_id = Uuid::new_v4().to_string();
        let user = match token {
            Some(token) => match state.verifier.verify(&token).await {
                Ok(user) => user,
                Err(e) => {
                    debug!(error = %e, "Video token rejected, admitting as guest");
                    UserDescriptor::anonymous(&session_id)
                }
            },
            None => UserDescriptor::anonymous(&session_id),
        };
        handle_socket(socket, state, session_id, user).await;
    })
}

async fn handle_socket(
    socket: WebSocket,
    state: VideoState,
    session_id: String,
    user: UserDescriptor,
) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<Message>();

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
    state.engine.attach_session(&handle);

    while let Some(frame) = stream.next().await {
        match frame {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientEvent>(&text) {
                Ok(event) => state.engine.dispatch(&handle, event).await,
                Err(e) => {
                    debug!(session_id = %session_id, error = %e, "Undecodable client frame");
                    dispatcher::send_to(
                        &handle,
                        &ServerEvent::error(&VideoError::Validation(format!(
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

    state.engine.detach_session(&session_id).await;
    drop(handle);
    writer.abort();
    info!(session_id = %session_id, "Video socket closed");
}
