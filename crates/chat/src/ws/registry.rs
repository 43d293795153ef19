//! Chat session registry: the shared realtime registry specialized to axum
//! WebSocket frames.

use axum::extract::ws::Message;

pub type SessionHandle = huddle_services::realtime::SessionHandle<Message>;
pub type SessionRegistry = huddle_services::realtime::SessionRegistry<Message>;
