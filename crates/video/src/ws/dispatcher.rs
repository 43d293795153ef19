//! Fan-out helpers. Serialization happens once per event; each subscriber
//! gets the frame through its own writer channel, so one slow or dead
//! consumer cannot stall the rest.

use axum::extract::ws::Message;
use tracing::warn;

use super::events::ServerEvent;
use super::registry::{SessionHandle, SessionRegistry};

fn frame(event: &ServerEvent) -> Option<Message> {
    match serde_json::to_string(event) {
        Ok(text) => Some(Message::text(text)),
        Err(e) => {
            warn!(error = %e, "Failed to serialize server event");
            None
        }
    }
}

pub fn send_to(handle: &SessionHandle, event: &ServerEvent) {
    if let Some(frame) = frame(event) {
        handle.send_frame(frame);
    }
}

/// Send to every subscriber of a room, optionally excluding one session.
pub fn broadcast_room(
    registry: &SessionRegistry,
    room_id: &str,
    event: &ServerEvent,
    except: Option<&str>,
) {
    let Some(frame) = frame(event) else { return };
    for handle in registry.room_subscribers(room_id) {
        if Some(handle.session_id.as_str()) == except {
            continue;
        }
        handle.send_frame(frame.clone());
    }
}
