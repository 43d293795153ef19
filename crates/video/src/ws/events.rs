//! The video event surface. Same framing as chat: incoming frames decode
//! once into [`ClientEvent`] and the dispatcher matches exhaustively.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::views::{ParticipantView, VideoRoomView};
use crate::error::VideoError;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "video:room:create")]
    RoomCreate(RoomCreatePayload),
    #[serde(rename = "video:room:join")]
    RoomJoin(RoomJoinPayload),
    #[serde(rename = "video:room:leave")]
    RoomLeave(RoomRefPayload),
    #[serde(rename = "video:room:end")]
    RoomEnd(RoomRefPayload),
    #[serde(rename = "video:signal")]
    Signal(SignalPayload),
    #[serde(rename = "video:toggle-audio")]
    ToggleAudio(TogglePayload),
    #[serde(rename = "video:toggle-video")]
    ToggleVideo(TogglePayload),
    #[serde(rename = "video:toggle-screen")]
    ToggleScreen(TogglePayload),
    #[serde(rename = "video:screen:start")]
    ScreenStart(RoomRefPayload),
    #[serde(rename = "video:screen:stop")]
    ScreenStop(RoomRefPayload),
    #[serde(rename = "video:stream:ready")]
    StreamReady(StreamReadyPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatePayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    /// Create a linked private chat room alongside the video room.
    #[serde(default)]
    pub with_chat: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinPayload {
    #[serde(default)]
    pub room_id: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRefPayload {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalPayload {
    #[serde(alias = "signalKind")]
    pub kind: String,
    pub room_id: String,
    #[serde(default)]
    pub target_user_id: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
    #[serde(default)]
    pub metadata: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TogglePayload {
    pub room_id: String,
    pub enabled: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamReadyPayload {
    pub room_id: String,
    #[serde(default)]
    pub stream_id: Option<String>,
    #[serde(default)]
    pub stream_type: Option<String>,
    #[serde(default)]
    pub screen_sharing: Option<bool>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "video:room:created")]
    RoomCreated { room: VideoRoomView },
    #[serde(rename = "video:room:joined")]
    RoomJoined {
        room: VideoRoomView,
        participants: Vec<ParticipantView>,
    },
    #[serde(rename = "video:room:left")]
    #[serde(rename_all = "camelCase")]
    RoomLeft { room_id: String },
    #[serde(rename = "video:room:ended")]
    #[serde(rename_all = "camelCase")]
    RoomEnded { room_id: String },
    #[serde(rename = "video:user:joined")]
    #[serde(rename_all = "camelCase")]
    UserJoined {
        room_id: String,
        participant: ParticipantView,
    },
    #[serde(rename = "video:user:left")]
    #[serde(rename_all = "camelCase")]
    UserLeft { room_id: String, user_id: String },
    #[serde(rename = "video:signal")]
    #[serde(rename_all = "camelCase")]
    Signal {
        room_id: String,
        from_user_id: String,
        kind: String,
        payload: Value,
        metadata: Value,
    },
    #[serde(rename = "video:audio:toggled")]
    #[serde(rename_all = "camelCase")]
    AudioToggled {
        room_id: String,
        user_id: String,
        enabled: bool,
    },
    #[serde(rename = "video:video:toggled")]
    #[serde(rename_all = "camelCase")]
    VideoToggled {
        room_id: String,
        user_id: String,
        enabled: bool,
    },
    #[serde(rename = "video:screen:toggled")]
    #[serde(rename_all = "camelCase")]
    ScreenToggled {
        room_id: String,
        user_id: String,
        enabled: bool,
    },
    #[serde(rename = "video:screen:started")]
    #[serde(rename_all = "camelCase")]
    ScreenStarted { room_id: String, user_id: String },
    #[serde(rename = "video:screen:stopped")]
    #[serde(rename_all = "camelCase")]
    ScreenStopped { room_id: String, user_id: String },
    #[serde(rename = "video:screen:negotiation:needed")]
    #[serde(rename_all = "camelCase")]
    ScreenNegotiationNeeded { room_id: String, user_id: String },
    #[serde(rename = "video:stream:ready")]
    #[serde(rename_all = "camelCase")]
    StreamReady {
        room_id: String,
        user_id: String,
        stream_id: String,
        stream_type: String,
    },
    #[serde(rename = "error")]
    Error { message: String, code: String },
}

impl ServerEvent {
    pub fn error(err: &VideoError) -> Self {
        ServerEvent::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
