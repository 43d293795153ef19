//! The chat event surface.
//!
//! Frames are `{"type": "<event>", "data": {...}}`. Incoming frames decode
//! once into [`ClientEvent`]; the dispatcher matches exhaustively, so adding
//! an event without a handler is a compile error rather than a silently
//! ignored string.

use huddle_db::models::{MessageKind, RoomKind, Visibility};
use serde::{Deserialize, Serialize};

use super::views::{MessageView, RoomView, UserView};
use crate::error::ChatError;

pub const DEFAULT_MESSAGE_LIMIT: i64 = 50;
pub const MAX_MESSAGE_LIMIT: i64 = 200;

#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum ClientEvent {
    #[serde(rename = "room:create")]
    RoomCreate(RoomCreatePayload),
    #[serde(rename = "room:join")]
    RoomJoin(RoomJoinPayload),
    #[serde(rename = "room:join-by-code")]
    RoomJoinByCode(JoinByCodePayload),
    #[serde(rename = "room:leave")]
    RoomLeave(RoomRefPayload),
    #[serde(rename = "room:get")]
    RoomGet(RoomRefPayload),
    #[serde(rename = "message:send")]
    MessageSend(MessageSendPayload),
    #[serde(rename = "messages:get")]
    MessagesGet(MessagesGetPayload),
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomCreatePayload {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub kind: RoomKind,
    pub visibility: Visibility,
    /// Additional participants beyond the creator.
    #[serde(default)]
    pub participants: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomJoinPayload {
    pub room_id: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JoinByCodePayload {
    pub code: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomRefPayload {
    pub room_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageSendPayload {
    pub room_id: String,
    pub content: String,
    #[serde(default)]
    pub kind: Option<MessageKind>,
    #[serde(default)]
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesGetPayload {
    pub room_id: String,
    #[serde(default)]
    pub limit: Option<i64>,
    /// Id of the oldest message the client already has.
    #[serde(default)]
    pub before: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "rooms:list")]
    RoomsList { rooms: Vec<RoomView> },
    #[serde(rename = "room:created")]
    RoomCreated { room: RoomView },
    #[serde(rename = "room:joined")]
    RoomJoined { room: RoomView },
    #[serde(rename = "room:left")]
    #[serde(rename_all = "camelCase")]
    RoomLeft { room_id: String },
    #[serde(rename = "room:details")]
    RoomDetails { room: RoomView },
    #[serde(rename = "room:user-joined")]
    #[serde(rename_all = "camelCase")]
    RoomUserJoined { room_id: String, user: UserView },
    #[serde(rename = "room:user-left")]
    #[serde(rename_all = "camelCase")]
    RoomUserLeft { room_id: String, user_id: String },
    #[serde(rename = "message:new")]
    MessageNew { message: MessageView },
    #[serde(rename = "messages:list")]
    #[serde(rename_all = "camelCase")]
    MessagesList {
        room_id: String,
        messages: Vec<MessageView>,
    },
    #[serde(rename = "user:online")]
    #[serde(rename_all = "camelCase")]
    UserOnline { user_id: String },
    #[serde(rename = "user:offline")]
    #[serde(rename_all = "camelCase")]
    UserOffline { user_id: String },
    #[serde(rename = "error")]
    Error { message: String, code: String },
}

impl ServerEvent {
    pub fn error(err: &ChatError) -> Self {
        ServerEvent::Error {
            message: err.to_string(),
            code: err.code().to_string(),
        }
    }
}
