//! Wire-facing views of persisted documents. Field names are camelCase on
//! the wire; BSON documents stay snake_case.

use huddle_db::models::{ChatMessage, ChatRoom, MessageKind, RoomKind, Visibility};
use huddle_services::auth::UserDescriptor;
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub kind: RoomKind,
    pub visibility: Visibility,
    /// Redacted for non-participants of public rooms and in public
    /// broadcasts.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub participants: Vec<String>,
    pub created_by: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_room_id: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl RoomView {
    pub fn full(room: &ChatRoom) -> Self {
        Self::build(room, false)
    }

    pub fn redacted(room: &ChatRoom) -> Self {
        Self::build(room, true)
    }

    fn build(room: &ChatRoom, redact_code: bool) -> Self {
        Self {
            id: room.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: room.name.clone(),
            description: room.description.clone(),
            kind: room.kind,
            visibility: room.visibility,
            code: if redact_code { None } else { room.code.clone() },
            participants: room.participants.clone(),
            created_by: room.created_by.clone(),
            video_room_id: room.video_room_id.clone(),
            created_at: room.created_at.timestamp_millis(),
            updated_at: room.updated_at.timestamp_millis(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: String,
    pub room_id: String,
    pub sender_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl From<&ChatMessage> for MessageView {
    fn from(message: &ChatMessage) -> Self {
        Self {
            id: message.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            room_id: message.room_id.to_hex(),
            sender_id: message.sender_id.clone(),
            sender_name: message.sender_name.clone(),
            sender_avatar: message.sender_avatar.clone(),
            content: message.content.clone(),
            kind: message.kind,
            timestamp: message.timestamp.timestamp_millis(),
            metadata: message
                .metadata
                .clone()
                .map(|m| m.into_relaxed_extjson()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserView {
    pub user_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
}

impl From<&UserDescriptor> for UserView {
    fn from(user: &UserDescriptor) -> Self {
        Self {
            user_id: user.user_id.clone(),
            display_name: user.display_name.clone(),
            email: user.email.clone(),
            avatar_url: user.avatar_url.clone(),
        }
    }
}
