//! Wire-facing views of video documents.

use huddle_db::models::{VideoParticipant, VideoRoom, Visibility};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRoomView {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub host_id: String,
    pub participants: Vec<String>,
    pub max_participants: u32,
    pub visibility: Visibility,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room_code: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
}

impl From<&VideoRoom> for VideoRoomView {
    fn from(room: &VideoRoom) -> Self {
        Self {
            id: room.id.map(|oid| oid.to_hex()).unwrap_or_default(),
            name: room.name.clone(),
            description: room.description.clone(),
            host_id: room.host_id.clone(),
            participants: room.participants.clone(),
            max_participants: room.max_participants,
            visibility: room.visibility,
            code: room.code.clone(),
            chat_room_id: room.chat_room_id.clone(),
            chat_room_code: room.chat_room_code.clone(),
            created_at: room.created_at.timestamp_millis(),
            updated_at: room.updated_at.timestamp_millis(),
        }
    }
}

/// Media-state snapshot sent with join events so peers can open the right
/// connections without further round-trips.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: String,
    pub socket_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub audio_enabled: bool,
    pub video_enabled: bool,
    pub screen_sharing: bool,
    pub joined_at: i64,
}

impl From<&VideoParticipant> for ParticipantView {
    fn from(p: &VideoParticipant) -> Self {
        Self {
            user_id: p.user_id.clone(),
            socket_id: p.socket_id.clone(),
            display_name: p.display_name.clone(),
            email: p.email.clone(),
            audio_enabled: p.audio_enabled,
            video_enabled: p.video_enabled,
            screen_sharing: p.screen_sharing,
            joined_at: p.joined_at.timestamp_millis(),
        }
    }
}
