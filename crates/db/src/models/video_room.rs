use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

use super::Visibility;

pub const DEFAULT_MAX_PARTICIPANTS: u32 = 8;

/// A video room document. The creator is the host and the only identity
/// allowed to end the room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoRoom {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
    pub host_id: String,
    #[serde(default)]
    pub participants: Vec<String>,
    pub max_participants: u32,
    pub visibility: Visibility,
    /// Always present, unlike chat codes; unique across the collection.
    pub code: String,
    /// Weak back-reference to an auto-created chat room, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chat_room_code: Option<String>,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub created_at: DateTime,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub updated_at: DateTime,
}

impl VideoRoom {
    pub const COLLECTION: &'static str = "video_rooms";

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }

    pub fn is_full(&self) -> bool {
        self.participants.len() as u32 >= self.max_participants
    }
}
