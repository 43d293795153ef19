use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

/// A chat room document.
///
/// `code` is present iff `visibility` is private; it is the shareable
/// 6-character join handle and is unique across the collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRoom {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub name: String,
    pub description: Option<String>,
    pub kind: RoomKind,
    pub visibility: Visibility,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Participant user ids. Set semantics are enforced with `$addToSet`.
    #[serde(default)]
    pub participants: Vec<String>,
    pub created_by: String,
    /// Weak back-reference to a linked video room, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub video_room_id: Option<String>,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub created_at: DateTime,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub updated_at: DateTime,
}

impl ChatRoom {
    pub const COLLECTION: &'static str = "rooms";

    pub fn is_participant(&self, user_id: &str) -> bool {
        self.participants.iter().any(|p| p == user_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomKind {
    Direct,
    Group,
    Channel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    Public,
    Private,
}
