use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub room_id: ObjectId,
    pub sender_id: String,
    /// Display-name snapshot taken at send time; the sender may rename later.
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub content: String,
    #[serde(default)]
    pub kind: MessageKind,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub timestamp: DateTime,
    /// Opaque client-supplied payload, stored verbatim.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<bson::Bson>,
}

impl ChatMessage {
    pub const COLLECTION: &'static str = "messages";
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    System,
}
