use bson::{oid::ObjectId, DateTime};
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

/// Per-(room, user) media state. The document id is `"<room_id>_<user_id>"`
/// so a user holds at most one record per room; `socket_id` always points at
/// the user's most recent connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoParticipant {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_id: ObjectId,
    pub user_id: String,
    pub socket_id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    #[serde(default = "default_true")]
    pub audio_enabled: bool,
    #[serde(default = "default_true")]
    pub video_enabled: bool,
    #[serde(default)]
    pub screen_sharing: bool,
    #[serde(deserialize_with = "crate::time::flexible_datetime")]
    pub joined_at: DateTime,
}

impl VideoParticipant {
    pub const COLLECTION: &'static str = "video_participants";

    pub fn doc_id(room_id: &ObjectId, user_id: &str) -> String {
        format!("{}_{}", room_id.to_hex(), user_id)
    }
}
