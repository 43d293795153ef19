use serde::{Deserialize, Serialize};

/// Profile document written by the identity service. The realtime services
/// read these for display-name/avatar snapshots but never write them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(rename = "_id")]
    pub id: String,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl UserProfile {
    pub const COLLECTION: &'static str = "users";
}
