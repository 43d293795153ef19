mod chat_message;
mod chat_room;
mod user_profile;
mod video_participant;
mod video_room;

pub use chat_message::{ChatMessage, MessageKind};
pub use chat_room::{ChatRoom, RoomKind, Visibility};
pub use user_profile::UserProfile;
pub use video_participant::VideoParticipant;
pub use video_room::{VideoRoom, DEFAULT_MAX_PARTICIPANTS};
