//! Durable store contracts.
//!
//! The engines depend on [`ChatStore`] / [`VideoStore`] capabilities rather
//! than a concrete database handle so tests can substitute in-memory fakes.
//! The production implementations ([`MongoChatStore`], [`MongoVideoStore`])
//! back the contracts with MongoDB: server-assigned `ObjectId`s, server
//! timestamps, `$addToSet`/`$pull` atomic array updates and indexed queries.

mod chat;
mod video;

pub use chat::MongoChatStore;
pub use video::MongoVideoStore;

use async_trait::async_trait;
use huddle_db::models::{
    ChatMessage, ChatRoom, MessageKind, RoomKind, UserProfile, VideoParticipant, VideoRoom,
    Visibility,
};
use std::future::IntoFuture;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Upper-bound deadline for any single store operation.
pub const STORE_DEADLINE: Duration = Duration::from_secs(5);

/// Total attempts per operation (the initial call plus one retry).
const STORE_MAX_ATTEMPTS: usize = 2;

/// Backoff schedule between attempts: 50 ms, capped at 200 ms.
const STORE_RETRY_BACKOFF: [Duration; 2] = [Duration::from_millis(50), Duration::from_millis(200)];

#[derive(Debug, Error)]
pub enum StoreError {
    /// The operation missed its deadline.
    #[error("Store operation timed out")]
    Timeout,
    /// The store rejected or could not serve the operation, retries included.
    #[error("Store unavailable: {0}")]
    Unavailable(String),
    /// A uniqueness constraint fired.
    #[error("Duplicate key: {0}")]
    Duplicate(String),
    /// A document failed to (de)serialize.
    #[error("Store serialization error: {0}")]
    Serialization(String),
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            StoreError::Timeout => "STORE_TIMEOUT",
            _ => "STORE_UNAVAILABLE",
        }
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Run a store call under the deadline, retrying transient failures once.
///
/// Deadline misses surface immediately (retrying a 5 s timeout would double
/// the caller's wait). Duplicate-key violations are terminal.
pub(crate) async fn guard<T, F, Fut>(op: &'static str, call: F) -> StoreResult<T>
where
    F: Fn() -> Fut,
    Fut: IntoFuture<Output = Result<T, mongodb::error::Error>>,
{
    let mut attempt = 0;
    loop {
        attempt += 1;
        match tokio::time::timeout(STORE_DEADLINE, call()).await {
            Err(_) => {
                warn!(op, attempt, "Store operation deadline exceeded");
                return Err(StoreError::Timeout);
            }
            Ok(Ok(value)) => return Ok(value),
            Ok(Err(e)) => {
                if is_duplicate_key(&e) {
                    return Err(StoreError::Duplicate(e.to_string()));
                }
                if attempt >= STORE_MAX_ATTEMPTS {
                    warn!(op, attempt, error = %e, "Store operation failed");
                    return Err(StoreError::Unavailable(e.to_string()));
                }
                let backoff = STORE_RETRY_BACKOFF[(attempt - 1).min(STORE_RETRY_BACKOFF.len() - 1)];
                warn!(op, attempt, error = %e, ?backoff, "Store operation failed, retrying");
                tokio::time::sleep(backoff).await;
            }
        }
    }
}

fn is_duplicate_key(e: &mongodb::error::Error) -> bool {
    use mongodb::error::{ErrorKind, WriteFailure};
    match &*e.kind {
        ErrorKind::Write(WriteFailure::WriteError(we)) => we.code == 11000,
        ErrorKind::Command(ce) => ce.code == 11000,
        _ => false,
    }
}

// ── Contracts ───────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct NewChatRoom {
    pub name: String,
    pub description: Option<String>,
    pub kind: RoomKind,
    pub visibility: Visibility,
    pub code: Option<String>,
    pub participants: Vec<String>,
    pub created_by: String,
    pub video_room_id: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewChatMessage {
    pub room_id: String,
    pub sender_id: String,
    pub sender_name: Option<String>,
    pub sender_avatar: Option<String>,
    pub content: String,
    pub kind: MessageKind,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Clone)]
pub struct NewVideoRoom {
    pub name: String,
    pub description: Option<String>,
    pub host_id: String,
    pub max_participants: u32,
    pub visibility: Visibility,
    pub code: String,
    pub chat_room_id: Option<String>,
    pub chat_room_code: Option<String>,
}

/// Result of the capacity-checked join.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// User was atomically added to the participant set.
    Added,
    /// User was already in the set; nothing changed.
    AlreadyParticipant,
    /// The room is at `max_participants`.
    Full,
    /// No such room.
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaFlag {
    Audio,
    Video,
    Screen,
}

impl MediaFlag {
    pub fn field(self) -> &'static str {
        match self {
            MediaFlag::Audio => "audio_enabled",
            MediaFlag::Video => "video_enabled",
            MediaFlag::Screen => "screen_sharing",
        }
    }
}

#[async_trait]
pub trait ChatStore: Send + Sync {
    async fn create_room(&self, room: NewChatRoom) -> StoreResult<ChatRoom>;
    async fn find_room(&self, room_id: &str) -> StoreResult<Option<ChatRoom>>;
    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<ChatRoom>>;
    async fn code_in_use(&self, code: &str) -> StoreResult<bool>;
    /// Public rooms ordered by `updated_at` descending.
    async fn list_public_rooms(&self) -> StoreResult<Vec<ChatRoom>>;
    /// Private rooms whose participant set contains `user_id`, ordered by
    /// `updated_at` descending.
    async fn list_private_rooms_with(&self, user_id: &str) -> StoreResult<Vec<ChatRoom>>;
    /// Returns false when the user was already a participant.
    async fn add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<bool>;
    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage>;
    /// Up to `limit` messages ordered `(timestamp, _id)` descending, starting
    /// strictly after the `before` cursor (a message id) when supplied.
    async fn list_messages(
        &self,
        room_id: &str,
        limit: i64,
        before: Option<&str>,
    ) -> StoreResult<Vec<ChatMessage>>;
    /// Bump the room's `updated_at` server timestamp.
    async fn touch_room(&self, room_id: &str) -> StoreResult<()>;
    async fn fetch_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>>;
}

#[async_trait]
pub trait VideoStore: Send + Sync {
    async fn create_room(&self, room: NewVideoRoom) -> StoreResult<VideoRoom>;
    async fn find_room(&self, room_id: &str) -> StoreResult<Option<VideoRoom>>;
    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<VideoRoom>>;
    async fn code_in_use(&self, code: &str) -> StoreResult<bool>;
    /// Record the weak back-reference to the auto-created chat room.
    async fn link_chat_room(
        &self,
        room_id: &str,
        chat_room_id: &str,
        chat_room_code: &str,
    ) -> StoreResult<()>;
    /// Compare-and-set join: adds the user only while the participant set is
    /// below `max_participants`. Two contenders for the last slot cannot
    /// both observe [`JoinOutcome::Added`].
    async fn try_add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<JoinOutcome>;
    /// Drop the user from the participant set and delete their media-state
    /// record. Idempotent.
    async fn remove_participant(&self, room_id: &str, user_id: &str) -> StoreResult<()>;
    /// Insert or replace the per-(room, user) media-state record.
    async fn put_participant(&self, participant: VideoParticipant) -> StoreResult<()>;
    async fn get_participant(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VideoParticipant>>;
    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<VideoParticipant>>;
    /// Returns false when no record exists for the pair.
    async fn set_media_flag(
        &self,
        room_id: &str,
        user_id: &str,
        flag: MediaFlag,
        enabled: bool,
    ) -> StoreResult<bool>;
    /// Delete the room and every participant record. Returns false when the
    /// room was already gone.
    async fn end_room(&self, room_id: &str) -> StoreResult<bool>;
}
