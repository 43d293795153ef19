//! In-memory store fakes. Same contracts as the MongoDB-backed stores, with
//! a deterministic monotonic clock so ordering assertions are stable, plus a
//! few seeding/inspection helpers and failure-injection switches.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use bson::oid::ObjectId;
use bson::DateTime;
use huddle_db::models::{ChatMessage, ChatRoom, UserProfile, VideoParticipant, VideoRoom};
use huddle_services::store::{
    ChatStore, JoinOutcome, MediaFlag, NewChatMessage, NewChatRoom, NewVideoRoom, StoreResult,
    VideoStore,
};

fn start_clock() -> AtomicI64 {
    AtomicI64::new(DateTime::now().timestamp_millis())
}

#[derive(Default)]
pub struct InMemoryChatStore {
    rooms: Mutex<HashMap<String, ChatRoom>>,
    messages: Mutex<Vec<ChatMessage>>,
    profiles: Mutex<HashMap<String, UserProfile>>,
    clock: AtomicI64,
    /// When set, every generated code "already exists".
    pub collide_codes: AtomicBool,
}

impl InMemoryChatStore {
    pub fn new() -> Self {
        Self {
            clock: start_clock(),
            ..Default::default()
        }
    }

    fn tick(&self) -> DateTime {
        DateTime::from_millis(self.clock.fetch_add(1, Ordering::SeqCst))
    }

    pub fn seed_room(&self, room: ChatRoom) -> String {
        let id = room.id.map(|o| o.to_hex()).unwrap_or_default();
        self.rooms.lock().unwrap().insert(id.clone(), room);
        id
    }

    pub fn seed_profile(&self, profile: UserProfile) {
        self.profiles
            .lock()
            .unwrap()
            .insert(profile.id.clone(), profile);
    }

    pub fn room(&self, room_id: &str) -> Option<ChatRoom> {
        self.rooms.lock().unwrap().get(room_id).cloned()
    }

    pub fn message_count(&self, room_id: &str) -> usize {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return 0;
        };
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.room_id == oid)
            .count()
    }
}

#[async_trait]
impl ChatStore for InMemoryChatStore {
    async fn create_room(&self, room: NewChatRoom) -> StoreResult<ChatRoom> {
        let now = self.tick();
        let doc = ChatRoom {
            id: Some(ObjectId::new()),
            name: room.name,
            description: room.description,
            kind: room.kind,
            visibility: room.visibility,
            code: room.code,
            participants: room.participants,
            created_by: room.created_by,
            video_room_id: room.video_room_id,
            created_at: now,
            updated_at: now,
        };
        self.seed_room(doc.clone());
        Ok(doc)
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<ChatRoom>> {
        Ok(self.room(room_id))
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<ChatRoom>> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .find(|r| r.code.as_deref() == Some(code))
            .cloned())
    }

    async fn code_in_use(&self, code: &str) -> StoreResult<bool> {
        if self.collide_codes.load(Ordering::SeqCst) {
            return Ok(true);
        }
        Ok(self.find_room_by_code(code).await?.is_some())
    }

    async fn list_public_rooms(&self) -> StoreResult<Vec<ChatRoom>> {
        let mut rooms: Vec<ChatRoom> = self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.visibility == huddle_db::models::Visibility::Public)
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rooms)
    }

    async fn list_private_rooms_with(&self, user_id: &str) -> StoreResult<Vec<ChatRoom>> {
        let mut rooms: Vec<ChatRoom> = self
            .rooms
            .lock()
            .unwrap()
            .values()
            .filter(|r| {
                r.visibility == huddle_db::models::Visibility::Private && r.is_participant(user_id)
            })
            .cloned()
            .collect();
        rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(rooms)
    }

    async fn add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<bool> {
        let now = self.tick();
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(false);
        };
        if room.is_participant(user_id) {
            return Ok(false);
        }
        room.participants.push(user_id.to_string());
        room.updated_at = now;
        Ok(true)
    }

    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage> {
        let room_id = ObjectId::parse_str(&message.room_id).map_err(|_| {
            huddle_services::store::StoreError::Serialization("bad room id".into())
        })?;
        let doc = ChatMessage {
            id: Some(ObjectId::new()),
            room_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            sender_avatar: message.sender_avatar,
            content: message.content,
            kind: message.kind,
            timestamp: self.tick(),
            metadata: message
                .metadata
                .map(|m| bson::to_bson(&m).unwrap_or(bson::Bson::Null)),
        };
        self.messages.lock().unwrap().push(doc.clone());
        Ok(doc)
    }

    async fn list_messages(
        &self,
        room_id: &str,
        limit: i64,
        before: Option<&str>,
    ) -> StoreResult<Vec<ChatMessage>> {
        let Ok(room_oid) = ObjectId::parse_str(room_id) else {
            return Ok(Vec::new());
        };
        if limit <= 0 {
            return Ok(Vec::new());
        }

        let messages = self.messages.lock().unwrap();
        let anchor = before
            .and_then(|id| ObjectId::parse_str(id).ok())
            .and_then(|oid| messages.iter().find(|m| m.id == Some(oid)).cloned());

        let mut page: Vec<ChatMessage> = messages
            .iter()
            .filter(|m| m.room_id == room_oid)
            .filter(|m| match &anchor {
                None => true,
                Some(anchor) => {
                    m.timestamp < anchor.timestamp
                        || (m.timestamp == anchor.timestamp && m.id < anchor.id)
                }
            })
            .cloned()
            .collect();
        page.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
        page.truncate(limit as usize);
        Ok(page)
    }

    async fn touch_room(&self, room_id: &str) -> StoreResult<()> {
        let now = self.tick();
        if let Some(room) = self.rooms.lock().unwrap().get_mut(room_id) {
            room.updated_at = now;
        }
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        Ok(self.profiles.lock().unwrap().get(user_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryVideoStore {
    rooms: Mutex<HashMap<String, VideoRoom>>,
    participants: Mutex<HashMap<String, VideoParticipant>>,
    clock: AtomicI64,
}

impl InMemoryVideoStore {
    pub fn new() -> Self {
        Self {
            clock: start_clock(),
            ..Default::default()
        }
    }

    fn tick(&self) -> DateTime {
        DateTime::from_millis(self.clock.fetch_add(1, Ordering::SeqCst))
    }

    pub fn room(&self, room_id: &str) -> Option<VideoRoom> {
        self.rooms.lock().unwrap().get(room_id).cloned()
    }

    /// Pre-fill participant slots with synthetic users (capacity tests).
    pub fn seed_participants(&self, room_id: &str, count: usize) {
        let mut rooms = self.rooms.lock().unwrap();
        if let Some(room) = rooms.get_mut(room_id) {
            for i in 0..count {
                room.participants.push(format!("seed_{i}"));
            }
        }
    }
}

#[async_trait]
impl VideoStore for InMemoryVideoStore {
    async fn create_room(&self, room: NewVideoRoom) -> StoreResult<VideoRoom> {
        let now = self.tick();
        let doc = VideoRoom {
            id: Some(ObjectId::new()),
            name: room.name,
            description: room.description,
            host_id: room.host_id.clone(),
            participants: vec![room.host_id],
            max_participants: room.max_participants,
            visibility: room.visibility,
            code: room.code,
            chat_room_id: room.chat_room_id,
            chat_room_code: room.chat_room_code,
            created_at: now,
            updated_at: now,
        };
        let id = doc.id.map(|o| o.to_hex()).unwrap_or_default();
        self.rooms.lock().unwrap().insert(id, doc.clone());
        Ok(doc)
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<VideoRoom>> {
        Ok(self.room(room_id))
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<VideoRoom>> {
        Ok(self
            .rooms
            .lock()
            .unwrap()
            .values()
            .find(|r| r.code == code)
            .cloned())
    }

    async fn code_in_use(&self, code: &str) -> StoreResult<bool> {
        Ok(self.find_room_by_code(code).await?.is_some())
    }

    async fn link_chat_room(
        &self,
        room_id: &str,
        chat_room_id: &str,
        chat_room_code: &str,
    ) -> StoreResult<()> {
        if let Some(room) = self.rooms.lock().unwrap().get_mut(room_id) {
            room.chat_room_id = Some(chat_room_id.to_string());
            room.chat_room_code = Some(chat_room_code.to_string());
        }
        Ok(())
    }

    async fn try_add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<JoinOutcome> {
        let now = self.tick();
        let mut rooms = self.rooms.lock().unwrap();
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(JoinOutcome::NotFound);
        };
        if room.is_participant(user_id) {
            return Ok(JoinOutcome::AlreadyParticipant);
        }
        if room.participants.len() as u32 >= room.max_participants {
            return Ok(JoinOutcome::Full);
        }
        room.participants.push(user_id.to_string());
        room.updated_at = now;
        Ok(JoinOutcome::Added)
    }

    async fn remove_participant(&self, room_id: &str, user_id: &str) -> StoreResult<()> {
        if let Some(room) = self.rooms.lock().unwrap().get_mut(room_id) {
            room.participants.retain(|p| p != user_id);
        }
        if let Ok(oid) = ObjectId::parse_str(room_id) {
            self.participants
                .lock()
                .unwrap()
                .remove(&VideoParticipant::doc_id(&oid, user_id));
        }
        Ok(())
    }

    async fn put_participant(&self, participant: VideoParticipant) -> StoreResult<()> {
        self.participants
            .lock()
            .unwrap()
            .insert(participant.id.clone(), participant);
        Ok(())
    }

    async fn get_participant(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<VideoParticipant>> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(None);
        };
        Ok(self
            .participants
            .lock()
            .unwrap()
            .get(&VideoParticipant::doc_id(&oid, user_id))
            .cloned())
    }

    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<VideoParticipant>> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(Vec::new());
        };
        let mut participants: Vec<VideoParticipant> = self
            .participants
            .lock()
            .unwrap()
            .values()
            .filter(|p| p.room_id == oid)
            .cloned()
            .collect();
        participants.sort_by(|a, b| a.joined_at.cmp(&b.joined_at));
        Ok(participants)
    }

    async fn set_media_flag(
        &self,
        room_id: &str,
        user_id: &str,
        flag: MediaFlag,
        enabled: bool,
    ) -> StoreResult<bool> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(false);
        };
        let mut participants = self.participants.lock().unwrap();
        let Some(p) = participants.get_mut(&VideoParticipant::doc_id(&oid, user_id)) else {
            return Ok(false);
        };
        match flag {
            MediaFlag::Audio => p.audio_enabled = enabled,
            MediaFlag::Video => p.video_enabled = enabled,
            MediaFlag::Screen => p.screen_sharing = enabled,
        }
        Ok(true)
    }

    async fn end_room(&self, room_id: &str) -> StoreResult<bool> {
        let existed = self.rooms.lock().unwrap().remove(room_id).is_some();
        if let Ok(oid) = ObjectId::parse_str(room_id) {
            self.participants
                .lock()
                .unwrap()
                .retain(|_, p| p.room_id != oid);
        }
        Ok(existed)
    }
}
