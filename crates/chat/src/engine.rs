//! Chat engine: room membership, message fan-out, presence and the
//! read-through caches. One instance per process; operations are methods on
//! the engine so tests can build it against fake capabilities.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use huddle_db::models::{ChatRoom, Visibility};
use huddle_services::cache::TtlCache;
use huddle_services::codes;
use huddle_services::store::{ChatStore, NewChatMessage, NewChatRoom};
use tracing::{debug, info};

use crate::error::ChatError;
use crate::ws::dispatcher;
use crate::ws::events::{
    ClientEvent, MessagesGetPayload, MessageSendPayload, RoomCreatePayload, RoomJoinPayload,
    ServerEvent, DEFAULT_MESSAGE_LIMIT, MAX_MESSAGE_LIMIT,
};
use crate::ws::registry::{SessionHandle, SessionRegistry};
use crate::ws::views::{MessageView, RoomView, UserView};

/// TTL for both the single-room cache and the shared public-list cache.
const ROOM_CACHE_TTL: Duration = Duration::from_secs(30);

pub struct ChatEngine {
    store: Arc<dyn ChatStore>,
    pub sessions: SessionRegistry,
    /// room id -> room document
    room_cache: TtlCache<String, ChatRoom>,
    /// Shared single-key cache for the public room list.
    public_cache: TtlCache<(), Vec<ChatRoom>>,
}

impl ChatEngine {
    pub fn new(store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(),
            room_cache: TtlCache::new(ROOM_CACHE_TTL),
            public_cache: TtlCache::new(ROOM_CACHE_TTL),
        }
    }

    /// Route one decoded client event to its handler. Exhaustive by
    /// construction; errors are reported to the offending session only.
    pub async fn dispatch(&self, session: &Arc<SessionHandle>, event: ClientEvent) {
        let result = match event {
            ClientEvent::RoomCreate(payload) => self.create_room(session, payload).await,
            ClientEvent::RoomJoin(payload) => self.join_room(session, payload).await,
            ClientEvent::RoomJoinByCode(payload) => {
                self.join_room_by_code(session, &payload.code).await
            }
            ClientEvent::RoomLeave(payload) => self.leave_room(session, &payload.room_id).await,
            ClientEvent::RoomGet(payload) => self.get_room(session, &payload.room_id).await,
            ClientEvent::MessageSend(payload) => self.send_message(session, payload).await,
            ClientEvent::MessagesGet(payload) => self.get_messages(session, payload).await,
        };

        if let Err(err) = result {
            debug!(session_id = %session.session_id, code = err.code(), "Chat operation failed");
            dispatcher::send_to(session, &ServerEvent::error(&err));
        }
    }

    // ── Session lifecycle ───────────────────────────────────────

    /// Register a freshly authenticated session, announce presence, and send
    /// the initial room list.
    pub async fn attach_session(&self, session: &Arc<SessionHandle>) {
        let first = self.sessions.register(session.clone());
        info!(
            session_id = %session.session_id,
            user_id = %session.user_id(),
            first,
            "Chat session connected"
        );
        if first {
            dispatcher::broadcast_all(
                &self.sessions,
                &ServerEvent::UserOnline {
                    user_id: session.user_id().to_string(),
                },
                Some(&session.session_id),
            );
        }

        match self.visible_rooms(session.user_id()).await {
            Ok(rooms) => dispatcher::send_to(session, &ServerEvent::RoomsList { rooms }),
            Err(err) => dispatcher::send_to(session, &ServerEvent::error(&err)),
        }
    }

    /// Reconcile presence and subscriptions for a closed connection.
    pub fn detach_session(&self, session_id: &str) {
        let Some((handle, last, _rooms)) = self.sessions.unregister(session_id) else {
            return;
        };
        info!(
            session_id,
            user_id = %handle.user_id(),
            last,
            "Chat session disconnected"
        );
        if last {
            dispatcher::broadcast_all(
                &self.sessions,
                &ServerEvent::UserOffline {
                    user_id: handle.user_id().to_string(),
                },
                None,
            );
        }
    }

    // ── Rooms ───────────────────────────────────────────────────

    pub async fn create_room(
        &self,
        session: &Arc<SessionHandle>,
        payload: RoomCreatePayload,
    ) -> Result<(), ChatError> {
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(ChatError::Validation("Room name is required".into()));
        }

        let code = match payload.visibility {
            Visibility::Private => Some(self.generate_unique_code().await?),
            Visibility::Public => None,
        };

        let mut participants = vec![session.user_id().to_string()];
        for user_id in payload.participants {
            if !participants.contains(&user_id) {
                participants.push(user_id);
            }
        }

        let room = self
            .store
            .create_room(NewChatRoom {
                name,
                description: payload.description,
                kind: payload.kind,
                visibility: payload.visibility,
                code,
                participants,
                created_by: session.user_id().to_string(),
                video_room_id: None,
            })
            .await?;

        self.public_cache.clear();

        let room_id = room.id.map(|o| o.to_hex()).unwrap_or_default();
        // The creator is a participant from the start and expects to see
        // joins and messages without an explicit room:join round-trip.
        self.sessions.subscribe(&room_id, &session.session_id);

        info!(room_id, visibility = ?room.visibility, "Chat room created");

        // Creator sees the code; public announcements never carry it.
        dispatcher::send_to(
            session,
            &ServerEvent::RoomCreated {
                room: RoomView::full(&room),
            },
        );
        if room.visibility == Visibility::Public {
            dispatcher::broadcast_all(
                &self.sessions,
                &ServerEvent::RoomCreated {
                    room: RoomView::redacted(&room),
                },
                Some(&session.session_id),
            );
        }
        Ok(())
    }

    pub async fn join_room(
        &self,
        session: &Arc<SessionHandle>,
        payload: RoomJoinPayload,
    ) -> Result<(), ChatError> {
        let room = self
            .fetch_room(&payload.room_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?;

        if room.visibility == Visibility::Private && !room.is_participant(session.user_id()) {
            let supplied = payload.code.as_deref().ok_or(ChatError::CodeRequired)?;
            let normalized = codes::normalize(supplied).map_err(|_| ChatError::InvalidCode)?;
            if room.code.as_deref() != Some(normalized.as_str()) {
                return Err(ChatError::InvalidCode);
            }
        }

        self.complete_join(session, room).await
    }

    pub async fn join_room_by_code(
        &self,
        session: &Arc<SessionHandle>,
        code: &str,
    ) -> Result<(), ChatError> {
        let normalized = codes::normalize(code).map_err(|_| ChatError::InvalidCodeFormat)?;
        let room = self
            .store
            .find_room_by_code(&normalized)
            .await?
            .ok_or(ChatError::RoomNotFound)?;
        if room.visibility != Visibility::Private {
            return Err(ChatError::NotPrivateRoom);
        }
        self.complete_join(session, room).await
    }

    /// Shared tail of both join paths: persist membership if needed,
    /// subscribe the session, and emit the join events.
    async fn complete_join(
        &self,
        session: &Arc<SessionHandle>,
        room: ChatRoom,
    ) -> Result<(), ChatError> {
        let room_id = room.id.map(|o| o.to_hex()).unwrap_or_default();

        let room = if room.is_participant(session.user_id()) {
            room
        } else {
            self.store
                .add_participant(&room_id, session.user_id())
                .await?;
            self.invalidate_room(&room_id);
            self.fetch_room(&room_id)
                .await?
                .ok_or(ChatError::RoomNotFound)?
        };

        let newly_subscribed = self.sessions.subscribe(&room_id, &session.session_id);
        if newly_subscribed {
            dispatcher::broadcast_room(
                &self.sessions,
                &room_id,
                &ServerEvent::RoomUserJoined {
                    room_id: room_id.clone(),
                    user: UserView::from(&session.user),
                },
                Some(&session.session_id),
            );
        }

        dispatcher::send_to(
            session,
            &ServerEvent::RoomJoined {
                room: RoomView::full(&room),
            },
        );
        Ok(())
    }

    pub async fn leave_room(
        &self,
        session: &Arc<SessionHandle>,
        room_id: &str,
    ) -> Result<(), ChatError> {
        // Unsubscribes the session only; persisted membership survives so the
        // user can rejoin without a code.
        let was_subscribed = self.sessions.unsubscribe(room_id, &session.session_id);
        if was_subscribed {
            dispatcher::broadcast_room(
                &self.sessions,
                room_id,
                &ServerEvent::RoomUserLeft {
                    room_id: room_id.to_string(),
                    user_id: session.user_id().to_string(),
                },
                Some(&session.session_id),
            );
        }
        dispatcher::send_to(
            session,
            &ServerEvent::RoomLeft {
                room_id: room_id.to_string(),
            },
        );
        Ok(())
    }

    pub async fn get_room(
        &self,
        session: &Arc<SessionHandle>,
        room_id: &str,
    ) -> Result<(), ChatError> {
        let room = self
            .fetch_room(room_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?;

        let view = if room.is_participant(session.user_id()) {
            RoomView::full(&room)
        } else if room.visibility == Visibility::Public {
            RoomView::redacted(&room)
        } else {
            return Err(ChatError::NotParticipant);
        };

        dispatcher::send_to(session, &ServerEvent::RoomDetails { room: view });
        Ok(())
    }

    // ── Messages ────────────────────────────────────────────────

    pub async fn send_message(
        &self,
        session: &Arc<SessionHandle>,
        payload: MessageSendPayload,
    ) -> Result<(), ChatError> {
        let content = payload.content.trim().to_string();
        if content.is_empty() {
            return Err(ChatError::Validation("Message content is required".into()));
        }

        let room = self
            .fetch_room(&payload.room_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?;
        if !room.is_participant(session.user_id()) {
            return Err(ChatError::NotParticipant);
        }
        let room_id = room.id.map(|o| o.to_hex()).unwrap_or_default();

        let (sender_name, sender_avatar) = self.sender_snapshot(session).await;

        let message = self
            .store
            .insert_message(NewChatMessage {
                room_id: room_id.clone(),
                sender_id: session.user_id().to_string(),
                sender_name,
                sender_avatar,
                content,
                kind: payload.kind.unwrap_or_default(),
                metadata: payload.metadata,
            })
            .await?;

        self.store.touch_room(&room_id).await?;
        self.invalidate_room(&room_id);

        dispatcher::broadcast_room(
            &self.sessions,
            &room_id,
            &ServerEvent::MessageNew {
                message: MessageView::from(&message),
            },
            None,
        );
        Ok(())
    }

    pub async fn get_messages(
        &self,
        session: &Arc<SessionHandle>,
        payload: MessagesGetPayload,
    ) -> Result<(), ChatError> {
        let room = self
            .fetch_room(&payload.room_id)
            .await?
            .ok_or(ChatError::RoomNotFound)?;
        if !room.is_participant(session.user_id()) {
            return Err(ChatError::NotParticipant);
        }

        let limit = payload
            .limit
            .unwrap_or(DEFAULT_MESSAGE_LIMIT)
            .clamp(0, MAX_MESSAGE_LIMIT);

        let mut messages = self
            .store
            .list_messages(&payload.room_id, limit, payload.before.as_deref())
            .await?;
        // Store order is newest-first; clients render chronologically.
        messages.reverse();

        dispatcher::send_to(
            session,
            &ServerEvent::MessagesList {
                room_id: payload.room_id,
                messages: messages.iter().map(MessageView::from).collect(),
            },
        );
        Ok(())
    }

    // ── Listing & caches ────────────────────────────────────────

    /// Public rooms (shared cache) merged with the user's private rooms
    /// (never cached), deduplicated, newest activity first.
    pub async fn visible_rooms(&self, user_id: &str) -> Result<Vec<RoomView>, ChatError> {
        let public = match self.public_cache.get(&()) {
            Some(rooms) => rooms,
            None => {
                let rooms = self.store.list_public_rooms().await?;
                self.public_cache.insert((), rooms.clone());
                rooms
            }
        };
        let private = self.store.list_private_rooms_with(user_id).await?;

        let mut seen = HashSet::new();
        let mut merged: Vec<ChatRoom> = Vec::with_capacity(public.len() + private.len());
        for room in public.into_iter().chain(private) {
            let id = room.id.map(|o| o.to_hex()).unwrap_or_default();
            if seen.insert(id) {
                merged.push(room);
            }
        }
        merged.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));

        Ok(merged
            .iter()
            .map(|room| {
                if room.is_participant(user_id) {
                    RoomView::full(room)
                } else {
                    RoomView::redacted(room)
                }
            })
            .collect())
    }

    async fn fetch_room(&self, room_id: &str) -> Result<Option<ChatRoom>, ChatError> {
        if let Some(room) = self.room_cache.get(&room_id.to_string()) {
            return Ok(Some(room));
        }
        let room = self.store.find_room(room_id).await?;
        if let Some(room) = &room {
            self.room_cache.insert(room_id.to_string(), room.clone());
        }
        Ok(room)
    }

    fn invalidate_room(&self, room_id: &str) {
        self.room_cache.remove(&room_id.to_string());
        self.public_cache.clear();
    }

    async fn generate_unique_code(&self) -> Result<String, ChatError> {
        for _ in 0..codes::CODE_GENERATION_ATTEMPTS {
            let code = codes::generate();
            if !self.store.code_in_use(&code).await? {
                return Ok(code);
            }
        }
        Err(ChatError::CodeGenerationFailed)
    }

    /// Name/avatar snapshot for a message: the session descriptor first,
    /// then the profile document the identity service maintains.
    async fn sender_snapshot(&self, session: &Arc<SessionHandle>) -> (Option<String>, Option<String>) {
        if session.user.display_name.is_some() || session.user.avatar_url.is_some() {
            return (
                session.user.display_name.clone(),
                session.user.avatar_url.clone(),
            );
        }
        match self.store.fetch_profile(session.user_id()).await {
            Ok(Some(profile)) => (profile.display_name, profile.avatar_url),
            _ => (None, None),
        }
    }
}
