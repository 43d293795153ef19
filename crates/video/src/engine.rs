//! Video engine: room lifecycle, capacity-checked joins, the signaling
//! relay, and per-participant media state.
//!
//! Media packets never pass through here; the engine only forwards
//! offer/answer/ICE control messages and keeps enough state for peers to
//! associate streams with users.

use std::sync::Arc;

use bson::DateTime;
use huddle_db::models::{VideoParticipant, VideoRoom, Visibility, DEFAULT_MAX_PARTICIPANTS};
use huddle_services::codes;
use huddle_services::store::{ChatStore, JoinOutcome, MediaFlag, NewChatRoom, NewVideoRoom, VideoStore};
use serde_json::{json, Value};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::VideoError;
use crate::signal::{self, SignalKind};
use crate::ws::dispatcher;
use crate::ws::events::{
    ClientEvent, RoomCreatePayload, RoomJoinPayload, ServerEvent, SignalPayload,
    StreamReadyPayload, TogglePayload,
};
use crate::ws::registry::{SessionHandle, SessionRegistry};
use crate::ws::views::{ParticipantView, VideoRoomView};

pub struct VideoEngine {
    store: Arc<dyn VideoStore>,
    /// Used only to maintain the linked chat room (creation and best-effort
    /// membership adds).
    chat_store: Arc<dyn ChatStore>,
    pub sessions: SessionRegistry,
}

impl VideoEngine {
    pub fn new(store: Arc<dyn VideoStore>, chat_store: Arc<dyn ChatStore>) -> Self {
        Self {
            store,
            chat_store,
            sessions: SessionRegistry::new(),
        }
    }

    pub async fn dispatch(&self, session: &Arc<SessionHandle>, event: ClientEvent) {
        let result = match event {
            ClientEvent::RoomCreate(payload) => self.create_room(session, payload).await,
            ClientEvent::RoomJoin(payload) => self.join_room(session, payload).await,
            ClientEvent::RoomLeave(payload) => self.leave_room(session, &payload.room_id).await,
            ClientEvent::RoomEnd(payload) => self.end_room(session, &payload.room_id).await,
            ClientEvent::Signal(payload) => self.relay_signal(session, payload).await,
            ClientEvent::ToggleAudio(payload) => {
                self.toggle(session, payload, MediaFlag::Audio).await
            }
            ClientEvent::ToggleVideo(payload) => {
                self.toggle(session, payload, MediaFlag::Video).await
            }
            ClientEvent::ToggleScreen(payload) => {
                self.toggle(session, payload, MediaFlag::Screen).await
            }
            ClientEvent::ScreenStart(payload) => {
                self.set_screen(session, &payload.room_id, true).await
            }
            ClientEvent::ScreenStop(payload) => {
                self.set_screen(session, &payload.room_id, false).await
            }
            ClientEvent::StreamReady(payload) => self.stream_ready(session, payload).await,
        };

        if let Err(err) = result {
            debug!(session_id = %session.session_id, code = err.code(), "Video operation failed");
            dispatcher::send_to(session, &ServerEvent::error(&err));
        }
    }

    pub fn attach_session(&self, session: &Arc<SessionHandle>) {
        self.sessions.register(session.clone());
        info!(
            session_id = %session.session_id,
            user_id = %session.user_id(),
            "Video session connected"
        );
    }

    /// Disconnect cleanup: drop the session's media-state records and tell
    /// each room the user left.
    pub async fn detach_session(&self, session_id: &str) {
        let Some((handle, _last, rooms)) = self.sessions.unregister(session_id) else {
            return;
        };
        info!(session_id, user_id = %handle.user_id(), "Video session disconnected");

        for room_id in rooms {
            if let Err(e) = self
                .store
                .remove_participant(&room_id, handle.user_id())
                .await
            {
                warn!(room_id, error = %e, "Failed to remove participant on disconnect");
            }
            dispatcher::broadcast_room(
                &self.sessions,
                &room_id,
                &ServerEvent::UserLeft {
                    room_id: room_id.clone(),
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
    ) -> Result<(), VideoError> {
        let name = payload.name.trim().to_string();
        if name.is_empty() {
            return Err(VideoError::Validation("Room name is required".into()));
        }

        let code = self.generate_unique_code().await?;

        // Public path policy: rooms are public and capped at the default
        // size regardless of what the client asks for.
        let mut room = self
            .store
            .create_room(NewVideoRoom {
                name: name.clone(),
                description: payload.description,
                host_id: session.user_id().to_string(),
                max_participants: DEFAULT_MAX_PARTICIPANTS,
                visibility: Visibility::Public,
                code,
                chat_room_id: None,
                chat_room_code: None,
            })
            .await?;
        let room_id = room.id.map(|o| o.to_hex()).unwrap_or_default();

        if payload.with_chat.unwrap_or(true) {
            match self.create_linked_chat_room(&room_id, &name, session.user_id()).await {
                Ok((chat_id, chat_code)) => {
                    self.store
                        .link_chat_room(&room_id, &chat_id, &chat_code)
                        .await?;
                    room.chat_room_id = Some(chat_id);
                    room.chat_room_code = Some(chat_code);
                }
                // The video room works without its side channel.
                Err(e) => warn!(room_id, error = %e, "Failed to create linked chat room"),
            }
        }

        self.write_participant_record(&room, session).await?;
        self.sessions.subscribe(&room_id, &session.session_id);

        info!(room_id, host = %session.user_id(), "Video room created");

        dispatcher::send_to(
            session,
            &ServerEvent::RoomCreated {
                room: VideoRoomView::from(&room),
            },
        );
        Ok(())
    }

    pub async fn join_room(
        &self,
        session: &Arc<SessionHandle>,
        payload: RoomJoinPayload,
    ) -> Result<(), VideoError> {
        // Codes win over ids when both are supplied.
        let room = match payload.code.as_deref() {
            Some(code) => {
                let normalized = codes::normalize(code)
                    .map_err(|_| VideoError::RoomNotFound)?;
                self.store.find_room_by_code(&normalized).await?
            }
            None => match payload.room_id.as_deref() {
                Some(room_id) => self.store.find_room(room_id).await?,
                None => None,
            },
        }
        .ok_or(VideoError::RoomNotFound)?;
        let room_id = room.id.map(|o| o.to_hex()).unwrap_or_default();

        match self
            .store
            .try_add_participant(&room_id, session.user_id())
            .await?
        {
            JoinOutcome::NotFound => return Err(VideoError::RoomNotFound),
            JoinOutcome::Full => return Err(VideoError::RoomFull),
            JoinOutcome::Added | JoinOutcome::AlreadyParticipant => {}
        }

        let room = self
            .store
            .find_room(&room_id)
            .await?
            .ok_or(VideoError::RoomNotFound)?;

        let participant = self.write_participant_record(&room, session).await?;

        // Best effort: joining the call also joins the linked chat room.
        if let Some(chat_room_id) = &room.chat_room_id {
            if let Err(e) = self
                .chat_store
                .add_participant(chat_room_id, session.user_id())
                .await
            {
                warn!(chat_room_id, error = %e, "Failed to add user to linked chat room");
            }
        }

        self.sessions.subscribe(&room_id, &session.session_id);

        dispatcher::broadcast_room(
            &self.sessions,
            &room_id,
            &ServerEvent::UserJoined {
                room_id: room_id.clone(),
                participant: ParticipantView::from(&participant),
            },
            Some(&session.session_id),
        );

        // The joiner gets the full snapshot it needs to start dialing peers.
        let participants = self.store.list_participants(&room_id).await?;
        dispatcher::send_to(
            session,
            &ServerEvent::RoomJoined {
                room: VideoRoomView::from(&room),
                participants: participants.iter().map(ParticipantView::from).collect(),
            },
        );
        Ok(())
    }

    /// Idempotent: leaving a room you are not in is a no-op.
    pub async fn leave_room(
        &self,
        session: &Arc<SessionHandle>,
        room_id: &str,
    ) -> Result<(), VideoError> {
        self.store
            .remove_participant(room_id, session.user_id())
            .await?;
        self.sessions.unsubscribe(room_id, &session.session_id);

        dispatcher::broadcast_room(
            &self.sessions,
            room_id,
            &ServerEvent::UserLeft {
                room_id: room_id.to_string(),
                user_id: session.user_id().to_string(),
            },
            None,
        );
        dispatcher::send_to(
            session,
            &ServerEvent::RoomLeft {
                room_id: room_id.to_string(),
            },
        );
        Ok(())
    }

    pub async fn end_room(
        &self,
        session: &Arc<SessionHandle>,
        room_id: &str,
    ) -> Result<(), VideoError> {
        let room = self
            .store
            .find_room(room_id)
            .await?
            .ok_or(VideoError::RoomNotFound)?;
        if room.host_id != session.user_id() {
            return Err(VideoError::Unauthorized);
        }

        self.store.end_room(room_id).await?;

        dispatcher::broadcast_room(
            &self.sessions,
            room_id,
            &ServerEvent::RoomEnded {
                room_id: room_id.to_string(),
            },
            None,
        );
        self.sessions.clear_room(room_id);

        info!(room_id, host = %session.user_id(), "Video room ended");
        Ok(())
    }

    // ── Signaling relay ─────────────────────────────────────────

    pub async fn relay_signal(
        &self,
        session: &Arc<SessionHandle>,
        payload: SignalPayload,
    ) -> Result<(), VideoError> {
        let kind = SignalKind::parse(&payload.kind)
            .ok_or_else(|| VideoError::InvalidSignalType(payload.kind.clone()))?;

        let body = match payload.payload {
            Some(Value::Null) | None => return Err(VideoError::MissingSignalData),
            Some(body) => body,
        };
        signal::validate_payload(kind, &body)?;

        if kind.requires_target() && payload.target_user_id.is_none() {
            return Err(VideoError::MustIncludeTarget);
        }

        let room = self
            .store
            .find_room(&payload.room_id)
            .await?
            .ok_or(VideoError::RoomNotFound)?;
        if !room.is_participant(session.user_id()) {
            return Err(VideoError::NotInRoom);
        }
        let room_id = payload.room_id;

        // Overlay the sender's live media flags so the receiver can tell a
        // screen track from a camera track without another round-trip.
        let sender_state = self
            .store
            .get_participant(&room_id, session.user_id())
            .await?;
        let metadata = enrich_metadata(payload.metadata, sender_state.as_ref());

        let event = ServerEvent::Signal {
            room_id: room_id.clone(),
            from_user_id: session.user_id().to_string(),
            kind: kind.as_str().to_string(),
            payload: body,
            metadata,
        };

        match payload.target_user_id {
            Some(target_user_id) => {
                let target = self
                    .store
                    .get_participant(&room_id, &target_user_id)
                    .await?
                    .ok_or(VideoError::TargetUserNotFound)?;
                let handle = self
                    .sessions
                    .get(&target.socket_id)
                    .ok_or(VideoError::TargetUserNotFound)?;
                dispatcher::send_to(&handle, &event);
            }
            None => {
                dispatcher::broadcast_room(
                    &self.sessions,
                    &room_id,
                    &event,
                    Some(&session.session_id),
                );
            }
        }
        Ok(())
    }

    // ── Media state ─────────────────────────────────────────────

    async fn toggle(
        &self,
        session: &Arc<SessionHandle>,
        payload: TogglePayload,
        flag: MediaFlag,
    ) -> Result<(), VideoError> {
        let updated = self
            .store
            .set_media_flag(&payload.room_id, session.user_id(), flag, payload.enabled)
            .await?;
        if !updated {
            return Err(VideoError::NotInRoom);
        }

        let room_id = payload.room_id.clone();
        let user_id = session.user_id().to_string();
        let event = match flag {
            MediaFlag::Audio => ServerEvent::AudioToggled {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                enabled: payload.enabled,
            },
            MediaFlag::Video => ServerEvent::VideoToggled {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                enabled: payload.enabled,
            },
            MediaFlag::Screen => ServerEvent::ScreenToggled {
                room_id: room_id.clone(),
                user_id: user_id.clone(),
                enabled: payload.enabled,
            },
        };
        dispatcher::broadcast_room(&self.sessions, &room_id, &event, None);

        // A new screen track needs a fresh peer connection on every viewer.
        if flag == MediaFlag::Screen && payload.enabled {
            dispatcher::broadcast_room(
                &self.sessions,
                &room_id,
                &ServerEvent::ScreenNegotiationNeeded { room_id: room_id.clone(), user_id },
                Some(&session.session_id),
            );
        }
        Ok(())
    }

    async fn set_screen(
        &self,
        session: &Arc<SessionHandle>,
        room_id: &str,
        enabled: bool,
    ) -> Result<(), VideoError> {
        let updated = self
            .store
            .set_media_flag(room_id, session.user_id(), MediaFlag::Screen, enabled)
            .await?;
        if !updated {
            return Err(VideoError::NotInRoom);
        }

        let user_id = session.user_id().to_string();
        let event = if enabled {
            ServerEvent::ScreenStarted {
                room_id: room_id.to_string(),
                user_id: user_id.clone(),
            }
        } else {
            ServerEvent::ScreenStopped {
                room_id: room_id.to_string(),
                user_id: user_id.clone(),
            }
        };
        dispatcher::broadcast_room(&self.sessions, room_id, &event, None);

        if enabled {
            dispatcher::broadcast_room(
                &self.sessions,
                room_id,
                &ServerEvent::ScreenNegotiationNeeded {
                    room_id: room_id.to_string(),
                    user_id,
                },
                Some(&session.session_id),
            );
        }
        Ok(())
    }

    async fn stream_ready(
        &self,
        session: &Arc<SessionHandle>,
        payload: StreamReadyPayload,
    ) -> Result<(), VideoError> {
        if let Some(screen_sharing) = payload.screen_sharing {
            self.store
                .set_media_flag(
                    &payload.room_id,
                    session.user_id(),
                    MediaFlag::Screen,
                    screen_sharing,
                )
                .await?;
        }

        let stream_type = match payload.stream_type {
            Some(stream_type) => stream_type,
            None => {
                let screen = self
                    .store
                    .get_participant(&payload.room_id, session.user_id())
                    .await?
                    .map(|p| p.screen_sharing)
                    .unwrap_or(false);
                if screen { "screen".to_string() } else { "camera".to_string() }
            }
        };

        dispatcher::broadcast_room(
            &self.sessions,
            &payload.room_id,
            &ServerEvent::StreamReady {
                room_id: payload.room_id.clone(),
                user_id: session.user_id().to_string(),
                stream_id: payload
                    .stream_id
                    .unwrap_or_else(|| Uuid::new_v4().to_string()),
                stream_type,
            },
            Some(&session.session_id),
        );
        Ok(())
    }

    // ── HTTP read surface ───────────────────────────────────────

    pub async fn find_room(&self, room_id: &str) -> Result<Option<VideoRoom>, VideoError> {
        Ok(self.store.find_room(room_id).await?)
    }

    /// `None` when the room itself does not exist.
    pub async fn room_participants(
        &self,
        room_id: &str,
    ) -> Result<Option<Vec<VideoParticipant>>, VideoError> {
        if self.store.find_room(room_id).await?.is_none() {
            return Ok(None);
        }
        Ok(Some(self.store.list_participants(room_id).await?))
    }

    pub async fn participant_media_state(
        &self,
        room_id: &str,
        user_id: &str,
    ) -> Result<Option<VideoParticipant>, VideoError> {
        Ok(self.store.get_participant(room_id, user_id).await?)
    }

    // ── Helpers ─────────────────────────────────────────────────

    async fn generate_unique_code(&self) -> Result<String, VideoError> {
        for _ in 0..codes::CODE_GENERATION_ATTEMPTS {
            let code = codes::generate();
            if !self.store.code_in_use(&code).await? {
                return Ok(code);
            }
        }
        Err(VideoError::CodeGenerationFailed)
    }

    async fn create_linked_chat_room(
        &self,
        video_room_id: &str,
        name: &str,
        creator_id: &str,
    ) -> Result<(String, String), VideoError> {
        let mut chat_code = None;
        for _ in 0..codes::CODE_GENERATION_ATTEMPTS {
            let code = codes::generate();
            if !self.chat_store.code_in_use(&code).await? {
                chat_code = Some(code);
                break;
            }
        }
        let chat_code = chat_code.ok_or(VideoError::CodeGenerationFailed)?;

        let chat_room = self
            .chat_store
            .create_room(NewChatRoom {
                name: name.to_string(),
                description: None,
                kind: huddle_db::models::RoomKind::Group,
                visibility: Visibility::Private,
                code: Some(chat_code.clone()),
                participants: vec![creator_id.to_string()],
                created_by: creator_id.to_string(),
                video_room_id: Some(video_room_id.to_string()),
            })
            .await?;

        Ok((
            chat_room.id.map(|o| o.to_hex()).unwrap_or_default(),
            chat_code,
        ))
    }

    /// Write the fresh media-state record for a session entering a room.
    async fn write_participant_record(
        &self,
        room: &VideoRoom,
        session: &Arc<SessionHandle>,
    ) -> Result<VideoParticipant, VideoError> {
        let room_oid = room.id.ok_or(VideoError::RoomNotFound)?;
        let participant = VideoParticipant {
            id: VideoParticipant::doc_id(&room_oid, session.user_id()),
            room_id: room_oid,
            user_id: session.user_id().to_string(),
            socket_id: session.session_id.clone(),
            display_name: session.user.display_name.clone(),
            email: session.user.email.clone(),
            audio_enabled: true,
            video_enabled: true,
            screen_sharing: false,
            joined_at: DateTime::now(),
        };
        self.store.put_participant(participant.clone()).await?;
        Ok(participant)
    }
}

/// Overlay the sender's media flags and stream type onto signal metadata.
fn enrich_metadata(metadata: Option<Value>, sender: Option<&VideoParticipant>) -> Value {
    let mut metadata = match metadata {
        Some(Value::Object(map)) => Value::Object(map),
        _ => json!({}),
    };

    let (audio, video, screen) = sender
        .map(|p| (p.audio_enabled, p.video_enabled, p.screen_sharing))
        .unwrap_or((true, true, false));

    if let Value::Object(map) = &mut metadata {
        map.insert("audioEnabled".into(), Value::Bool(audio));
        map.insert("videoEnabled".into(), Value::Bool(video));
        map.insert("screenSharing".into(), Value::Bool(screen));
        map.insert(
            "streamType".into(),
            Value::String(if screen { "screen" } else { "camera" }.into()),
        );
    }
    metadata
}
