//! In-memory session bookkeeping shared by the realtime engines: who is
//! connected, which user each session belongs to, and which rooms each
//! session is subscribed to.
//!
//! Generic over the outgoing frame type so this crate stays independent of
//! any particular socket library. All maps are keyed so mutations lock a
//! single shard entry at a time; broadcast paths take a snapshot of the
//! handles and send outside any lock.

use dashmap::DashMap;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;

use crate::auth::UserDescriptor;

/// One live connection. `sender` feeds the session's writer task, which is
/// the only place that touches the socket, so frames enqueued here reach the
/// client in order.
pub struct SessionHandle<F> {
    pub session_id: String,
    pub user: UserDescriptor,
    sender: UnboundedSender<F>,
}

impl<F> SessionHandle<F> {
    pub fn new(session_id: String, user: UserDescriptor, sender: UnboundedSender<F>) -> Self {
        Self {
            session_id,
            user,
            sender,
        }
    }

    pub fn user_id(&self) -> &str {
        &self.user.user_id
    }

    /// Enqueue a frame. A closed channel means the session is going away;
    /// the disconnect path cleans up, so failures are only worth a debug line.
    pub fn send_frame(&self, frame: F) {
        if self.sender.send(frame).is_err() {
            debug!(session_id = %self.session_id, "Dropping frame for closing session");
        }
    }
}

pub struct SessionRegistry<F> {
    /// session_id -> handle
    sessions: DashMap<String, Arc<SessionHandle<F>>>,
    /// user_id -> session ids (presence)
    presence: DashMap<String, HashSet<String>>,
    /// room_id -> subscribed session ids
    room_subscribers: DashMap<String, HashSet<String>>,
    /// session_id -> subscribed room ids
    session_rooms: DashMap<String, HashSet<String>>,
}

impl<F> Default for SessionRegistry<F> {
    fn default() -> Self {
        Self {
            sessions: DashMap::new(),
            presence: DashMap::new(),
            room_subscribers: DashMap::new(),
            session_rooms: DashMap::new(),
        }
    }
}

impl<F> SessionRegistry<F> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a session. Returns true when this is the user's first live
    /// session (the caller broadcasts `user:online` in that case).
    pub fn register(&self, handle: Arc<SessionHandle<F>>) -> bool {
        let mut entry = self
            .presence
            .entry(handle.user_id().to_string())
            .or_default();
        entry.insert(handle.session_id.clone());
        let first = entry.len() == 1;
        drop(entry);
        self.sessions.insert(handle.session_id.clone(), handle);
        first
    }

    /// Remove a session entirely. Returns the handle, whether the user has
    /// no remaining sessions, and the rooms the session was subscribed to.
    pub fn unregister(
        &self,
        session_id: &str,
    ) -> Option<(Arc<SessionHandle<F>>, bool, Vec<String>)> {
        let (_, handle) = self.sessions.remove(session_id)?;

        let mut last = false;
        if let Some(mut entry) = self.presence.get_mut(handle.user_id()) {
            entry.remove(session_id);
            if entry.is_empty() {
                last = true;
            }
        }
        if last {
            self.presence.remove(handle.user_id());
        }

        let mut subscribed = Vec::new();
        if let Some((_, rooms)) = self.session_rooms.remove(session_id) {
            for room_id in rooms {
                if let Some(mut subs) = self.room_subscribers.get_mut(&room_id) {
                    subs.remove(session_id);
                    if subs.is_empty() {
                        drop(subs);
                        self.room_subscribers.remove(&room_id);
                    }
                }
                subscribed.push(room_id);
            }
        }

        Some((handle, last, subscribed))
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<SessionHandle<F>>> {
        self.sessions.get(session_id).map(|h| h.clone())
    }

    /// Subscribe a session to a room's fan-out. Returns false when it was
    /// already subscribed.
    pub fn subscribe(&self, room_id: &str, session_id: &str) -> bool {
        let newly = self
            .room_subscribers
            .entry(room_id.to_string())
            .or_default()
            .insert(session_id.to_string());
        if newly {
            self.session_rooms
                .entry(session_id.to_string())
                .or_default()
                .insert(room_id.to_string());
        }
        newly
    }

    /// Returns false when the session was not subscribed.
    pub fn unsubscribe(&self, room_id: &str, session_id: &str) -> bool {
        let removed = self
            .room_subscribers
            .get_mut(room_id)
            .map(|mut subs| subs.remove(session_id))
            .unwrap_or(false);
        if removed {
            if let Some(mut rooms) = self.session_rooms.get_mut(session_id) {
                rooms.remove(room_id);
            }
        }
        removed
    }

    pub fn is_subscribed(&self, room_id: &str, session_id: &str) -> bool {
        self.room_subscribers
            .get(room_id)
            .map(|subs| subs.contains(session_id))
            .unwrap_or(false)
    }

    /// Snapshot of the handles subscribed to a room.
    pub fn room_subscribers(&self, room_id: &str) -> Vec<Arc<SessionHandle<F>>> {
        let Some(subs) = self.room_subscribers.get(room_id) else {
            return Vec::new();
        };
        let ids: Vec<String> = subs.iter().cloned().collect();
        drop(subs);
        ids.iter().filter_map(|id| self.get(id)).collect()
    }

    /// Drop every subscription to a room (used when a room is ended).
    /// Returns the sessions that were subscribed.
    pub fn clear_room(&self, room_id: &str) -> Vec<Arc<SessionHandle<F>>> {
        let Some((_, subs)) = self.room_subscribers.remove(room_id) else {
            return Vec::new();
        };
        let mut handles = Vec::with_capacity(subs.len());
        for session_id in subs {
            if let Some(mut rooms) = self.session_rooms.get_mut(&session_id) {
                rooms.remove(room_id);
            }
            if let Some(handle) = self.get(&session_id) {
                handles.push(handle);
            }
        }
        handles
    }

    /// Snapshot of every connected session.
    pub fn all_sessions(&self) -> Vec<Arc<SessionHandle<F>>> {
        self.sessions.iter().map(|e| e.value().clone()).collect()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    pub fn online_user_count(&self) -> usize {
        self.presence.len()
    }
}
