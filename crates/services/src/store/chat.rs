use bson::{doc, oid::ObjectId, DateTime};
use futures::TryStreamExt;
use mongodb::{Collection, Database};
use tracing::warn;

use async_trait::async_trait;
use huddle_db::models::{ChatMessage, ChatRoom, UserProfile};

use super::{guard, ChatStore, NewChatMessage, NewChatRoom, StoreError, StoreResult};

pub struct MongoChatStore {
    rooms: Collection<ChatRoom>,
    messages: Collection<ChatMessage>,
    users: Collection<UserProfile>,
}

impl MongoChatStore {
    pub fn new(db: &Database) -> Self {
        Self {
            rooms: db.collection(ChatRoom::COLLECTION),
            messages: db.collection(ChatMessage::COLLECTION),
            users: db.collection(UserProfile::COLLECTION),
        }
    }

    async fn find_room_by_oid(&self, oid: ObjectId) -> StoreResult<Option<ChatRoom>> {
        guard("chat.find_room", || {
            self.rooms.find_one(doc! { "_id": oid })
        })
        .await
    }

    /// Ordered query with the in-memory fallback for a missing index.
    async fn find_rooms_sorted(&self, filter: bson::Document) -> StoreResult<Vec<ChatRoom>> {
        let ordered = guard("chat.find_rooms", || {
            let filter = filter.clone();
            async move {
                self.rooms
                    .find(filter)
                    .sort(doc! { "updated_at": -1 })
                    .await?
                    .try_collect::<Vec<_>>()
                    .await
            }
        })
        .await;

        match ordered {
            Ok(rooms) => Ok(rooms),
            Err(StoreError::Timeout) => Err(StoreError::Timeout),
            Err(e) => {
                warn!(error = %e, "Ordered room query failed, falling back to in-memory sort");
                let mut rooms = guard("chat.find_rooms_unordered", || {
                    let filter = filter.clone();
                    async move {
                        self.rooms
                            .find(filter)
                            .await?
                            .try_collect::<Vec<_>>()
                            .await
                    }
                })
                .await?;
                rooms.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
                Ok(rooms)
            }
        }
    }
}

#[async_trait]
impl ChatStore for MongoChatStore {
    async fn create_room(&self, room: NewChatRoom) -> StoreResult<ChatRoom> {
        let now = DateTime::now();
        let doc = ChatRoom {
            id: None,
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

        let inserted = guard("chat.create_room", || self.rooms.insert_one(&doc)).await?;
        let oid = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Serialization("inserted_id is not an ObjectId".into()))?;

        self.find_room_by_oid(oid)
            .await?
            .ok_or_else(|| StoreError::Unavailable("room vanished after insert".into()))
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<ChatRoom>> {
        match ObjectId::parse_str(room_id) {
            Ok(oid) => self.find_room_by_oid(oid).await,
            Err(_) => Ok(None),
        }
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<ChatRoom>> {
        guard("chat.find_room_by_code", || {
            self.rooms.find_one(doc! { "code": code })
        })
        .await
    }

    async fn code_in_use(&self, code: &str) -> StoreResult<bool> {
        Ok(self.find_room_by_code(code).await?.is_some())
    }

    async fn list_public_rooms(&self) -> StoreResult<Vec<ChatRoom>> {
        self.find_rooms_sorted(doc! { "visibility": "public" }).await
    }

    async fn list_private_rooms_with(&self, user_id: &str) -> StoreResult<Vec<ChatRoom>> {
        self.find_rooms_sorted(doc! { "visibility": "private", "participants": user_id })
            .await
    }

    async fn add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<bool> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(false);
        };
        let result = guard("chat.add_participant", || {
            self.rooms.update_one(
                doc! { "_id": oid },
                doc! {
                    "$addToSet": { "participants": user_id },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
        })
        .await?;
        Ok(result.modified_count > 0)
    }

    async fn insert_message(&self, message: NewChatMessage) -> StoreResult<ChatMessage> {
        let oid = ObjectId::parse_str(&message.room_id)
            .map_err(|_| StoreError::Serialization(format!("bad room id {}", message.room_id)))?;

        let metadata = message
            .metadata
            .map(|m| bson::to_bson(&m))
            .transpose()
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let doc = ChatMessage {
            id: None,
            room_id: oid,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            sender_avatar: message.sender_avatar,
            content: message.content,
            kind: message.kind,
            timestamp: DateTime::now(),
            metadata,
        };

        let inserted = guard("chat.insert_message", || self.messages.insert_one(&doc)).await?;
        let id = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Serialization("inserted_id is not an ObjectId".into()))?;

        Ok(ChatMessage {
            id: Some(id),
            ..doc
        })
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

        let mut filter = doc! { "room_id": room_oid };
        if let Some(cursor_id) = before {
            if let Ok(cursor_oid) = ObjectId::parse_str(cursor_id) {
                let anchor = guard("chat.cursor_lookup", || {
                    self.messages.find_one(doc! { "_id": cursor_oid })
                })
                .await?;
                if let Some(anchor) = anchor {
                    // Resume strictly after the anchor in (timestamp, _id)
                    // descending order.
                    filter = doc! {
                        "room_id": room_oid,
                        "$or": [
                            { "timestamp": { "$lt": anchor.timestamp } },
                            { "timestamp": anchor.timestamp, "_id": { "$lt": cursor_oid } },
                        ],
                    };
                }
            }
        }

        let ordered = guard("chat.list_messages", || {
            let filter = filter.clone();
            async move {
                self.messages
                    .find(filter)
                    .sort(doc! { "timestamp": -1, "_id": -1 })
                    .limit(limit)
                    .await?
                    .try_collect::<Vec<_>>()
                    .await
            }
        })
        .await;

        match ordered {
            Ok(messages) => Ok(messages),
            Err(StoreError::Timeout) => Err(StoreError::Timeout),
            Err(e) => {
                warn!(error = %e, "Ordered message query failed, falling back to in-memory sort");
                let mut messages = guard("chat.list_messages_unordered", || {
                    let filter = filter.clone();
                    async move {
                        self.messages
                            .find(filter)
                            .await?
                            .try_collect::<Vec<_>>()
                            .await
                    }
                })
                .await?;
                messages.sort_by(|a, b| b.timestamp.cmp(&a.timestamp).then(b.id.cmp(&a.id)));
                messages.truncate(limit as usize);
                Ok(messages)
            }
        }
    }

    async fn touch_room(&self, room_id: &str) -> StoreResult<()> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(());
        };
        guard("chat.touch_room", || {
            self.rooms.update_one(
                doc! { "_id": oid },
                doc! { "$set": { "updated_at": DateTime::now() } },
            )
        })
        .await?;
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> StoreResult<Option<UserProfile>> {
        guard("chat.fetch_profile", || {
            self.users.find_one(doc! { "_id": user_id })
        })
        .await
    }
}
