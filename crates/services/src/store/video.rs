use bson::{doc, oid::ObjectId, DateTime};
use futures::TryStreamExt;
use mongodb::{Collection, Database};

use async_trait::async_trait;
use huddle_db::models::{VideoParticipant, VideoRoom};

use super::{guard, JoinOutcome, MediaFlag, NewVideoRoom, StoreError, StoreResult, VideoStore};

pub struct MongoVideoStore {
    rooms: Collection<VideoRoom>,
    participants: Collection<VideoParticipant>,
}

impl MongoVideoStore {
    pub fn new(db: &Database) -> Self {
        Self {
            rooms: db.collection(VideoRoom::COLLECTION),
            participants: db.collection(VideoParticipant::COLLECTION),
        }
    }

    async fn find_room_by_oid(&self, oid: ObjectId) -> StoreResult<Option<VideoRoom>> {
        guard("video.find_room", || {
            self.rooms.find_one(doc! { "_id": oid })
        })
        .await
    }
}

#[async_trait]
impl VideoStore for MongoVideoStore {
    async fn create_room(&self, room: NewVideoRoom) -> StoreResult<VideoRoom> {
        let now = DateTime::now();
        let doc = VideoRoom {
            id: None,
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

        let inserted = guard("video.create_room", || self.rooms.insert_one(&doc)).await?;
        let oid = inserted
            .inserted_id
            .as_object_id()
            .ok_or_else(|| StoreError::Serialization("inserted_id is not an ObjectId".into()))?;

        self.find_room_by_oid(oid)
            .await?
            .ok_or_else(|| StoreError::Unavailable("room vanished after insert".into()))
    }

    async fn find_room(&self, room_id: &str) -> StoreResult<Option<VideoRoom>> {
        match ObjectId::parse_str(room_id) {
            Ok(oid) => self.find_room_by_oid(oid).await,
            Err(_) => Ok(None),
        }
    }

    async fn find_room_by_code(&self, code: &str) -> StoreResult<Option<VideoRoom>> {
        guard("video.find_room_by_code", || {
            self.rooms.find_one(doc! { "code": code })
        })
        .await
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
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(());
        };
        guard("video.link_chat_room", || {
            self.rooms.update_one(
                doc! { "_id": oid },
                doc! {
                    "$set": {
                        "chat_room_id": chat_room_id,
                        "chat_room_code": chat_room_code,
                        "updated_at": DateTime::now(),
                    }
                },
            )
        })
        .await?;
        Ok(())
    }

    async fn try_add_participant(&self, room_id: &str, user_id: &str) -> StoreResult<JoinOutcome> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(JoinOutcome::NotFound);
        };

        // One atomic update: only matches while the user is absent AND a slot
        // is free, so the last slot cannot be handed out twice.
        let result = guard("video.try_add_participant", || {
            self.rooms.update_one(
                doc! {
                    "_id": oid,
                    "participants": { "$ne": user_id },
                    "$expr": { "$lt": [ { "$size": "$participants" }, "$max_participants" ] },
                },
                doc! {
                    "$addToSet": { "participants": user_id },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
        })
        .await?;

        if result.modified_count > 0 {
            return Ok(JoinOutcome::Added);
        }

        // The filter missed: distinguish which precondition failed.
        match self.find_room_by_oid(oid).await? {
            None => Ok(JoinOutcome::NotFound),
            Some(room) if room.is_participant(user_id) => Ok(JoinOutcome::AlreadyParticipant),
            Some(_) => Ok(JoinOutcome::Full),
        }
    }

    async fn remove_participant(&self, room_id: &str, user_id: &str) -> StoreResult<()> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(());
        };
        guard("video.pull_participant", || {
            self.rooms.update_one(
                doc! { "_id": oid },
                doc! {
                    "$pull": { "participants": user_id },
                    "$set": { "updated_at": DateTime::now() },
                },
            )
        })
        .await?;
        guard("video.delete_participant_record", || {
            self.participants
                .delete_one(doc! { "_id": VideoParticipant::doc_id(&oid, user_id) })
        })
        .await?;
        Ok(())
    }

    async fn put_participant(&self, participant: VideoParticipant) -> StoreResult<()> {
        guard("video.put_participant", || {
            self.participants
                .replace_one(doc! { "_id": &participant.id }, &participant)
                .upsert(true)
        })
        .await?;
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
        guard("video.get_participant", || {
            self.participants
                .find_one(doc! { "_id": VideoParticipant::doc_id(&oid, user_id) })
        })
        .await
    }

    async fn list_participants(&self, room_id: &str) -> StoreResult<Vec<VideoParticipant>> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(Vec::new());
        };
        guard("video.list_participants", || async move {
            self.participants
                .find(doc! { "room_id": oid })
                .await?
                .try_collect::<Vec<_>>()
                .await
        })
        .await
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
        let mut set = bson::Document::new();
        set.insert(flag.field(), enabled);
        let result = guard("video.set_media_flag", || {
            self.participants.update_one(
                doc! { "_id": VideoParticipant::doc_id(&oid, user_id) },
                doc! { "$set": set.clone() },
            )
        })
        .await?;
        Ok(result.matched_count > 0)
    }

    async fn end_room(&self, room_id: &str) -> StoreResult<bool> {
        let Ok(oid) = ObjectId::parse_str(room_id) else {
            return Ok(false);
        };
        guard("video.delete_room_participants", || {
            self.participants.delete_many(doc! { "room_id": oid })
        })
        .await?;
        let result = guard("video.delete_room", || {
            self.rooms.delete_one(doc! { "_id": oid })
        })
        .await?;
        Ok(result.deleted_count > 0)
    }
}
