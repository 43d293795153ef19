use mongodb::{options::IndexOptions, Database, IndexModel};
use tracing::info;

/// Create the indexes the list/query paths depend on. Callers that hit a
/// missing index at runtime fall back to unordered queries, so failures here
/// are surfaced but not fatal to the caller's control flow.
pub async fn ensure_indexes(db: &Database) -> Result<(), mongodb::error::Error> {
    // Chat rooms
    create_indexes(
        db,
        "rooms",
        vec![
            index(bson::doc! { "visibility": 1, "updated_at": -1 }),
            index_unique_sparse(bson::doc! { "code": 1 }),
            index(bson::doc! { "visibility": 1, "participants": 1, "updated_at": -1 }),
        ],
    )
    .await?;

    // Chat messages
    create_indexes(
        db,
        "messages",
        vec![index(bson::doc! { "room_id": 1, "timestamp": -1 })],
    )
    .await?;

    // Video rooms
    create_indexes(
        db,
        "video_rooms",
        vec![index_unique(bson::doc! { "code": 1 })],
    )
    .await?;

    // Video participants
    create_indexes(
        db,
        "video_participants",
        vec![index(bson::doc! { "room_id": 1 })],
    )
    .await?;

    info!("All indexes ensured");
    Ok(())
}

fn index(keys: bson::Document) -> IndexModel {
    IndexModel::builder().keys(keys).build()
}

fn index_unique(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

fn index_unique_sparse(keys: bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).sparse(true).build())
        .build()
}

async fn create_indexes(
    db: &Database,
    collection: &str,
    indexes: Vec<IndexModel>,
) -> Result<(), mongodb::error::Error> {
    let coll = db.collection::<bson::Document>(collection);
    coll.create_indexes(indexes).await?;
    info!(collection, "Indexes created");
    Ok(())
}
