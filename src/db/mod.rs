//! Database client setup and index bootstrap.
//!
//! SYSTEM CONTEXT
//! ==============
//! Startup uses this module to open the shared MongoDB client and make sure
//! the unique indexes that back the domain invariants exist before accepting
//! traffic.

use mongodb::bson::doc;
use mongodb::options::IndexOptions;
use mongodb::{Client, Database, IndexModel};

pub const CHATS: &str = "chats";
pub const REALTIMES: &str = "realtimes";
pub const USERS: &str = "users";
pub const PLACES: &str = "places";
pub const REGISTEREDS: &str = "registereds";
pub const NOTICES: &str = "notices";
pub const LOGS: &str = "logs";
pub const FCM_TOKENS: &str = "fcmtokens";
pub const NOTIFICATION_SUBS: &str = "notificationsubs";
pub const REQUESTS: &str = "requests";

/// Connect to MongoDB and ensure indexes.
///
/// # Errors
///
/// Returns an error if the URI is invalid or index creation fails.
pub async fn init_database(uri: &str, name: &str) -> Result<Database, mongodb::error::Error> {
    let client = Client::with_uri_str(uri).await?;
    let database = client.database(name);
    ensure_indexes(&database).await?;
    Ok(database)
}

fn unique(keys: mongodb::bson::Document) -> IndexModel {
    IndexModel::builder()
        .keys(keys)
        .options(IndexOptions::builder().unique(true).build())
        .build()
}

/// At most one pending notice per sender, recipient and kind. Answered
/// notices drop out of the index so a new request can follow.
#[must_use]
pub fn pending_notice_index() -> IndexModel {
    IndexModel::builder()
        .keys(doc! { "from": 1, "to": 1, "type": 1 })
        .options(
            IndexOptions::builder()
                .unique(true)
                .partial_filter_expression(doc! { "status": "pending" })
                .name("pending_notice_unique".to_owned())
                .build(),
        )
        .build()
}

/// Create the indexes the services rely on. Idempotent.
///
/// # Errors
///
/// Returns an error if any index cannot be created.
pub async fn ensure_indexes(database: &Database) -> Result<(), mongodb::error::Error> {
    // One chat per unordered pair; the pair is stored canonically ordered.
    database
        .collection::<mongodb::bson::Document>(CHATS)
        .create_index(unique(doc! { "user1": 1, "user2": 1 }), None)
        .await?;
    // One realtime document per day. Entry upserts rely on this to detect races.
    database
        .collection::<mongodb::bson::Document>(REALTIMES)
        .create_index(unique(doc! { "date": 1 }), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(USERS)
        .create_index(unique(doc! { "uid": 1 }), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(REGISTEREDS)
        .create_index(unique(doc! { "uid": 1 }), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(FCM_TOKENS)
        .create_index(unique(doc! { "uid": 1 }), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(NOTIFICATION_SUBS)
        .create_index(unique(doc! { "uid": 1, "endpoint": 1 }), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(NOTICES)
        .create_index(IndexModel::builder().keys(doc! { "to": 1, "type": 1 }).build(), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(NOTICES)
        .create_index(pending_notice_index(), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(PLACES)
        .create_index(IndexModel::builder().keys(doc! { "status": 1 }).build(), None)
        .await?;
    database
        .collection::<mongodb::bson::Document>(REQUESTS)
        .create_index(IndexModel::builder().keys(doc! { "category": 1, "createdAt": -1 }).build(), None)
        .await?;

    tracing::info!(database = database.name(), "indexes ensured");
    Ok(())
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
