//! Activity log: per-user ledger entries (deposits, scores) kept in `logs`.

use bson::oid::ObjectId;
use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use super::{ServiceError, rfc3339};
use crate::db;

pub const KIND_DEPOSIT: &str = "deposit";
pub const KIND_SCORE: &str = "score";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogMeta {
    #[serde(rename = "type")]
    pub kind: String,
    pub uid: String,
    pub value: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLog {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub timestamp: DateTime,
    pub level: String,
    pub message: String,
    pub meta: LogMeta,
}

#[derive(Debug, Clone, Serialize)]
pub struct ActivityLogView {
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub value: i64,
}

impl From<ActivityLog> for ActivityLogView {
    fn from(log: ActivityLog) -> Self {
        Self { timestamp: rfc3339(log.timestamp), message: log.message, kind: log.meta.kind, value: log.meta.value }
    }
}

fn collection(database: &Database) -> mongodb::Collection<ActivityLog> {
    database.collection(db::LOGS)
}

/// Append an entry to the ledger.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn record(database: &Database, kind: &str, uid: &str, value: i64, message: &str) -> Result<(), ServiceError> {
    let entry = ActivityLog {
        id: None,
        timestamp: DateTime::now(),
        level: "info".into(),
        message: message.to_owned(),
        meta: LogMeta { kind: kind.to_owned(), uid: uid.to_owned(), value },
    };
    collection(database).insert_one(&entry, None).await?;
    Ok(())
}

/// Entries of `kind` for `uid`, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list(database: &Database, uid: &str, kind: &str) -> Result<Vec<ActivityLogView>, ServiceError> {
    let options = FindOptions::builder().sort(doc! { "timestamp": -1 }).build();
    let logs: Vec<ActivityLog> = collection(database)
        .find(doc! { "meta.uid": uid, "meta.type": kind }, options)
        .await?
        .try_collect()
        .await?;
    Ok(logs.into_iter().map(ActivityLogView::from).collect())
}

#[cfg(test)]
#[path = "activity_test.rs"]
mod tests;
