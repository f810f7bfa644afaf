//! Social notices: likes, friend requests and alphabet exchange requests.
//!
//! Every notice is addressed by uid (`from` -> `to`). Requests carry a status
//! the recipient moves from `pending` to `response` (accepted) or `refusal`.

use bson::oid::ObjectId;
use bson::{DateTime, Document, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::{FindOneAndUpdateOptions, FindOptions, ReturnDocument, UpdateOptions};
use serde::{Deserialize, Serialize};

use super::activity::{self, ActivityLogView};
use super::error::is_duplicate_key;
use super::identity::Identity;
use super::{ServiceError, rfc3339, user};
use crate::db;
use crate::push::PushFanout;

pub const LIKE_TITLE: &str = "You received a like";
pub const FRIEND_REQUEST_TITLE: &str = "You received a friend request";
const MAX_NOTICE_MESSAGE_CHARS: usize = 200;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeKind {
    Like,
    Friend,
    Alphabet,
}

impl NoticeKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Friend => "friend",
            Self::Alphabet => "alphabet",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NoticeStatus {
    Pending,
    Response,
    Refusal,
}

impl NoticeStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "response" => Some(Self::Response),
            "refusal" => Some(Self::Refusal),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Response => "response",
            Self::Refusal => "refusal",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    #[serde(default)]
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub status: NoticeStatus,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct NoticeView {
    pub id: String,
    pub from: String,
    pub to: String,
    #[serde(rename = "type")]
    pub kind: NoticeKind,
    pub message: String,
    pub sub: Option<String>,
    pub status: NoticeStatus,
    pub created_at: String,
}

impl From<Notice> for NoticeView {
    fn from(n: Notice) -> Self {
        Self {
            id: n.id.map(|id| id.to_hex()).unwrap_or_default(),
            from: n.from,
            to: n.to,
            kind: n.kind,
            message: n.message,
            sub: n.sub,
            status: n.status,
            created_at: rfc3339(n.created_at),
        }
    }
}

/// A new request from the caller.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NoticeRequest {
    #[serde(alias = "toUid")]
    pub to: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub sub: Option<String>,
}

fn validate_target(caller_uid: &str, to: &str) -> Result<(), ServiceError> {
    if to.trim().is_empty() {
        return Err(ServiceError::validation("recipient uid is required"));
    }
    if to == caller_uid {
        return Err(ServiceError::validation("cannot send a notice to yourself"));
    }
    Ok(())
}

fn validate_message(message: &str) -> Result<String, ServiceError> {
    let message = message.trim();
    if message.chars().count() > MAX_NOTICE_MESSAGE_CHARS {
        return Err(ServiceError::validation(format!("message exceeds {MAX_NOTICE_MESSAGE_CHARS} characters")));
    }
    Ok(message.to_owned())
}

/// Update that creates a pending notice only if none exists for the filter.
fn pending_insert(message: &str, sub: Option<&str>, now: DateTime) -> Document {
    let mut fields = doc! { "message": message, "createdAt": now };
    if let Some(sub) = sub.map(str::trim).filter(|s| !s.is_empty()) {
        fields.insert("sub", sub);
    }
    doc! { "$setOnInsert": fields }
}

fn pending_conflict(kind: NoticeKind) -> ServiceError {
    ServiceError::Conflict(format!("a pending {} request already exists", kind.as_str()))
}

fn collection(database: &Database) -> mongodb::Collection<Notice> {
    database.collection(db::NOTICES)
}

async fn list(database: &Database, filter: Document) -> Result<Vec<NoticeView>, ServiceError> {
    let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
    let notices: Vec<Notice> = collection(database).find(filter, options).await?.try_collect().await?;
    Ok(notices.into_iter().map(NoticeView::from).collect())
}

/// The caller's score history, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_active_log(database: &Database, caller_uid: &str) -> Result<Vec<ActivityLogView>, ServiceError> {
    activity::list(database, caller_uid, activity::KIND_SCORE).await
}

/// Likes the caller received.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_like(database: &Database, caller_uid: &str) -> Result<Vec<NoticeView>, ServiceError> {
    list(database, doc! { "to": caller_uid, "type": NoticeKind::Like.as_str() }).await
}

/// Likes the caller sent or received.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_like_all(database: &Database, caller_uid: &str) -> Result<Vec<NoticeView>, ServiceError> {
    list(
        database,
        doc! { "type": NoticeKind::Like.as_str(), "$or": [{ "to": caller_uid }, { "from": caller_uid }] },
    )
    .await
}

/// Like `to`. Liking again refreshes the message and timestamp.
///
/// # Errors
///
/// Returns a validation error for a self-like or oversized message, or a
/// database error.
pub async fn set_like(
    database: &Database,
    push: &PushFanout,
    caller: &Identity,
    to: &str,
    message: &str,
) -> Result<(), ServiceError> {
    validate_target(&caller.uid, to)?;
    let message = validate_message(message)?;
    let filter = doc! { "from": caller.uid.as_str(), "to": to, "type": NoticeKind::Like.as_str() };
    let update = doc! {
        "$set": { "message": message.as_str(), "createdAt": DateTime::now() },
        "$setOnInsert": { "status": NoticeStatus::Pending.as_str() },
    };
    let options = UpdateOptions::builder().upsert(true).build();

    let coll = collection(database);
    match coll.update_one(filter.clone(), update.clone(), options.clone()).await {
        Ok(_) => {}
        // A concurrent like for the same pair inserted first; refresh it instead.
        Err(e) if is_duplicate_key(&e) => {
            coll.update_one(filter, update, options).await?;
        }
        Err(e) => return Err(e.into()),
    }

    push.notify_user(to, LIKE_TITLE, &format!("{} sent you a like", caller.name)).await;
    Ok(())
}

/// Withdraw the caller's like for `to`. Idempotent.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_like(database: &Database, caller: &str, to: &str) -> Result<(), ServiceError> {
    collection(database)
        .delete_many(doc! { "from": caller, "to": to, "type": NoticeKind::Like.as_str() }, None)
        .await?;
    Ok(())
}

/// Friend requests addressed to the caller, whatever their status.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_friend_request(database: &Database, caller_uid: &str) -> Result<Vec<NoticeView>, ServiceError> {
    list(database, doc! { "to": caller_uid, "type": NoticeKind::Friend.as_str() }).await
}

/// Send a `friend` or `alphabet` request. At most one pending request per
/// sender, recipient and kind.
///
/// # Errors
///
/// Returns a validation error for `like`, a self-request or an oversized
/// message, a conflict if a pending request already exists, or a database
/// error.
pub async fn request_notice(
    database: &Database,
    push: &PushFanout,
    kind: NoticeKind,
    caller: &Identity,
    request: &NoticeRequest,
) -> Result<(), ServiceError> {
    if kind == NoticeKind::Like {
        return Err(ServiceError::validation("likes are not requests"));
    }
    validate_target(&caller.uid, &request.to)?;
    let message = validate_message(&request.message)?;

    // The pending-status equality seeds the inserted document together with from/to/type.
    let result = collection(database)
        .update_one(
            doc! {
                "from": caller.uid.as_str(),
                "to": request.to.as_str(),
                "type": kind.as_str(),
                "status": NoticeStatus::Pending.as_str(),
            },
            pending_insert(&message, request.sub.as_deref(), DateTime::now()),
            UpdateOptions::builder().upsert(true).build(),
        )
        .await;
    // A matched document, or a concurrent insert caught by the unique
    // pending index, both mean a pending request already exists.
    let inserted = match result {
        Ok(result) => result.upserted_id.is_some(),
        Err(e) if is_duplicate_key(&e) => false,
        Err(e) => return Err(e.into()),
    };
    if !inserted {
        return Err(pending_conflict(kind));
    }

    if kind == NoticeKind::Friend {
        push.notify_user(&request.to, FRIEND_REQUEST_TITLE, &format!("{} sent you a friend request", caller.name)).await;
    }
    Ok(())
}

/// Answer the latest `kind` request from `from` to the caller. Accepting a
/// friend request makes both users friends.
///
/// # Errors
///
/// Returns not-found ("no data") when there is no such request, or a
/// database error.
pub async fn update_request(
    database: &Database,
    kind: NoticeKind,
    caller: &str,
    from: &str,
    status: NoticeStatus,
) -> Result<NoticeView, ServiceError> {
    let options = FindOneAndUpdateOptions::builder()
        .sort(doc! { "createdAt": -1 })
        .return_document(ReturnDocument::After)
        .build();
    let updated = collection(database)
        .find_one_and_update(
            doc! { "from": from, "to": caller, "type": kind.as_str() },
            doc! { "$set": { "status": status.as_str() } },
            options,
        )
        .await
        .map_err(|e| if is_duplicate_key(&e) { pending_conflict(kind) } else { e.into() })?
        .ok_or_else(|| ServiceError::not_found("no data"))?;

    if kind == NoticeKind::Friend && status == NoticeStatus::Response {
        user::add_friends(database, caller, from).await?;
    }
    Ok(updated.into())
}

#[cfg(test)]
#[path = "notice_test.rs"]
mod tests;
