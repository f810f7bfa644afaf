//! Chat service, one document per unordered user pair.
//!
//! The pair is stored canonically (`user1 < user2`) under a unique index, so
//! the first message between two users creates the document with a single
//! upsert and every later message appends to it.

use bson::oid::ObjectId;
use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::{FindOneOptions, UpdateOptions};
use serde::{Deserialize, Serialize};

use super::error::is_duplicate_key;
use super::user::{self, UserSummary};
use super::{ServiceError, parse_object_id, rfc3339};
use crate::db;
use crate::push::PushFanout;

pub const MAX_MESSAGE_CHARS: usize = 1000;
pub const NEW_MESSAGE_TITLE: &str = "New message";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ChatContent {
    pub user_id: ObjectId,
    pub content: String,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user1: ObjectId,
    pub user2: ObjectId,
    #[serde(default)]
    pub contents: Vec<ChatContent>,
    pub created_at: DateTime,
    pub updated_at: DateTime,
}

impl Chat {
    fn opponent_of(&self, caller: ObjectId) -> ObjectId {
        if self.user1 == caller { self.user2 } else { self.user1 }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ChatContentView {
    pub user_id: String,
    pub content: String,
    pub created_at: String,
}

impl From<&ChatContent> for ChatContentView {
    fn from(c: &ChatContent) -> Self {
        Self { user_id: c.user_id.to_hex(), content: c.content.clone(), created_at: rfc3339(c.created_at) }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatView {
    pub opponent: UserSummary,
    pub contents: Vec<ChatContentView>,
}

/// One row of the caller's chat list.
#[derive(Debug, Clone, Serialize)]
pub struct ChatSummary {
    pub user: Option<UserSummary>,
    pub content: Option<ChatContentView>,
    #[serde(skip)]
    last_at: Option<DateTime>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewMessage {
    pub to_user_id: String,
    pub message: String,
}

/// Order a pair so the smaller id comes first.
#[must_use]
pub fn canonical_pair(a: ObjectId, b: ObjectId) -> (ObjectId, ObjectId) {
    if a <= b { (a, b) } else { (b, a) }
}

/// Newest last message first; chats without messages go last.
pub fn sort_summaries(summaries: &mut [ChatSummary]) {
    summaries.sort_by(|a, b| b.last_at.cmp(&a.last_at));
}

fn validate_message(message: &str) -> Result<&str, ServiceError> {
    let message = message.trim();
    if message.is_empty() {
        return Err(ServiceError::validation("message is required"));
    }
    if message.chars().count() > MAX_MESSAGE_CHARS {
        return Err(ServiceError::validation(format!("message exceeds {MAX_MESSAGE_CHARS} characters")));
    }
    Ok(message)
}

fn collection(database: &Database) -> mongodb::Collection<Chat> {
    database.collection(db::CHATS)
}

fn involving(caller: ObjectId) -> bson::Document {
    doc! { "$or": [{ "user1": caller }, { "user2": caller }] }
}

/// The conversation between the caller and `user_id`.
///
/// # Errors
///
/// Returns a validation error for a malformed id, not-found if the pair has
/// never chatted or the opponent no longer exists.
pub async fn get_chat(database: &Database, caller: ObjectId, user_id: &str) -> Result<ChatView, ServiceError> {
    let other = parse_object_id("userId", user_id)?;
    let (user1, user2) = canonical_pair(caller, other);

    let chat = collection(database)
        .find_one(doc! { "user1": user1, "user2": user2 }, None)
        .await?
        .ok_or_else(|| ServiceError::not_found("chat"))?;

    let opponent = user::find_by_id(database, chat.opponent_of(caller))
        .await?
        .ok_or_else(|| ServiceError::not_found("chat opponent"))?;

    Ok(ChatView {
        opponent: UserSummary::from(&opponent),
        contents: chat.contents.iter().map(ChatContentView::from).collect(),
    })
}

/// Every chat of the caller with the opponent profile and the last message.
///
/// # Errors
///
/// Returns a database error if a query fails.
pub async fn get_chats(database: &Database, caller: ObjectId) -> Result<Vec<ChatSummary>, ServiceError> {
    let chats: Vec<Chat> = collection(database).find(involving(caller), None).await?.try_collect().await?;

    let opponent_ids: Vec<ObjectId> = chats.iter().map(|c| c.opponent_of(caller)).collect();
    let opponents = user::find_many(database, &opponent_ids).await?;

    let mut summaries: Vec<ChatSummary> = chats
        .iter()
        .map(|chat| {
            let opponent = chat.opponent_of(caller);
            let last = chat.contents.last();
            ChatSummary {
                user: opponents.iter().find(|u| u.id == Some(opponent)).map(UserSummary::from),
                content: last.map(ChatContentView::from),
                last_at: last.map(|c| c.created_at),
            }
        })
        .collect();
    sort_summaries(&mut summaries);
    Ok(summaries)
}

/// Id of the caller's most recently updated chat, or an empty string.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_recent_chat(database: &Database, caller: ObjectId) -> Result<String, ServiceError> {
    let options = FindOneOptions::builder().sort(doc! { "updatedAt": -1 }).build();
    let recent = collection(database).find_one(involving(caller), options).await?;
    Ok(recent.and_then(|c| c.id).map(|id| id.to_hex()).unwrap_or_default())
}

/// Append a message to the pair's chat, creating it on the first message,
/// then notify the recipient.
///
/// # Errors
///
/// Returns a validation error for a blank or oversized message, a malformed
/// id or a self-message, not-found if the recipient does not exist, or a
/// database error.
pub async fn create_chat(
    database: &Database,
    push: &PushFanout,
    caller: ObjectId,
    input: &NewMessage,
) -> Result<(), ServiceError> {
    let message = validate_message(&input.message)?;
    let to = parse_object_id("toUserId", &input.to_user_id)?;
    if to == caller {
        return Err(ServiceError::validation("cannot send a message to yourself"));
    }
    let recipient = user::find_by_id(database, to)
        .await?
        .ok_or_else(|| ServiceError::not_found("recipient"))?;

    let now = DateTime::now();
    let content = ChatContent { user_id: caller, content: message.to_owned(), created_at: now };
    let (user1, user2) = canonical_pair(caller, to);
    let filter = doc! { "user1": user1, "user2": user2 };
    let update = doc! {
        "$push": { "contents": bson::to_bson(&content)? },
        "$set": { "updatedAt": now },
        "$setOnInsert": { "createdAt": now },
    };
    let options = UpdateOptions::builder().upsert(true).build();

    let coll = collection(database);
    match coll.update_one(filter.clone(), update.clone(), options.clone()).await {
        Ok(_) => {}
        // Both sides opened the chat at once; the document exists now.
        Err(e) if is_duplicate_key(&e) => {
            coll.update_one(filter, update, options).await?;
        }
        Err(e) => return Err(e.into()),
    }

    push.notify_user(&recipient.uid, NEW_MESSAGE_TITLE, message).await;
    Ok(())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
