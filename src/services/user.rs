//! User documents and the lookups other services need.

use bson::oid::ObjectId;
use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use super::ServiceError;
use crate::db;

pub const ROLE_HUMAN: &str = "human";
pub const ROLE_MANAGER: &str = "manager";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Major {
    pub department: String,
    pub detail: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Interests {
    #[serde(default)]
    pub first: String,
    #[serde(default)]
    pub second: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub uid: String,
    pub name: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub birth: Option<String>,
    #[serde(default)]
    pub telephone: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
    #[serde(default)]
    pub mbti: Option<String>,
    #[serde(default)]
    pub majors: Vec<Major>,
    #[serde(default)]
    pub interests: Option<Interests>,
    #[serde(default)]
    pub register_date: Option<DateTime>,
    #[serde(default)]
    pub is_active: bool,
    #[serde(default)]
    pub deposit: i64,
    #[serde(default)]
    pub friend: Vec<String>,
}

/// Public profile returned alongside chats.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserSummary {
    pub id: String,
    pub uid: String,
    pub name: String,
    pub profile_image: Option<String>,
    pub location: String,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.map(|id| id.to_hex()).unwrap_or_default(),
            uid: user.uid.clone(),
            name: user.name.clone(),
            profile_image: user.profile_image.clone(),
            location: user.location.clone(),
        }
    }
}

pub(crate) fn collection(database: &Database) -> mongodb::Collection<User> {
    database.collection(db::USERS)
}

/// Find a user by document id.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_by_id(database: &Database, id: ObjectId) -> Result<Option<User>, ServiceError> {
    Ok(collection(database).find_one(doc! { "_id": id }, None).await?)
}

/// Load several users by id in one query.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn find_many(database: &Database, ids: &[ObjectId]) -> Result<Vec<User>, ServiceError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let cursor = collection(database)
        .find(doc! { "_id": { "$in": ids.to_vec() } }, None)
        .await?;
    Ok(cursor.try_collect().await?)
}

/// Uids of managers responsible for `location`.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn manager_uids(database: &Database, location: &str) -> Result<Vec<String>, ServiceError> {
    let cursor = collection(database)
        .find(doc! { "role": ROLE_MANAGER, "location": location }, None)
        .await?;
    let managers: Vec<User> = cursor.try_collect().await?;
    Ok(managers.into_iter().map(|u| u.uid).collect())
}

/// Make `a` and `b` friends of each other. Repeats are no-ops.
///
/// # Errors
///
/// Returns a database error if either update fails.
pub async fn add_friends(database: &Database, a: &str, b: &str) -> Result<(), ServiceError> {
    let users = collection(database);
    users
        .update_one(doc! { "uid": a }, doc! { "$addToSet": { "friend": b } }, None)
        .await?;
    users
        .update_one(doc! { "uid": b }, doc! { "$addToSet": { "friend": a } }, None)
        .await?;
    Ok(())
}

#[cfg(test)]
#[path = "user_test.rs"]
mod tests;
