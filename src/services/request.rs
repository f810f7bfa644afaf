//! Member requests: suggestions and reports addressed to the managers.
//!
//! Requests are write-once. Members file them; managers read the list.

use bson::oid::ObjectId;
use bson::{DateTime, Document, doc};
use futures::TryStreamExt;
use mongodb::Database;
use mongodb::options::FindOptions;
use serde::{Deserialize, Serialize};

use super::identity::Identity;
use super::{ServiceError, rfc3339};
use crate::db;

const MAX_TITLE_CHARS: usize = 100;
const MAX_CONTENT_CHARS: usize = 2000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberRequest {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub category: String,
    pub title: String,
    pub content: String,
    pub writer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub created_at: DateTime,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewRequest {
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub location: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RequestView {
    pub id: String,
    pub category: String,
    pub title: String,
    pub content: String,
    pub writer: String,
    pub location: Option<String>,
    pub created_at: String,
}

impl From<MemberRequest> for RequestView {
    fn from(r: MemberRequest) -> Self {
        Self {
            id: r.id.map(|id| id.to_hex()).unwrap_or_default(),
            category: r.category,
            title: r.title,
            content: r.content,
            writer: r.writer,
            location: r.location,
            created_at: rfc3339(r.created_at),
        }
    }
}

fn bounded(field: &str, value: &str, max: usize) -> Result<String, ServiceError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::validation(format!("{field} is required")));
    }
    if value.chars().count() > max {
        return Err(ServiceError::validation(format!("{field} exceeds {max} characters")));
    }
    Ok(value.to_owned())
}

impl NewRequest {
    /// Validate and stamp the writer. The location falls back to the
    /// caller's own.
    ///
    /// # Errors
    ///
    /// Returns a validation error for a blank category, title or content, or
    /// an oversized title or content.
    pub fn into_request(self, caller: &Identity, now: DateTime) -> Result<MemberRequest, ServiceError> {
        let category = self.category.trim().to_lowercase();
        if category.is_empty() {
            return Err(ServiceError::validation("category is required"));
        }
        let location = self
            .location
            .map(|l| l.trim().to_owned())
            .filter(|l| !l.is_empty())
            .or_else(|| caller.location.clone());
        Ok(MemberRequest {
            id: None,
            category,
            title: bounded("title", &self.title, MAX_TITLE_CHARS)?,
            content: bounded("content", &self.content, MAX_CONTENT_CHARS)?,
            writer: caller.uid.clone(),
            location,
            created_at: now,
        })
    }
}

/// Listing filter: every request, or one category.
#[must_use]
pub fn category_filter(category: Option<&str>) -> Document {
    match category.map(str::trim).filter(|c| !c.is_empty()) {
        Some(category) => doc! { "category": category.to_lowercase() },
        None => doc! {},
    }
}

fn collection(database: &Database) -> mongodb::Collection<MemberRequest> {
    database.collection(db::REQUESTS)
}

/// Requests, newest first, optionally narrowed to one category.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_requests(database: &Database, category: Option<&str>) -> Result<Vec<RequestView>, ServiceError> {
    let options = FindOptions::builder().sort(doc! { "createdAt": -1 }).build();
    let requests: Vec<MemberRequest> = collection(database)
        .find(category_filter(category), options)
        .await?
        .try_collect()
        .await?;
    Ok(requests.into_iter().map(RequestView::from).collect())
}

/// File a request as the caller.
///
/// # Errors
///
/// Returns a validation error for bad input, or a database error.
pub async fn create_request(database: &Database, caller: &Identity, input: NewRequest) -> Result<RequestView, ServiceError> {
    let mut request = input.into_request(caller, DateTime::now())?;
    let inserted = collection(database).insert_one(&request, None).await?;
    request.id = inserted.inserted_id.as_object_id();
    tracing::info!(uid = %caller.uid, category = %request.category, "member request filed");
    Ok(request.into())
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
