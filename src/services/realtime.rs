//! Realtime attendance service, today's study votes and check-ins.
//!
//! DESIGN
//! ======
//! One `realtimes` document per calendar day (keyed by local midnight, unique
//! index on `date`) embeds a `userList` array with one entry per user. The
//! document is created lazily by whichever request touches the day first.
//!
//! Entries are never rewritten through load-modify-save. Every mutation is a
//! single `findOneAndUpdate` that targets the caller's element with the array
//! filter `elem.user = caller`, so concurrent requests from different users
//! cannot clobber each other's entries.
//!
//! UPSERT PROTOCOL
//! ===============
//! Writing a whole entry first tries to replace the caller's existing element.
//! If none matched, it pushes a new element guarded by `userList.user != caller`,
//! upserting the day document. If another request slipped the caller's entry
//! in between, the guarded push finds no document, the upsert collides on the
//! unique `date` index, and the loop goes back to the replace step. The result
//! is at most one entry per user per day.

use bson::oid::ObjectId;
use bson::{DateTime, Document, doc};
use mongodb::Database;
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};
use serde::{Deserialize, Serialize};
use time::{OffsetDateTime, UtcOffset};

use super::error::is_duplicate_key;
use super::image::ImageStore;
use super::{ServiceError, rfc3339, to_bson_datetime};
use crate::db;

const MAX_UPSERT_ATTEMPTS: usize = 3;
pub const ATTENDANCE_IMAGE_CATEGORY: &str = "studyAttend";
const MAX_MEMO_CHARS: usize = 500;

// =============================================================================
// DOCUMENTS
// =============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EntryStatus {
    Pending,
    Solo,
    Open,
    Free,
    Cancel,
}

impl EntryStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "pending" => Some(Self::Pending),
            "solo" => Some(Self::Solo),
            "open" => Some(Self::Open),
            "free" => Some(Self::Free),
            "cancel" => Some(Self::Cancel),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Solo => "solo",
            Self::Open => "open",
            Self::Free => "free",
            Self::Cancel => "cancel",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StudyPlace {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl StudyPlace {
    fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::validation("place name is required"));
        }
        if !(-90.0..=90.0).contains(&self.latitude) || !(-180.0..=180.0).contains(&self.longitude) {
            return Err(ServiceError::validation("place coordinates out of range"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeWindow {
    pub start: DateTime,
    pub end: DateTime,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Comment {
    pub text: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeEntry {
    pub user: ObjectId,
    pub place: StudyPlace,
    pub time: TimeWindow,
    pub status: EntryStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arrived: Option<DateTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<Comment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeDay {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub date: DateTime,
    #[serde(default)]
    pub user_list: Vec<RealtimeEntry>,
}

// =============================================================================
// INPUTS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct TimeInput {
    #[serde(with = "time::serde::rfc3339")]
    pub start: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub end: OffsetDateTime,
}

impl TimeInput {
    fn window(&self) -> Result<TimeWindow, ServiceError> {
        if self.start >= self.end {
            return Err(ServiceError::validation("time.start must be before time.end"));
        }
        Ok(TimeWindow { start: to_bson_datetime(self.start), end: to_bson_datetime(self.end) })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct VoteInput {
    pub place: StudyPlace,
    pub time: TimeInput,
    #[serde(default)]
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttendanceInput {
    pub place: StudyPlace,
    pub time: TimeInput,
    pub status: EntryStatus,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Partial update of the caller's entry. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EntryPatch {
    pub place: Option<StudyPlace>,
    pub time: Option<TimeInput>,
    pub status: Option<EntryStatus>,
    pub memo: Option<String>,
    pub image: Option<String>,
    pub comment: Option<String>,
}

fn clean_memo(memo: Option<String>) -> Result<Option<String>, ServiceError> {
    let memo = memo.map(|m| m.trim().to_owned()).filter(|m| !m.is_empty());
    if memo.as_ref().is_some_and(|m| m.chars().count() > MAX_MEMO_CHARS) {
        return Err(ServiceError::validation(format!("memo exceeds {MAX_MEMO_CHARS} characters")));
    }
    Ok(memo)
}

/// Build a validated entry for `user`.
///
/// # Errors
///
/// Returns a validation error for an empty place name, out-of-range
/// coordinates, an inverted time window, or an oversized memo.
pub fn build_entry(
    user: ObjectId,
    place: StudyPlace,
    time: &TimeInput,
    status: EntryStatus,
    memo: Option<String>,
) -> Result<RealtimeEntry, ServiceError> {
    place.validate()?;
    Ok(RealtimeEntry {
        user,
        place,
        time: time.window()?,
        status,
        arrived: None,
        image: None,
        memo: clean_memo(memo)?,
        comment: None,
    })
}

// =============================================================================
// VIEWS
// =============================================================================

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TimeWindowView {
    pub start: String,
    pub end: String,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RealtimeEntryView {
    pub user: String,
    pub place: StudyPlace,
    pub time: TimeWindowView,
    pub status: EntryStatus,
    pub arrived: Option<String>,
    pub image: Option<String>,
    pub memo: Option<String>,
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RealtimeDayView {
    pub id: String,
    pub date: String,
    pub user_list: Vec<RealtimeEntryView>,
}

impl From<RealtimeEntry> for RealtimeEntryView {
    fn from(e: RealtimeEntry) -> Self {
        Self {
            user: e.user.to_hex(),
            place: e.place,
            time: TimeWindowView { start: rfc3339(e.time.start), end: rfc3339(e.time.end) },
            status: e.status,
            arrived: e.arrived.map(rfc3339),
            image: e.image,
            memo: e.memo,
            comment: e.comment.map(|c| c.text),
        }
    }
}

impl From<RealtimeDay> for RealtimeDayView {
    fn from(day: RealtimeDay) -> Self {
        Self {
            id: day.id.map(|id| id.to_hex()).unwrap_or_default(),
            date: rfc3339(day.date),
            user_list: day.user_list.into_iter().map(RealtimeEntryView::from).collect(),
        }
    }
}

// =============================================================================
// DAY KEY
// =============================================================================

/// Start of the calendar day containing `now`, in the service timezone.
#[must_use]
pub fn day_start(now: OffsetDateTime, utc_offset_hours: i8) -> DateTime {
    let offset = UtcOffset::from_hms(utc_offset_hours, 0, 0).unwrap_or(UtcOffset::UTC);
    let local_midnight = now.to_offset(offset).replace_time(time::Time::MIDNIGHT);
    to_bson_datetime(local_midnight)
}

#[must_use]
pub fn today(utc_offset_hours: i8) -> DateTime {
    day_start(OffsetDateTime::now_utc(), utc_offset_hours)
}

// =============================================================================
// UPDATE DOCUMENTS
// =============================================================================

const ELEM: &str = "userList.$[elem]";

fn elem_filter(user: ObjectId) -> Vec<Document> {
    vec![doc! { "elem.user": user }]
}

/// Replace the caller's whole element.
///
/// # Errors
///
/// Returns an encode error if the entry cannot be converted to BSON.
pub fn replace_entry_update(entry: &RealtimeEntry) -> Result<Document, ServiceError> {
    Ok(doc! { "$set": { ELEM: bson::to_bson(entry)? } })
}

/// Append a new element for the caller.
///
/// # Errors
///
/// Returns an encode error if the entry cannot be converted to BSON.
pub fn push_entry_update(entry: &RealtimeEntry) -> Result<Document, ServiceError> {
    Ok(doc! { "$push": { "userList": bson::to_bson(entry)? } })
}

/// `$set` body touching only the patched fields of the caller's element.
///
/// # Errors
///
/// Returns a validation error if the patch is empty or any field is invalid.
pub fn patch_fields(patch: &EntryPatch) -> Result<Document, ServiceError> {
    let mut set = Document::new();
    if let Some(place) = &patch.place {
        place.validate()?;
        set.insert(format!("{ELEM}.place"), bson::to_bson(place)?);
    }
    if let Some(time) = &patch.time {
        set.insert(format!("{ELEM}.time"), bson::to_bson(&time.window()?)?);
    }
    if let Some(status) = patch.status {
        set.insert(format!("{ELEM}.status"), status.as_str());
    }
    if let Some(memo) = clean_memo(patch.memo.clone())? {
        set.insert(format!("{ELEM}.memo"), memo);
    }
    if let Some(image) = patch.image.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        set.insert(format!("{ELEM}.image"), image);
    }
    if let Some(comment) = &patch.comment {
        set.insert(format!("{ELEM}.comment.text"), comment.trim());
    }
    if set.is_empty() {
        return Err(ServiceError::validation("nothing to update"));
    }
    Ok(set)
}

// =============================================================================
// STORE OPERATIONS
// =============================================================================

fn collection(database: &Database) -> mongodb::Collection<RealtimeDay> {
    database.collection(db::REALTIMES)
}

fn after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder().return_document(ReturnDocument::After).build()
}

fn upsert_after() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .upsert(true)
        .return_document(ReturnDocument::After)
        .build()
}

fn on_caller(user: ObjectId) -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .array_filters(elem_filter(user))
        .return_document(ReturnDocument::After)
        .build()
}

/// Today's document, created on first access.
///
/// # Errors
///
/// Returns a database error if the upsert fails.
pub async fn get_today_data(database: &Database, day: DateTime) -> Result<RealtimeDay, ServiceError> {
    let coll = collection(database);
    // The `date` equality in the filter seeds the inserted document.
    let created = coll
        .find_one_and_update(doc! { "date": day }, doc! { "$setOnInsert": { "userList": [] } }, upsert_after())
        .await;

    match created {
        Ok(Some(found)) => Ok(found),
        Ok(None) => Err(ServiceError::not_found("realtime day")),
        // Two first-accessors raced on the insert; the other one won.
        Err(e) if is_duplicate_key(&e) => coll
            .find_one(doc! { "date": day }, None)
            .await?
            .ok_or_else(|| ServiceError::not_found("realtime day")),
        Err(e) => Err(e.into()),
    }
}

/// The most recent study day is today's document.
///
/// # Errors
///
/// Returns a database error if the upsert fails.
pub async fn get_recent_study(database: &Database, day: DateTime) -> Result<RealtimeDay, ServiceError> {
    get_today_data(database, day).await
}

/// Outcome of one replace-then-push round of the entry upsert.
#[derive(Debug)]
pub(crate) enum Round<T> {
    Written(T),
    /// Another request inserted the caller's entry or the day in between.
    Raced,
}

/// Run rounds until one writes, giving up with a conflict after
/// `MAX_UPSERT_ATTEMPTS` races. Store errors end the loop immediately.
pub(crate) async fn retry_rounds<T, F, Fut>(mut round: F) -> Result<T, ServiceError>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<Round<T>, ServiceError>>,
{
    for attempt in 1..=MAX_UPSERT_ATTEMPTS {
        match round(attempt).await? {
            Round::Written(value) => return Ok(value),
            Round::Raced => tracing::debug!(attempt, "realtime entry upsert raced, retrying"),
        }
    }
    Err(ServiceError::Conflict("realtime entry is being modified concurrently".into()))
}

async fn upsert_round(
    coll: &mongodb::Collection<RealtimeDay>,
    day: DateTime,
    user: ObjectId,
    replace: &Document,
    push: &Document,
) -> Result<Round<RealtimeDay>, ServiceError> {
    let replaced = coll
        .find_one_and_update(doc! { "date": day, "userList.user": user }, replace.clone(), on_caller(user))
        .await?;
    if let Some(updated) = replaced {
        return Ok(Round::Written(updated));
    }

    let pushed = coll
        .find_one_and_update(doc! { "date": day, "userList.user": { "$ne": user } }, push.clone(), upsert_after())
        .await;
    match pushed {
        Ok(Some(updated)) => Ok(Round::Written(updated)),
        Ok(None) => Ok(Round::Raced),
        Err(e) if is_duplicate_key(&e) => Ok(Round::Raced),
        Err(e) => Err(e.into()),
    }
}

/// Write `entry` as the caller's only element of the day.
///
/// # Errors
///
/// Returns [`ServiceError::Conflict`] if the write keeps racing, or a database
/// error.
pub async fn upsert_entry(database: &Database, day: DateTime, entry: &RealtimeEntry) -> Result<RealtimeDay, ServiceError> {
    let coll = collection(database);
    let replace = replace_entry_update(entry)?;
    let push = push_entry_update(entry)?;
    retry_rounds(|_| upsert_round(&coll, day, entry.user, &replace, &push)).await
}

async fn set_on_entry(database: &Database, day: DateTime, user: ObjectId, set: Document) -> Result<RealtimeDay, ServiceError> {
    collection(database)
        .find_one_and_update(doc! { "date": day, "userList.user": user }, doc! { "$set": set }, on_caller(user))
        .await?
        .ok_or_else(|| ServiceError::not_found("no realtime entry for the caller today"))
}

/// Cast a plain vote: the caller's entry becomes `pending` at the given place and time.
///
/// # Errors
///
/// Returns a validation error for bad input, or a store error.
pub async fn create_basic_vote(
    database: &Database,
    day: DateTime,
    user: ObjectId,
    input: VoteInput,
) -> Result<RealtimeDay, ServiceError> {
    let entry = build_entry(user, input.place, &input.time, EntryStatus::Pending, input.memo)?;
    upsert_entry(database, day, &entry).await
}

/// Check in: upload the proof image (first file wins), stamp arrival, upsert the entry.
///
/// # Errors
///
/// Returns a validation error for bad input, an image error if the upload
/// fails, or a store error.
pub async fn mark_attendance(
    database: &Database,
    images: &dyn ImageStore,
    day: DateTime,
    user: ObjectId,
    input: AttendanceInput,
    files: Vec<axum::body::Bytes>,
) -> Result<RealtimeDay, ServiceError> {
    let mut entry = build_entry(user, input.place, &input.time, input.status, input.memo)?;

    if !files.is_empty() {
        let urls = images.upload(ATTENDANCE_IMAGE_CATEGORY, files).await?;
        entry.image = urls.into_iter().next();
    }
    entry.arrived = Some(DateTime::now());

    upsert_entry(database, day, &entry).await
}

/// Update only the provided fields of the caller's entry.
///
/// # Errors
///
/// Returns a validation error for an empty or invalid patch, not-found if the
/// caller has no entry today, or a store error.
pub async fn update_study(
    database: &Database,
    day: DateTime,
    user: ObjectId,
    patch: &EntryPatch,
) -> Result<RealtimeDay, ServiceError> {
    let set = patch_fields(patch)?;
    set_on_entry(database, day, user, set).await
}

/// Move the caller's time window.
///
/// # Errors
///
/// Returns a validation error if `start >= end`, not-found without an entry.
pub async fn patch_vote(database: &Database, day: DateTime, user: ObjectId, time: &TimeInput) -> Result<RealtimeDay, ServiceError> {
    let window = bson::to_bson(&time.window()?)?;
    set_on_entry(database, day, user, doc! { format!("{ELEM}.time"): window }).await
}

/// Remove the caller's entry. Idempotent.
///
/// # Errors
///
/// Returns a database error if the update fails.
pub async fn delete_vote(database: &Database, day: DateTime, user: ObjectId) -> Result<RealtimeDay, ServiceError> {
    let pulled = collection(database)
        .find_one_and_update(doc! { "date": day }, doc! { "$pull": { "userList": { "user": user } } }, after())
        .await?;
    match pulled {
        Some(updated) => Ok(updated),
        None => get_today_data(database, day).await,
    }
}

/// # Errors
///
/// Returns not-found if the caller has no entry today.
pub async fn patch_status(database: &Database, day: DateTime, user: ObjectId, status: EntryStatus) -> Result<RealtimeDay, ServiceError> {
    set_on_entry(database, day, user, doc! { format!("{ELEM}.status"): status.as_str() }).await
}

/// Set the comment text, creating the comment sub-document if needed.
///
/// # Errors
///
/// Returns not-found if the caller has no entry today.
pub async fn patch_comment(database: &Database, day: DateTime, user: ObjectId, text: &str) -> Result<RealtimeDay, ServiceError> {
    set_on_entry(database, day, user, doc! { format!("{ELEM}.comment.text"): text.trim() }).await
}

#[cfg(test)]
#[path = "realtime_test.rs"]
mod tests;
