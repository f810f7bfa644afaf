//! Realtime attendance routes. Every handler acts on the caller's entry of today.

use axum::body::Bytes;
use axum::extract::{Multipart, State};
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::services::ServiceError;
use crate::services::realtime::{self, AttendanceInput, EntryPatch, EntryStatus, RealtimeDayView, TimeInput, VoteInput};
use crate::state::AppState;

type DayResult = Result<Json<RealtimeDayView>, ServiceError>;

#[derive(Deserialize)]
pub struct StatusBody {
    pub status: String,
}

#[derive(Deserialize)]
pub struct CommentBody {
    pub comment: String,
}

/// Text fields of the attendance form. `place` and `time` arrive as JSON strings.
#[derive(Debug, Default)]
pub(crate) struct AttendanceFields {
    pub place: Option<String>,
    pub time: Option<String>,
    pub status: Option<String>,
    pub memo: Option<String>,
}

impl AttendanceFields {
    pub(crate) fn into_input(self) -> Result<AttendanceInput, ServiceError> {
        let place = self.place.ok_or_else(|| ServiceError::validation("place is required"))?;
        let time = self.time.ok_or_else(|| ServiceError::validation("time is required"))?;
        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            Some(raw) => EntryStatus::parse(raw).ok_or_else(|| ServiceError::validation(format!("unknown status: {raw}")))?,
            None => EntryStatus::Solo,
        };
        Ok(AttendanceInput {
            place: serde_json::from_str(&place).map_err(|e| ServiceError::validation(format!("place: {e}")))?,
            time: serde_json::from_str(&time).map_err(|e| ServiceError::validation(format!("time: {e}")))?,
            status,
            memo: self.memo,
        })
    }
}

/// Keep a file part unless it is empty. Browsers submit an untouched file
/// input as a part with a blank filename and no bytes.
pub(crate) fn push_upload(files: &mut Vec<Bytes>, data: Bytes) {
    if !data.is_empty() {
        files.push(data);
    }
}

fn parse_status(raw: &str) -> Result<EntryStatus, ServiceError> {
    EntryStatus::parse(raw.trim()).ok_or_else(|| ServiceError::validation(format!("unknown status: {raw}")))
}

/// `GET /realtime`: today's votes.
pub async fn get_recent_study(State(state): State<AppState>, _auth: AuthUser) -> DayResult {
    let day = realtime::get_recent_study(&state.database, state.today()).await?;
    Ok(Json(day.into()))
}

/// `POST /realtime/basicVote`: vote for a place and time window.
pub async fn create_basic_vote(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<VoteInput>) -> DayResult {
    let day = realtime::create_basic_vote(&state.database, state.today(), me.id, body).await?;
    Ok(Json(day.into()))
}

/// `POST /realtime/attendance`: multipart check-in with optional proof images.
pub async fn mark_attendance(State(state): State<AppState>, AuthUser(me): AuthUser, mut multipart: Multipart) -> DayResult {
    let mut fields = AttendanceFields::default();
    let mut files: Vec<Bytes> = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ServiceError::validation(format!("multipart: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_owned();
        let is_file = field.file_name().is_some();
        let data = field
            .bytes()
            .await
            .map_err(|e| ServiceError::validation(format!("multipart field {name}: {e}")))?;
        if is_file {
            push_upload(&mut files, data);
            continue;
        }
        let text = String::from_utf8(data.to_vec()).map_err(|_| ServiceError::validation(format!("{name} is not utf-8")))?;
        match name.as_str() {
            "place" => fields.place = Some(text),
            "time" => fields.time = Some(text),
            "status" => fields.status = Some(text),
            "memo" => fields.memo = Some(text),
            _ => {}
        }
    }

    let input = fields.into_input()?;
    let day = realtime::mark_attendance(&state.database, state.images.as_ref(), state.today(), me.id, input, files).await?;
    Ok(Json(day.into()))
}

/// `PATCH /realtime/study`: update selected fields of the caller's entry.
pub async fn update_study(State(state): State<AppState>, AuthUser(me): AuthUser, Json(patch): Json<EntryPatch>) -> DayResult {
    let day = realtime::update_study(&state.database, state.today(), me.id, &patch).await?;
    Ok(Json(day.into()))
}

/// `PATCH /realtime/time`: move the caller's time window.
pub async fn patch_vote(State(state): State<AppState>, AuthUser(me): AuthUser, Json(time): Json<TimeInput>) -> DayResult {
    let day = realtime::patch_vote(&state.database, state.today(), me.id, &time).await?;
    Ok(Json(day.into()))
}

/// `DELETE /realtime/vote`: withdraw the caller's vote.
pub async fn delete_vote(State(state): State<AppState>, AuthUser(me): AuthUser) -> DayResult {
    let day = realtime::delete_vote(&state.database, state.today(), me.id).await?;
    Ok(Json(day.into()))
}

/// `PATCH /realtime/status`
pub async fn patch_status(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<StatusBody>) -> DayResult {
    let status = parse_status(&body.status)?;
    let day = realtime::patch_status(&state.database, state.today(), me.id, status).await?;
    Ok(Json(day.into()))
}

/// `PATCH /realtime/comment`
pub async fn patch_comment(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<CommentBody>) -> DayResult {
    let day = realtime::patch_comment(&state.database, state.today(), me.id, &body.comment).await?;
    Ok(Json(day.into()))
}

#[cfg(test)]
#[path = "realtime_test.rs"]
mod tests;
