//! Notice routes: score log, likes, friend and alphabet requests.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::routes::success;
use crate::services::ServiceError;
use crate::services::activity::ActivityLogView;
use crate::services::notice::{self, NoticeKind, NoticeRequest, NoticeStatus, NoticeView};
use crate::state::AppState;

type Ack = Result<Json<serde_json::Value>, ServiceError>;

#[derive(Deserialize)]
pub struct LikeBody {
    pub to: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
pub struct AnswerBody {
    pub from: String,
    pub status: String,
}

fn parse_answer(body: &AnswerBody) -> Result<NoticeStatus, ServiceError> {
    NoticeStatus::parse(body.status.trim()).ok_or_else(|| ServiceError::validation(format!("unknown status: {}", body.status)))
}

/// `GET /notice/score`
pub async fn get_active_log(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Json<Vec<ActivityLogView>>, ServiceError> {
    Ok(Json(notice::get_active_log(&state.database, &me.uid).await?))
}

/// `GET /notice/like`: likes received.
pub async fn get_like(State(state): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<NoticeView>>, ServiceError> {
    Ok(Json(notice::get_like(&state.database, &me.uid).await?))
}

/// `GET /notice/like/all`: likes sent and received.
pub async fn get_like_all(State(state): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<NoticeView>>, ServiceError> {
    Ok(Json(notice::get_like_all(&state.database, &me.uid).await?))
}

/// `POST /notice/like`
pub async fn set_like(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<LikeBody>) -> Ack {
    notice::set_like(&state.database, &state.push, &me, &body.to, &body.message).await?;
    Ok(success())
}

/// `DELETE /notice/like`
pub async fn delete_like(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<LikeBody>) -> Ack {
    notice::delete_like(&state.database, &me.uid, &body.to).await?;
    Ok(success())
}

/// `GET /notice/friend`: friend requests addressed to the caller.
pub async fn get_friend_request(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Json<Vec<NoticeView>>, ServiceError> {
    Ok(Json(notice::get_friend_request(&state.database, &me.uid).await?))
}

/// `POST /notice/friend`
pub async fn request_friend(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<NoticeRequest>) -> Ack {
    notice::request_notice(&state.database, &state.push, NoticeKind::Friend, &me, &body).await?;
    Ok(success())
}

/// `PATCH /notice/friend`: accept or refuse.
pub async fn update_friend(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<AnswerBody>) -> Ack {
    let status = parse_answer(&body)?;
    notice::update_request(&state.database, NoticeKind::Friend, &me.uid, &body.from, status).await?;
    Ok(success())
}

/// `POST /notice/alphabet`
pub async fn request_alphabet(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<NoticeRequest>) -> Ack {
    notice::request_notice(&state.database, &state.push, NoticeKind::Alphabet, &me, &body).await?;
    Ok(success())
}

/// `PATCH /notice/alphabet`
pub async fn update_alphabet(State(state): State<AppState>, AuthUser(me): AuthUser, Json(body): Json<AnswerBody>) -> Ack {
    let status = parse_answer(&body)?;
    notice::update_request(&state.database, NoticeKind::Alphabet, &me.uid, &body.from, status).await?;
    Ok(success())
}

#[cfg(test)]
#[path = "notice_test.rs"]
mod tests;
