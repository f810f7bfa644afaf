//! Chat routes.

use axum::extract::{Query, State};
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::AuthUser;
use crate::routes::success;
use crate::services::ServiceError;
use crate::services::chat::{self, ChatSummary, ChatView, NewMessage};
use crate::state::AppState;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatQuery {
    pub user_id: String,
}

/// `GET /chat?userId=`: conversation with one user.
pub async fn get_chat(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Query(query): Query<ChatQuery>,
) -> Result<Json<ChatView>, ServiceError> {
    Ok(Json(chat::get_chat(&state.database, me.id, &query.user_id).await?))
}

/// `GET /chat/mine`: chat list, newest message first.
pub async fn get_chats(State(state): State<AppState>, AuthUser(me): AuthUser) -> Result<Json<Vec<ChatSummary>>, ServiceError> {
    Ok(Json(chat::get_chats(&state.database, me.id).await?))
}

/// `GET /chat/recent`
pub async fn get_recent_chat(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let id = chat::get_recent_chat(&state.database, me.id).await?;
    Ok(Json(serde_json::json!({ "chatId": id })))
}

/// `POST /chat`: send a message.
pub async fn create_chat(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(body): Json<NewMessage>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    chat::create_chat(&state.database, &state.push, me.id, &body).await?;
    Ok(success())
}

#[cfg(test)]
#[path = "chat_test.rs"]
mod tests;
