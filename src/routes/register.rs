//! Registration routes.

use axum::extract::State;
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::{AuthUser, ManagerUser};
use crate::routes::success;
use crate::services::ServiceError;
use crate::services::register::{self, RegisterForm, Registered};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct UidBody {
    pub uid: String,
}

fn required_uid(body: &UidBody) -> Result<&str, ServiceError> {
    let uid = body.uid.trim();
    if uid.is_empty() {
        return Err(ServiceError::validation("uid is required"));
    }
    Ok(uid)
}

/// `GET /register`: pending applications with decrypted telephones. Managers only.
pub async fn get_register(State(state): State<AppState>, _manager: ManagerUser) -> Result<Json<Vec<Registered>>, ServiceError> {
    Ok(Json(register::get_register(&state.database, &state.cipher).await?))
}

/// `POST /register`: submit the caller's application.
pub async fn register(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(form): Json<RegisterForm>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    register::register(&state.database, &state.cipher, &state.push, &me, form).await?;
    Ok(success())
}

/// `POST /register/approve`
pub async fn approve(
    State(state): State<AppState>,
    _manager: ManagerUser,
    Json(body): Json<UidBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    register::approve(&state.database, required_uid(&body)?).await?;
    Ok(success())
}

/// `DELETE /register`: reject an application.
pub async fn delete_register_user(
    State(state): State<AppState>,
    _manager: ManagerUser,
    Json(body): Json<UidBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    register::delete_register_user(&state.database, required_uid(&body)?).await?;
    Ok(success())
}

#[cfg(test)]
#[path = "register_test.rs"]
mod tests;
