//! Device registration for push notifications.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::push::PushError;
use crate::push::fcm::{self, FcmDevice};
use crate::push::webpush::{self, Subscription};
use crate::routes::auth::AuthUser;
use crate::routes::{error_response, success};
use crate::state::AppState;

fn push_error_to_response(err: PushError) -> Response {
    tracing::error!(error = %err, "push registration failed");
    error_response(StatusCode::INTERNAL_SERVER_ERROR, "internal server error".to_owned())
}

fn validate_subscription(sub: &Subscription) -> Result<(), &'static str> {
    if !sub.endpoint.starts_with("https://") {
        return Err("endpoint must be an https URL");
    }
    if sub.keys.p256dh.is_empty() || sub.keys.auth.is_empty() {
        return Err("subscription keys are required");
    }
    Ok(())
}

/// `POST /webpush/subscribe`: store the browser subscription for the caller.
pub async fn subscribe(State(state): State<AppState>, AuthUser(me): AuthUser, Json(sub): Json<Subscription>) -> Response {
    if let Err(msg) = validate_subscription(&sub) {
        return error_response(StatusCode::BAD_REQUEST, msg.to_owned());
    }
    match webpush::subscribe(&state.database, &me.uid, &sub).await {
        Ok(()) => (StatusCode::CREATED, success()).into_response(),
        Err(e) => push_error_to_response(e),
    }
}

/// `POST /fcm/token`: register a mobile device token for the caller.
pub async fn register_fcm_token(State(state): State<AppState>, AuthUser(me): AuthUser, Json(device): Json<FcmDevice>) -> Response {
    if device.token.trim().is_empty() || device.platform.trim().is_empty() {
        return error_response(StatusCode::BAD_REQUEST, "token and platform are required".to_owned());
    }
    match fcm::register_token(&state.database, &me.uid, &device).await {
        Ok(()) => success().into_response(),
        Err(e) => push_error_to_response(e),
    }
}

#[cfg(test)]
#[path = "push_test.rs"]
mod tests;
