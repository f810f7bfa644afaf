//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds every HTTP endpoint under a single Axum router. Handlers
//! authenticate through [`auth::AuthUser`], call one service operation, and
//! render [`ServiceError`] through the shared status mapping below. Uploaded
//! images are served as static files under `/uploads`.

pub mod auth;
pub mod chat;
pub mod notice;
pub mod place;
pub mod push;
pub mod realtime;
pub mod register;
pub mod request;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, patch, post};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::services::ServiceError;
use crate::services::crypto::CryptoError;
use crate::services::image::ImageError;
use crate::state::AppState;

/// Full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);
    let uploads = ServeDir::new(&state.config.upload_dir);

    Router::new()
        .route("/realtime", get(realtime::get_recent_study))
        .route("/realtime/basicVote", post(realtime::create_basic_vote))
        .route("/realtime/attendance", post(realtime::mark_attendance))
        .route("/realtime/study", patch(realtime::update_study))
        .route("/realtime/time", patch(realtime::patch_vote))
        .route("/realtime/vote", axum::routing::delete(realtime::delete_vote))
        .route("/realtime/status", patch(realtime::patch_status))
        .route("/realtime/comment", patch(realtime::patch_comment))
        .route("/chat", get(chat::get_chat).post(chat::create_chat))
        .route("/chat/mine", get(chat::get_chats))
        .route("/chat/recent", get(chat::get_recent_chat))
        .route("/place", get(place::get_active_place).post(place::add_place))
        .route("/place/status", patch(place::update_status))
        .route(
            "/register",
            get(register::get_register)
                .post(register::register)
                .delete(register::delete_register_user),
        )
        .route("/register/approve", post(register::approve))
        .route("/request", get(request::get_requests).post(request::create_request))
        .route("/notice/score", get(notice::get_active_log))
        .route(
            "/notice/like",
            get(notice::get_like).post(notice::set_like).delete(notice::delete_like),
        )
        .route("/notice/like/all", get(notice::get_like_all))
        .route(
            "/notice/friend",
            get(notice::get_friend_request)
                .post(notice::request_friend)
                .patch(notice::update_friend),
        )
        .route("/notice/alphabet", post(notice::request_alphabet).patch(notice::update_alphabet))
        .route("/webpush/subscribe", post(push::subscribe))
        .route("/fcm/token", post(push::register_fcm_token))
        .route("/healthz", get(healthz))
        .nest_service("/uploads", uploads)
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub(crate) fn service_error_to_status(err: &ServiceError) -> StatusCode {
    match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::Crypto(CryptoError::KeyMissing) => StatusCode::SERVICE_UNAVAILABLE,
        ServiceError::Image(ImageError::UnsupportedFormat | ImageError::InvalidCategory(_)) => StatusCode::BAD_REQUEST,
        ServiceError::Crypto(_) | ServiceError::Image(_) | ServiceError::Database(_) | ServiceError::Encode(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// JSON error body. Server-side failures are logged and rendered generically.
pub(crate) fn error_response(status: StatusCode, message: String) -> Response {
    (status, Json(serde_json::json!({ "error": message }))).into_response()
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = service_error_to_status(&self);
        if status.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }
        let message = match (&self, status) {
            (_, StatusCode::INTERNAL_SERVER_ERROR) => "internal server error".to_owned(),
            (ServiceError::Validation(msg) | ServiceError::NotFound(msg) | ServiceError::Conflict(msg), _) => msg.clone(),
            _ => self.to_string(),
        };
        error_response(status, message)
    }
}

/// Plain `{ "status": "success" }` acknowledgement.
pub(crate) fn success() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "success" }))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
