//! Member request routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::{AuthUser, ManagerUser};
use crate::services::ServiceError;
use crate::services::request::{self, NewRequest, RequestView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct CategoryQuery {
    pub category: Option<String>,
}

/// `GET /request?category=`: filed requests, newest first. Managers only.
pub async fn get_requests(
    State(state): State<AppState>,
    _manager: ManagerUser,
    Query(query): Query<CategoryQuery>,
) -> Result<Json<Vec<RequestView>>, ServiceError> {
    Ok(Json(request::get_requests(&state.database, query.category.as_deref()).await?))
}

/// `POST /request`
pub async fn create_request(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(body): Json<NewRequest>,
) -> Result<(StatusCode, Json<RequestView>), ServiceError> {
    let created = request::create_request(&state.database, &me, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
