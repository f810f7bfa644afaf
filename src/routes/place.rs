//! Place directory routes.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Deserialize;

use crate::routes::auth::{AuthUser, ManagerUser};
use crate::routes::success;
use crate::services::ServiceError;
use crate::services::place::{self, NewPlace, PlaceStatus, PlaceView};
use crate::state::AppState;

#[derive(Deserialize)]
pub struct StatusQuery {
    pub status: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusBody {
    pub place_id: String,
    pub status: String,
}

fn parse_status(raw: Option<&str>) -> Result<PlaceStatus, ServiceError> {
    match raw {
        None => Ok(PlaceStatus::Active),
        Some(raw) => PlaceStatus::parse(raw.trim()).ok_or_else(|| ServiceError::validation("wrong status")),
    }
}

/// `GET /place?status=`: places by status (default `active`).
pub async fn get_active_place(
    State(state): State<AppState>,
    _auth: AuthUser,
    Query(query): Query<StatusQuery>,
) -> Result<Json<Vec<PlaceView>>, ServiceError> {
    let status = parse_status(query.status.as_deref())?;
    Ok(Json(place::get_active_place(&state.database, status).await?))
}

/// `POST /place`: propose a place; it starts inactive.
pub async fn add_place(
    State(state): State<AppState>,
    AuthUser(me): AuthUser,
    Json(body): Json<NewPlace>,
) -> Result<(StatusCode, Json<PlaceView>), ServiceError> {
    let created = place::add_place(&state.database, me.id, body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `PATCH /place/status`: managers activate or retire places.
pub async fn update_status(
    State(state): State<AppState>,
    _manager: ManagerUser,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<serde_json::Value>, ServiceError> {
    let status = parse_status(Some(&body.status))?;
    place::update_status(&state.database, &body.place_id, status).await?;
    Ok(success())
}

#[cfg(test)]
#[path = "place_test.rs"]
mod tests;
