//! Study place directory.

use bson::oid::ObjectId;
use bson::{DateTime, doc};
use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use super::{ServiceError, parse_object_id, rfc3339};
use crate::db;

const UNKNOWN_TIME: &str = "unknown";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PlaceStatus {
    Active,
    Inactive,
}

impl PlaceStatus {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "active" => Some(Self::Active),
            "inactive" => Some(Self::Inactive),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Place {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub status: PlaceStatus,
    pub fullname: String,
    pub brand: String,
    pub branch: String,
    pub image: String,
    pub cover_image: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub location_detail: String,
    #[serde(rename = "mapURL")]
    pub map_url: String,
    pub time: String,
    pub register_date: DateTime,
    pub registrant: ObjectId,
}

/// Client payload for a new place. Everything except `time` is required.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPlace {
    pub fullname: Option<String>,
    pub brand: Option<String>,
    pub branch: Option<String>,
    pub image: Option<String>,
    pub cover_image: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location: Option<String>,
    pub location_detail: Option<String>,
    #[serde(rename = "mapURL")]
    pub map_url: Option<String>,
    pub time: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceView {
    pub id: String,
    pub status: PlaceStatus,
    pub fullname: String,
    pub brand: String,
    pub branch: String,
    pub image: String,
    pub cover_image: String,
    pub latitude: f64,
    pub longitude: f64,
    pub location: String,
    pub location_detail: String,
    #[serde(rename = "mapURL")]
    pub map_url: String,
    pub time: String,
    pub register_date: String,
    pub registrant: String,
}

impl From<Place> for PlaceView {
    fn from(p: Place) -> Self {
        Self {
            id: p.id.map(|id| id.to_hex()).unwrap_or_default(),
            status: p.status,
            fullname: p.fullname,
            brand: p.brand,
            branch: p.branch,
            image: p.image,
            cover_image: p.cover_image,
            latitude: p.latitude,
            longitude: p.longitude,
            location: p.location,
            location_detail: p.location_detail,
            map_url: p.map_url,
            time: p.time,
            register_date: rfc3339(p.register_date),
            registrant: p.registrant.to_hex(),
        }
    }
}

fn required(field: &'static str, value: Option<String>, missing: &mut Vec<&'static str>) -> String {
    match value.map(|v| v.trim().to_owned()).filter(|v| !v.is_empty()) {
        Some(v) => v,
        None => {
            missing.push(field);
            String::new()
        }
    }
}

impl NewPlace {
    /// Validate and fill server-side fields. New places start `inactive`.
    ///
    /// # Errors
    ///
    /// Returns a validation error listing every missing field, or for
    /// coordinates out of range.
    pub fn into_place(self, registrant: ObjectId, now: DateTime) -> Result<Place, ServiceError> {
        let mut missing = Vec::new();
        let fullname = required("fullname", self.fullname, &mut missing);
        let brand = required("brand", self.brand, &mut missing);
        let branch = required("branch", self.branch, &mut missing);
        let image = required("image", self.image, &mut missing);
        let cover_image = required("coverImage", self.cover_image, &mut missing);
        let location = required("location", self.location, &mut missing);
        let location_detail = required("locationDetail", self.location_detail, &mut missing);
        let map_url = required("mapURL", self.map_url, &mut missing);
        if self.latitude.is_none() {
            missing.push("latitude");
        }
        if self.longitude.is_none() {
            missing.push("longitude");
        }
        if !missing.is_empty() {
            return Err(ServiceError::validation(format!("missing fields: {}", missing.join(", "))));
        }

        let latitude = self.latitude.unwrap_or_default();
        let longitude = self.longitude.unwrap_or_default();
        if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
            return Err(ServiceError::validation("coordinates out of range"));
        }

        Ok(Place {
            id: None,
            status: PlaceStatus::Inactive,
            fullname,
            brand,
            branch,
            image,
            cover_image,
            latitude,
            longitude,
            location,
            location_detail,
            map_url,
            time: self.time.filter(|t| !t.trim().is_empty()).unwrap_or_else(|| UNKNOWN_TIME.to_owned()),
            register_date: now,
            registrant,
        })
    }
}

fn collection(database: &Database) -> mongodb::Collection<Place> {
    database.collection(db::PLACES)
}

/// Places with the given status.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn get_active_place(database: &Database, status: PlaceStatus) -> Result<Vec<PlaceView>, ServiceError> {
    let places: Vec<Place> = collection(database)
        .find(doc! { "status": status.as_str() }, None)
        .await?
        .try_collect()
        .await?;
    Ok(places.into_iter().map(PlaceView::from).collect())
}

/// Register a new (inactive) place on behalf of the caller.
///
/// # Errors
///
/// Returns a validation error for an incomplete payload, or a database error.
pub async fn add_place(database: &Database, caller: ObjectId, input: NewPlace) -> Result<PlaceView, ServiceError> {
    let mut place = input.into_place(caller, DateTime::now())?;
    let inserted = collection(database).insert_one(&place, None).await?;
    place.id = inserted.inserted_id.as_object_id();
    tracing::info!(place = %place.fullname, registrant = %caller, "place registered");
    Ok(place.into())
}

/// # Errors
///
/// Returns a validation error for a malformed id, not-found for an unknown
/// place, or a database error.
pub async fn update_status(database: &Database, place_id: &str, status: PlaceStatus) -> Result<(), ServiceError> {
    let id = parse_object_id("placeId", place_id)?;
    let result = collection(database)
        .update_one(doc! { "_id": id }, doc! { "$set": { "status": status.as_str() } }, None)
        .await?;
    if result.matched_count == 0 {
        return Err(ServiceError::not_found("place"));
    }
    Ok(())
}

#[cfg(test)]
#[path = "place_test.rs"]
mod tests;
