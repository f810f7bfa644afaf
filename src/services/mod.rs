//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own validation and persistence so route handlers stay
//! focused on request parsing and identity plumbing. Every operation takes
//! the database handle and the caller explicitly; nothing is cached between
//! requests.

pub mod activity;
pub mod chat;
pub mod crypto;
pub mod error;
pub mod identity;
pub mod image;
pub mod notice;
pub mod place;
pub mod realtime;
pub mod register;
pub mod request;
pub mod user;

pub use error::ServiceError;

/// Convert a timezone-aware instant into a BSON datetime (millisecond precision).
#[must_use]
pub fn to_bson_datetime(at: time::OffsetDateTime) -> bson::DateTime {
    let millis = at.unix_timestamp_nanos() / 1_000_000;
    bson::DateTime::from_millis(i64::try_from(millis).unwrap_or(i64::MAX))
}

/// RFC 3339 rendering for API responses.
#[must_use]
pub fn rfc3339(at: bson::DateTime) -> String {
    at.try_to_rfc3339_string().unwrap_or_default()
}

/// Parse a 24-hex document id supplied by a client.
///
/// # Errors
///
/// Returns a validation error naming `field` if `raw` is not an ObjectId.
pub fn parse_object_id(field: &str, raw: &str) -> Result<bson::oid::ObjectId, ServiceError> {
    bson::oid::ObjectId::parse_str(raw.trim()).map_err(|_| ServiceError::validation(format!("{field} is not a valid id")))
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
