use super::*;
use time::macros::datetime;

#[test]
fn to_bson_datetime_keeps_milliseconds() {
    let at = datetime!(2024-03-01 12:30:45.123 UTC);
    let converted = to_bson_datetime(at);
    assert_eq!(converted.timestamp_millis(), 1_709_296_245_123);
}

#[test]
fn rfc3339_renders_utc() {
    let at = bson::DateTime::from_millis(0);
    assert_eq!(rfc3339(at), "1970-01-01T00:00:00Z");
}

#[test]
fn parse_object_id_accepts_hex() {
    let id = parse_object_id("userId", " 65a1f0c2b4d3e2a1f0c2b4d3 ").unwrap();
    assert_eq!(id.to_hex(), "65a1f0c2b4d3e2a1f0c2b4d3");
}

#[test]
fn parse_object_id_names_the_field() {
    let err = parse_object_id("placeId", "xyz").unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg == "placeId is not a valid id"));
}
