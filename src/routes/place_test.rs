use axum::body::Body;
use axum::http::{Request, header};
use bson::oid::ObjectId;
use tower::ServiceExt;

use super::*;
use crate::routes::app;
use crate::state::test_helpers::{sign_token, sign_token_with_role, test_app_state};

#[test]
fn status_defaults_to_active() {
    assert_eq!(parse_status(None).unwrap(), PlaceStatus::Active);
    assert_eq!(parse_status(Some("inactive")).unwrap(), PlaceStatus::Inactive);
}

#[test]
fn unknown_status_is_wrong_status() {
    let err = parse_status(Some("archived")).unwrap_err();
    assert!(matches!(err, ServiceError::Validation(msg) if msg == "wrong status"));
}

#[tokio::test]
async fn incomplete_place_is_rejected() {
    let request = Request::post("/place")
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(ObjectId::new(), "kakao-1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"fullname":"Only a name"}"#))
        .unwrap();
    let response = app(test_app_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_status_validates_before_the_store() {
    let manager = sign_token_with_role(ObjectId::new(), "kakao-1", Some("manager"));
    let request = Request::patch("/place/status")
        .header(header::AUTHORIZATION, format!("Bearer {manager}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"placeId":"65a1f0c2b4d3e2a1f0c2b4d3","status":"gone"}"#))
        .unwrap();
    let response = app(test_app_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn update_status_requires_manager() {
    let request = Request::patch("/place/status")
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(ObjectId::new(), "kakao-1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"placeId":"65a1f0c2b4d3e2a1f0c2b4d3","status":"active"}"#))
        .unwrap();
    let response = app(test_app_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
