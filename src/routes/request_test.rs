use axum::body::Body;
use axum::http::{Request, header};
use bson::oid::ObjectId;
use tower::ServiceExt;

use super::*;
use crate::routes::app;
use crate::state::test_helpers::{sign_token, test_app_state};

#[tokio::test]
async fn listing_requires_manager() {
    let request = Request::get("/request")
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(ObjectId::new(), "kakao-1")))
        .body(Body::empty())
        .unwrap();
    let response = app(test_app_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn blank_request_is_rejected_before_the_store() {
    let request = Request::post("/request")
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(ObjectId::new(), "kakao-1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(r#"{"category":"report","title":"","content":"loud"}"#))
        .unwrap();
    let response = app(test_app_state()).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
