use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bson::oid::ObjectId;
use tower::ServiceExt;

use super::*;
use crate::routes::app;
use crate::state::test_helpers::{sign_token, sign_token_with_role, test_app_state, test_config};

fn post_register(state: AppState, body: &str) -> impl std::future::Future<Output = axum::response::Response> {
    let request = Request::post("/register")
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(ObjectId::new(), "kakao-1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap();
    async move { app(state).oneshot(request).await.unwrap() }
}

#[test]
fn required_uid_trims() {
    assert_eq!(required_uid(&UidBody { uid: " kakao-1 ".into() }).unwrap(), "kakao-1");
    assert!(required_uid(&UidBody { uid: "  ".into() }).is_err());
}

#[tokio::test]
async fn malformed_telephone_is_bad_request() {
    let response = post_register(test_app_state(), r#"{"name":"A","location":"suwon","telephone":"01012345678"}"#).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn missing_key_refuses_registration() {
    let state = AppState::new(
        crate::state::test_helpers::test_database(),
        crate::config::AppConfig { crypto_key: None, ..test_config() },
        crate::push::PushFanout::default(),
        std::sync::Arc::new(crate::state::test_helpers::StubImageStore),
    );
    let response = post_register(state, r#"{"name":"A","location":"suwon","telephone":"010-1234-5678"}"#).await;
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "encryption key not configured");
}

fn as_caller(method: &str, role: Option<&str>, body: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(if method == "POST" { "/register/approve" } else { "/register" })
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token_with_role(ObjectId::new(), "kakao-9", role)))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_owned()))
        .unwrap()
}

#[tokio::test]
async fn review_endpoints_require_manager() {
    for method in ["GET", "POST", "DELETE"] {
        let response = app(test_app_state()).oneshot(as_caller(method, None, r#"{"uid":"kakao-1"}"#)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method}");

        let response = app(test_app_state())
            .oneshot(as_caller(method, Some("human"), r#"{"uid":"kakao-1"}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "{method}");
    }
}

#[tokio::test]
async fn manager_passes_the_role_check() {
    let response = app(test_app_state()).oneshot(as_caller("POST", Some("manager"), r#"{"uid":"  "}"#)).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
