use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use bson::oid::ObjectId;
use tower::ServiceExt;

use crate::routes::app;
use crate::state::test_helpers::{sign_token, test_app_state};

fn authed(method: &str, uri: &str, id: ObjectId, body: Body) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {}", sign_token(id, "kakao-1")))
        .header(header::CONTENT_TYPE, "application/json")
        .body(body)
        .unwrap()
}

#[tokio::test]
async fn get_chat_requires_user_id_query() {
    let response = app(test_app_state())
        .oneshot(authed("GET", "/chat", ObjectId::new(), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn get_chat_rejects_malformed_user_id() {
    let response = app(test_app_state())
        .oneshot(authed("GET", "/chat?userId=zzz", ObjectId::new(), Body::empty()))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn messaging_yourself_is_rejected() {
    let me = ObjectId::new();
    let body = format!(r#"{{"toUserId":"{}","message":"note to self"}}"#, me.to_hex());
    let response = app(test_app_state())
        .oneshot(authed("POST", "/chat", me, Body::from(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn oversized_message_is_rejected() {
    let body = serde_json::json!({ "toUserId": ObjectId::new().to_hex(), "message": "a".repeat(1001) }).to_string();
    let response = app(test_app_state())
        .oneshot(authed("POST", "/chat", ObjectId::new(), Body::from(body)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
