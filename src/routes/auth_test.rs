use axum::extract::FromRequestParts;
use axum::http::header::COOKIE;
use axum::http::{HeaderValue, Request};
use bson::oid::ObjectId;

use super::*;
use crate::state::test_helpers::{sign_token, sign_token_with_role, test_app_state};

fn headers(pairs: &[(axum::http::HeaderName, &str)]) -> HeaderMap {
    let mut map = HeaderMap::new();
    for (name, value) in pairs {
        map.append(name.clone(), HeaderValue::from_str(value).unwrap());
    }
    map
}

async fn extract(pairs: &[(axum::http::HeaderName, &str)]) -> Result<AuthUser, StatusCode> {
    let mut builder = Request::builder().uri("/");
    for (name, value) in pairs {
        builder = builder.header(name.clone(), *value);
    }
    let (mut parts, ()) = builder.body(()).unwrap().into_parts();
    AuthUser::from_request_parts(&mut parts, &test_app_state()).await
}

#[test]
fn bearer_header_wins_over_cookie() {
    let map = headers(&[(AUTHORIZATION, "Bearer abc"), (COOKIE, "access_token=def")]);
    assert_eq!(token_from_headers(&map).as_deref(), Some("abc"));
}

#[test]
fn cookie_is_used_without_header() {
    let map = headers(&[(COOKIE, "theme=dark; access_token=def")]);
    assert_eq!(token_from_headers(&map).as_deref(), Some("def"));
}

#[test]
fn non_bearer_schemes_and_blank_tokens_are_ignored() {
    assert_eq!(token_from_headers(&headers(&[(AUTHORIZATION, "Basic abc")])), None);
    assert_eq!(token_from_headers(&headers(&[(AUTHORIZATION, "Bearer   ")])), None);
    assert_eq!(token_from_headers(&headers(&[(COOKIE, "access_token=")])), None);
    assert_eq!(token_from_headers(&HeaderMap::new()), None);
}

#[tokio::test]
async fn extractor_decodes_valid_token() {
    let id = ObjectId::new();
    let token = sign_token(id, "kakao-7");
    let bearer = format!("Bearer {token}");
    let AuthUser(identity) = extract(&[(AUTHORIZATION, bearer.as_str())]).await.unwrap();
    assert_eq!(identity.id, id);
    assert_eq!(identity.uid, "kakao-7");
}

#[tokio::test]
async fn extractor_rejects_missing_and_bad_tokens() {
    assert_eq!(extract(&[]).await.err(), Some(StatusCode::UNAUTHORIZED));
    assert_eq!(extract(&[(AUTHORIZATION, "Bearer not.a.jwt")]).await.err(), Some(StatusCode::UNAUTHORIZED));
}

async fn extract_manager(token: &str) -> Result<ManagerUser, StatusCode> {
    let (mut parts, ()) = Request::builder()
        .uri("/")
        .header(AUTHORIZATION, format!("Bearer {token}"))
        .body(())
        .unwrap()
        .into_parts();
    ManagerUser::from_request_parts(&mut parts, &test_app_state()).await
}

#[tokio::test]
async fn manager_extractor_checks_role() {
    let human = sign_token(ObjectId::new(), "kakao-1");
    assert_eq!(extract_manager(&human).await.err(), Some(StatusCode::FORBIDDEN));

    let manager = sign_token_with_role(ObjectId::new(), "kakao-2", Some("manager"));
    let ManagerUser(identity) = extract_manager(&manager).await.unwrap();
    assert_eq!(identity.uid, "kakao-2");

    assert_eq!(extract_manager("garbage").await.err(), Some(StatusCode::UNAUTHORIZED));
}
