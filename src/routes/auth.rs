//! Bearer token extractor.

use axum::extract::{FromRef, FromRequestParts};
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, StatusCode};
use axum_extra::extract::cookie::{Cookie, CookieJar};

use crate::services::identity::Identity;
use crate::state::AppState;

const COOKIE_NAME: &str = "access_token";

/// Token from `Authorization: Bearer <token>`, falling back to the
/// `access_token` cookie.
pub(crate) fn token_from_headers(headers: &HeaderMap) -> Option<String> {
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_owned());
    }

    let jar = CookieJar::from_headers(headers);
    jar.get(COOKIE_NAME).map(Cookie::value).filter(|t| !t.is_empty()).map(str::to_owned)
}

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// Authenticated caller decoded from the request token.
/// Use as a handler parameter to require authentication.
pub struct AuthUser(pub Identity);

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let token = token_from_headers(&parts.headers).ok_or(StatusCode::UNAUTHORIZED)?;

        let app_state = AppState::from_ref(state);
        let identity = app_state.tokens.decode(&token).map_err(|e| {
            tracing::debug!(error = %e, "rejected token");
            StatusCode::UNAUTHORIZED
        })?;

        Ok(Self(identity))
    }
}

/// Authenticated caller holding the manager role. Other callers get 403.
pub struct ManagerUser(pub Identity);

impl<S> FromRequestParts<S> for ManagerUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut axum::http::request::Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(identity) = AuthUser::from_request_parts(parts, state).await?;
        if !identity.is_manager() {
            tracing::debug!(uid = %identity.uid, "manager role required");
            return Err(StatusCode::FORBIDDEN);
        }
        Ok(Self(identity))
    }
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
