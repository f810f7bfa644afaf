//! Caller identity decoded from the request token.
//!
//! Tokens are minted by the web frontend's auth layer (HS256, shared secret).
//! This service only verifies and decodes them.

use bson::oid::ObjectId;
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum IdentityError {
    #[error("token rejected: {0}")]
    Invalid(#[from] jsonwebtoken::errors::Error),
    #[error("token carries malformed user id: {0}")]
    BadUserId(String),
}

/// Claims the frontend puts in every token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// User document id (24-hex ObjectId).
    pub id: String,
    /// External identity key.
    pub uid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    pub exp: i64,
}

/// The authenticated caller. Every service scopes "current user" queries by it.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: ObjectId,
    pub uid: String,
    pub name: String,
    pub picture: Option<String>,
    pub role: Option<String>,
    pub location: Option<String>,
}

impl Identity {
    /// Managers review applications and curate places.
    #[must_use]
    pub fn is_manager(&self) -> bool {
        self.role.as_deref() == Some(super::user::ROLE_MANAGER)
    }
}

pub struct TokenDecoder {
    key: DecodingKey,
    validation: Validation,
}

impl TokenDecoder {
    #[must_use]
    pub fn new(secret: &str) -> Self {
        Self { key: DecodingKey::from_secret(secret.as_bytes()), validation: Validation::new(Algorithm::HS256) }
    }

    /// Verify signature and expiry, then map claims to an [`Identity`].
    ///
    /// # Errors
    ///
    /// Returns [`IdentityError`] for bad signatures, expired tokens, or a
    /// user id that is not an ObjectId.
    pub fn decode(&self, token: &str) -> Result<Identity, IdentityError> {
        let claims = decode::<Claims>(token, &self.key, &self.validation)?.claims;
        let id = ObjectId::parse_str(&claims.id).map_err(|_| IdentityError::BadUserId(claims.id.clone()))?;
        Ok(Identity {
            id,
            uid: claims.uid,
            name: claims.name,
            picture: claims.picture,
            role: claims.role,
            location: claims.location,
        })
    }
}

#[cfg(test)]
#[path = "identity_test.rs"]
mod tests;
