//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database handle and the collaborators every request may need:
//! the token decoder, the telephone cipher, the push fan-out and the image
//! store. Nothing request-scoped lives here.

use std::sync::Arc;

use mongodb::Database;

use crate::config::AppConfig;
use crate::push::PushFanout;
use crate::services::crypto::PhoneCipher;
use crate::services::identity::TokenDecoder;
use crate::services::image::ImageStore;
use crate::services::realtime;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; every field is cheap to clone.
#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenDecoder>,
    pub cipher: PhoneCipher,
    pub push: PushFanout,
    pub images: Arc<dyn ImageStore>,
}

impl AppState {
    #[must_use]
    pub fn new(database: Database, config: AppConfig, push: PushFanout, images: Arc<dyn ImageStore>) -> Self {
        let tokens = Arc::new(TokenDecoder::new(&config.jwt_secret));
        let cipher = PhoneCipher::new(config.crypto_key.as_deref());
        Self { database, config: Arc::new(config), tokens, cipher, push, images }
    }

    /// Key of the current realtime day in the service timezone.
    #[must_use]
    pub fn today(&self) -> bson::DateTime {
        realtime::today(self.config.utc_offset_hours)
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================


#[cfg(test)]
#[path = "state_test.rs"]
mod tests;
