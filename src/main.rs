mod config;
mod db;
mod push;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::push::fcm::FcmSender;
use crate::push::webpush::WebPushSender;
use crate::push::{PushFanout, PushSender};
use crate::services::image::DiskImageStore;

fn push_senders(config: &config::AppConfig, database: &mongodb::Database) -> Vec<Arc<dyn PushSender>> {
    let mut senders: Vec<Arc<dyn PushSender>> = Vec::new();

    // Each channel is optional; a misconfigured one is skipped, not fatal.
    if let Some(fcm) = &config.fcm {
        match FcmSender::new(fcm, database.clone(), config.push_timeout_secs) {
            Ok(sender) => senders.push(Arc::new(sender)),
            Err(e) => tracing::warn!(error = %e, "FCM sender disabled"),
        }
    }
    if let Some(url) = &config.webpush_gateway_url {
        match WebPushSender::new(url.clone(), database.clone(), config.push_timeout_secs) {
            Ok(sender) => senders.push(Arc::new(sender)),
            Err(e) => tracing::warn!(error = %e, "web push sender disabled"),
        }
    }
    senders
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")))
        .init();

    let config = config::AppConfig::from_env().expect("invalid configuration");
    let port = config.port;

    let database = db::init_database(&config.mongodb_uri, &config.database_name)
        .await
        .expect("database init failed");

    let push = PushFanout::new(push_senders(&config, &database));
    if push.sender_count() == 0 {
        tracing::warn!("no push channel configured, notifications disabled");
    }
    if config.crypto_key.is_none() {
        tracing::warn!("CRYPTO_KEY not set, registration is refused");
    }

    let images = Arc::new(DiskImageStore::new(config.upload_dir.clone(), config.public_base_url.clone()));
    let state = state::AppState::new(database, config, push, images);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "community server listening");
    axum::serve(listener, app).await.expect("server failed");
}
