//! FCM HTTP v1 sender for mobile devices.
//!
//! Device tokens live in the `fcmtokens` collection, one document per uid.
//! The access token is supplied by the deployment (`FCM_ACCESS_TOKEN`).

use std::time::Duration;

use bson::doc;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use super::{Delivery, DeviceChannel, PushError, PushSender, deliver_to_devices};
use crate::config::FcmConfig;
use crate::db;

const FCM_API_BASE: &str = "https://fcm.googleapis.com/v1/projects";
const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FcmDevice {
    pub token: String,
    pub platform: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FcmTokenDoc {
    pub uid: String,
    #[serde(default)]
    pub devices: Vec<FcmDevice>,
}

fn collection(database: &Database) -> mongodb::Collection<FcmTokenDoc> {
    database.collection(db::FCM_TOKENS)
}

/// Removes `token` from whichever user currently holds it.
#[must_use]
pub fn pull_token_update(token: &str) -> bson::Document {
    doc! { "$pull": { "devices": { "token": token } } }
}

/// Register a device token for `uid`. A token is held by one device entry
/// only: re-registering replaces the previous entry, whatever its platform or
/// owner.
///
/// # Errors
///
/// Returns a database error if either update fails.
pub async fn register_token(database: &Database, uid: &str, device: &FcmDevice) -> Result<(), PushError> {
    let coll = collection(database);
    coll.update_many(doc! { "devices.token": device.token.as_str() }, pull_token_update(&device.token), None)
        .await?;

    let device = bson::to_bson(device).map_err(|e| PushError::Request(e.to_string()))?;
    coll.update_one(
        doc! { "uid": uid },
        doc! { "$addToSet": { "devices": device } },
        mongodb::options::UpdateOptions::builder().upsert(true).build(),
    )
    .await?;
    Ok(())
}

/// Request body for `messages:send`.
#[must_use]
pub fn message_body(token: &str, title: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "message": {
            "token": token,
            "notification": { "title": title, "body": body },
        }
    })
}

pub struct FcmSender {
    http: reqwest::Client,
    database: Database,
    endpoint: String,
    access_token: String,
}

impl FcmSender {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: &FcmConfig, database: Database, timeout_secs: u64) -> Result<Self, PushError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PushError::HttpClientBuild(e.to_string()))?;
        Ok(Self {
            http,
            database,
            endpoint: format!("{FCM_API_BASE}/{}/messages:send", config.project_id),
            access_token: config.access_token.clone(),
        })
    }

    async fn send_to_device(&self, token: &str, title: &str, body: &str) -> Result<(), PushError> {
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.access_token)
            .json(&message_body(token, title, body))
            .send()
            .await
            .map_err(|e| PushError::Request(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 200 {
            return Ok(());
        }
        let text = response.text().await.unwrap_or_default();
        Err(PushError::Response { status, body: text })
    }
}

#[async_trait::async_trait]
impl DeviceChannel for FcmSender {
    type Device = FcmDevice;

    async fn deliver(&self, device: &FcmDevice, title: &str, body: &str) -> Delivery {
        match self.send_to_device(&device.token, title, body).await {
            Ok(()) => Delivery::Sent,
            // FCM answers 404 UNREGISTERED for tokens of uninstalled apps.
            Err(PushError::Response { status: 404, .. }) => {
                tracing::info!(platform = %device.platform, "pruning unregistered fcm token");
                Delivery::Stale
            }
            Err(e) => Delivery::Failed(e),
        }
    }

    async fn prune(&self, uid: &str, device: &FcmDevice) -> Result<(), PushError> {
        collection(&self.database)
            .update_one(doc! { "uid": uid }, pull_token_update(&device.token), None)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PushSender for FcmSender {
    fn name(&self) -> &'static str {
        "fcm"
    }

    async fn send_to_user(&self, uid: &str, title: &str, body: &str) -> Result<(), PushError> {
        let Some(record) = collection(&self.database)
            .find_one(doc! { "uid": uid }, None)
            .await?
        else {
            return Ok(());
        };
        deliver_to_devices(self, uid, &record.devices, title, body).await
    }
}

#[cfg(test)]
#[path = "fcm_test.rs"]
mod tests;
