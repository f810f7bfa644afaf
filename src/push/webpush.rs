//! Browser push via an external web push gateway.
//!
//! Subscriptions are stored per uid. Payload encryption and VAPID signing are
//! done by the gateway; this sender forwards `{subscription, payload}` to it
//! and drops subscriptions the gateway reports as gone.

use std::time::Duration;

use bson::doc;
use futures::TryStreamExt;
use mongodb::Database;
use serde::{Deserialize, Serialize};

use super::{Delivery, DeviceChannel, PushError, PushSender, deliver_to_devices};
use crate::db;

const CONNECT_TIMEOUT_SECS: u64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subscription {
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationSub {
    pub uid: String,
    pub endpoint: String,
    pub keys: SubscriptionKeys,
}

fn collection(database: &Database) -> mongodb::Collection<NotificationSub> {
    database.collection(db::NOTIFICATION_SUBS)
}

/// Store or refresh a browser subscription for `uid`.
///
/// # Errors
///
/// Returns a database error if the upsert fails.
pub async fn subscribe(database: &Database, uid: &str, subscription: &Subscription) -> Result<(), PushError> {
    let keys = bson::to_bson(&subscription.keys).map_err(|e| PushError::Request(e.to_string()))?;
    collection(database)
        .update_one(
            doc! { "uid": uid, "endpoint": subscription.endpoint.as_str() },
            doc! { "$set": { "keys": keys } },
            mongodb::options::UpdateOptions::builder().upsert(true).build(),
        )
        .await?;
    Ok(())
}

/// Body forwarded to the gateway for one subscription.
#[must_use]
pub fn gateway_body(sub: &NotificationSub, title: &str, body: &str) -> serde_json::Value {
    serde_json::json!({
        "subscription": { "endpoint": sub.endpoint, "keys": sub.keys },
        "payload": { "title": title, "body": body },
    })
}

/// 404 and 410 from a push service mean the subscription no longer exists.
#[must_use]
pub fn is_expired_status(status: u16) -> bool {
    matches!(status, 404 | 410)
}

pub struct WebPushSender {
    http: reqwest::Client,
    database: Database,
    gateway_url: String,
}

impl WebPushSender {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(gateway_url: String, database: Database, timeout_secs: u64) -> Result<Self, PushError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| PushError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, database, gateway_url })
    }
}

#[async_trait::async_trait]
impl DeviceChannel for WebPushSender {
    type Device = NotificationSub;

    async fn deliver(&self, sub: &NotificationSub, title: &str, body: &str) -> Delivery {
        let response = match self.http.post(&self.gateway_url).json(&gateway_body(sub, title, body)).send().await {
            Ok(r) => r,
            Err(e) => return Delivery::Failed(PushError::Request(e.to_string())),
        };

        let status = response.status().as_u16();
        if response.status().is_success() {
            return Delivery::Sent;
        }
        if is_expired_status(status) {
            tracing::info!(endpoint = %sub.endpoint, "removing expired web push subscription");
            return Delivery::Stale;
        }
        let text = response.text().await.unwrap_or_default();
        Delivery::Failed(PushError::Response { status, body: text })
    }

    async fn prune(&self, uid: &str, sub: &NotificationSub) -> Result<(), PushError> {
        collection(&self.database)
            .delete_one(doc! { "uid": uid, "endpoint": sub.endpoint.as_str() }, None)
            .await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl PushSender for WebPushSender {
    fn name(&self) -> &'static str {
        "webpush"
    }

    async fn send_to_user(&self, uid: &str, title: &str, body: &str) -> Result<(), PushError> {
        let subs: Vec<NotificationSub> = collection(&self.database)
            .find(doc! { "uid": uid }, None)
            .await?
            .try_collect()
            .await?;
        deliver_to_devices(self, uid, &subs, title, body).await
    }
}

#[cfg(test)]
#[path = "webpush_test.rs"]
mod tests;
