//! Push notification fan-out over FCM for mobile, a web push gateway for browsers.
//!
//! DESIGN
//! ======
//! Services notify counterparts after a state change through [`PushFanout`],
//! which calls every configured [`PushSender`] in turn. Delivery is
//! best-effort: a sender failure is logged and never fails the request that
//! triggered it.

pub mod fcm;
pub mod webpush;

use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum PushError {
    #[error("push request failed: {0}")]
    Request(String),
    #[error("push provider returned status {status}")]
    Response { status: u16, body: String },
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),
    #[error("database error: {0}")]
    Database(#[from] mongodb::error::Error),
}

/// One delivery channel. Enables mocking in tests.
#[async_trait::async_trait]
pub trait PushSender: Send + Sync {
    /// Channel name used in logs.
    fn name(&self) -> &'static str;

    /// Deliver a notification to every device registered for `uid`.
    ///
    /// # Errors
    ///
    /// Returns a [`PushError`] if the provider rejects the request.
    async fn send_to_user(&self, uid: &str, title: &str, body: &str) -> Result<(), PushError>;
}

/// Result of one delivery attempt to a single device or subscription.
#[derive(Debug)]
pub enum Delivery {
    Sent,
    /// The provider reports the registration gone for good.
    Stale,
    Failed(PushError),
}

/// Per-device half of a sender: deliver to one registration, drop a stale one.
#[async_trait::async_trait]
pub(crate) trait DeviceChannel: Send + Sync {
    type Device: Send + Sync;

    async fn deliver(&self, device: &Self::Device, title: &str, body: &str) -> Delivery;

    async fn prune(&self, uid: &str, device: &Self::Device) -> Result<(), PushError>;
}

/// Try every device of `uid`. Stale registrations are pruned; a failed prune
/// is logged and delivery moves on. Returns the last error seen, if any.
pub(crate) async fn deliver_to_devices<C: DeviceChannel>(
    channel: &C,
    uid: &str,
    devices: &[C::Device],
    title: &str,
    body: &str,
) -> Result<(), PushError> {
    let mut last_err = None;
    for device in devices {
        match channel.deliver(device, title, body).await {
            Delivery::Sent => {}
            Delivery::Stale => {
                if let Err(e) = channel.prune(uid, device).await {
                    tracing::warn!(%uid, error = %e, "failed to prune stale push registration");
                    last_err = Some(e);
                }
            }
            Delivery::Failed(e) => last_err = Some(e),
        }
    }
    last_err.map_or(Ok(()), Err)
}

#[derive(Clone, Default)]
pub struct PushFanout {
    senders: Vec<Arc<dyn PushSender>>,
}

impl PushFanout {
    #[must_use]
    pub fn new(senders: Vec<Arc<dyn PushSender>>) -> Self {
        Self { senders }
    }

    #[must_use]
    pub fn sender_count(&self) -> usize {
        self.senders.len()
    }

    /// Notify one user on every channel. Returns how many channels delivered.
    pub async fn notify_user(&self, uid: &str, title: &str, body: &str) -> usize {
        let mut delivered = 0;
        for sender in &self.senders {
            match sender.send_to_user(uid, title, body).await {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(channel = sender.name(), %uid, error = %e, "push delivery failed");
                }
            }
        }
        delivered
    }

    /// Notify each of `uids`. Returns the total number of successful deliveries.
    pub async fn notify_many(&self, uids: &[String], title: &str, body: &str) -> usize {
        let mut delivered = 0;
        for uid in uids {
            delivered += self.notify_user(uid, title, body).await;
        }
        delivered
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
