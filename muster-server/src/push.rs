//! Push notification delivery
//!
//! Delivery is sequential and best-effort: each subscription gets one
//! attempt, failures are logged per endpoint and never retried, and one
//! failing endpoint never stops delivery to the rest.

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use muster_common::model::PushSubscription;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info};
use web_push::{
    ContentEncoding, IsahcWebPushClient, SubscriptionInfo, VapidSignatureBuilder, WebPushClient,
    WebPushError, WebPushMessageBuilder,
};

/// Title of the scheduled report notification
pub const REPORT_TITLE: &str = "Daily Barcode Report";

/// Seconds a push service may hold an undelivered message
const DEFAULT_TTL_SECONDS: u32 = 60 * 60;

/// Push delivery errors
#[derive(Debug, Error)]
pub enum PushError {
    #[error("Network error: {0}")]
    Network(String),

    /// Push service refused the message; the subscription is gone or the
    /// VAPID signature was not accepted
    #[error("Endpoint rejected notification: {0}")]
    Rejected(String),

    #[error("Invalid subscription: {0}")]
    Subscription(String),

    #[error("VAPID key error: {0}")]
    Vapid(String),

    #[error("Payload error: {0}")]
    Payload(String),
}

impl From<WebPushError> for PushError {
    fn from(e: WebPushError) -> Self {
        match e {
            WebPushError::EndpointNotValid { .. }
            | WebPushError::EndpointNotFound { .. }
            | WebPushError::Unauthorized { .. } => PushError::Rejected(e.to_string()),
            other => PushError::Network(other.to_string()),
        }
    }
}

/// Notification payload as the service worker expects it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PushPayload {
    pub title: String,
    pub body: String,
}

impl PushPayload {
    pub fn report(body: impl Into<String>) -> Self {
        Self {
            title: REPORT_TITLE.to_string(),
            body: body.into(),
        }
    }

    pub fn to_json(&self) -> Result<String, PushError> {
        serde_json::to_string(self).map_err(|e| PushError::Payload(e.to_string()))
    }
}

/// Sends one payload to one subscription
#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> Result<(), PushError>;
}

/// Web Push delivery: VAPID-signed, `aes128gcm`-encrypted
pub struct WebPushSender {
    client: IsahcWebPushClient,
    private_key_pem: Vec<u8>,
    contact: String,
    ttl_seconds: u32,
}

impl WebPushSender {
    /// `private_key_pem` is the VAPID P-256 key; `contact` (mailto: or URL)
    /// goes into the `sub` claim
    pub fn new(private_key_pem: Vec<u8>, contact: &str) -> Result<Self, PushError> {
        VapidSignatureBuilder::from_pem_no_sub(private_key_pem.as_slice())
            .map_err(|e| PushError::Vapid(e.to_string()))?;
        let client = IsahcWebPushClient::new().map_err(|e| PushError::Network(e.to_string()))?;

        Ok(Self {
            client,
            private_key_pem,
            contact: contact.to_string(),
            ttl_seconds: DEFAULT_TTL_SECONDS,
        })
    }

    pub fn from_pem_file(path: &Path, contact: &str) -> Result<Self, PushError> {
        let pem = std::fs::read(path)
            .map_err(|e| PushError::Vapid(format!("Read {} failed: {}", path.display(), e)))?;
        Self::new(pem, contact)
    }

    /// Application server key browsers subscribe with (base64url, no padding)
    pub fn public_key(&self) -> Result<String, PushError> {
        let builder = VapidSignatureBuilder::from_pem_no_sub(self.private_key_pem.as_slice())
            .map_err(|e| PushError::Vapid(e.to_string()))?;
        Ok(URL_SAFE_NO_PAD.encode(builder.get_public_key()))
    }
}

#[async_trait]
impl PushSender for WebPushSender {
    async fn send(&self, subscription: &PushSubscription, payload: &str) -> Result<(), PushError> {
        let info = SubscriptionInfo::new(
            subscription.endpoint.as_str(),
            subscription_key(subscription, "p256dh")?,
            subscription_key(subscription, "auth")?,
        );

        let mut signature = VapidSignatureBuilder::from_pem(self.private_key_pem.as_slice(), &info)
            .map_err(|e| PushError::Vapid(e.to_string()))?;
        signature.add_claim("sub", self.contact.as_str());
        let signature = signature
            .build()
            .map_err(|e| PushError::Vapid(e.to_string()))?;

        let mut message = WebPushMessageBuilder::new(&info);
        message.set_ttl(self.ttl_seconds);
        message.set_payload(ContentEncoding::Aes128Gcm, payload.as_bytes());
        message.set_vapid_signature(signature);
        let message = message
            .build()
            .map_err(|e| PushError::Payload(e.to_string()))?;

        self.client.send(message).await?;
        Ok(())
    }
}

/// `keys.<name>` of a browser subscription
fn subscription_key<'a>(subscription: &'a PushSubscription, name: &str) -> Result<&'a str, PushError> {
    subscription
        .extra
        .get("keys")
        .and_then(|keys| keys.get(name))
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| PushError::Subscription(format!("missing keys.{}", name)))
}

/// Outcome of one delivery round
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliverySummary {
    pub delivered: usize,
    /// Endpoints whose delivery failed
    pub failed: Vec<String>,
}

impl DeliverySummary {
    pub fn attempted(&self) -> usize {
        self.delivered + self.failed.len()
    }
}

/// Send `payload` to every subscription, one after another
pub async fn deliver(
    sender: &dyn PushSender,
    subscriptions: &[PushSubscription],
    payload: &PushPayload,
) -> DeliverySummary {
    let mut summary = DeliverySummary::default();

    let body = match payload.to_json() {
        Ok(body) => body,
        Err(e) => {
            error!("Failed to encode push payload: {}", e);
            summary.failed = subscriptions.iter().map(|s| s.endpoint.clone()).collect();
            return summary;
        }
    };

    for subscription in subscriptions {
        match sender.send(subscription, &body).await {
            Ok(()) => {
                info!("Notification sent to: {}", subscription.endpoint);
                summary.delivered += 1;
            }
            Err(e) => {
                error!(endpoint = %subscription.endpoint, "Failed to send push notification: {}", e);
                summary.failed.push(subscription.endpoint.clone());
            }
        }
    }

    summary
}
