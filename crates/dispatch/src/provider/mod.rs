//! Provider gateway: one text or one location message to one recipient.
//!
//! The gateway normalizes phone numbers, applies the per-call timeout and
//! maps transport/provider errors into the closed [`ProviderErrorKind`]
//! taxonomy. It never retries: one attempt per message part, per dispatch.

pub mod phone;
pub mod whatsapp;

pub use whatsapp::{AccountInfo, WhatsAppGateway};

use crate::error::ProviderErrorKind;
use serde::{Deserialize, Serialize};

/// The two message parts of a recipient pipeline. A pipeline is always
/// Text, then Location iff a location is present.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessagePart {
    Text,
    Location,
}

/// Outcome of a single message-part attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartOutcome {
    pub part: MessagePart,
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub error: Option<ProviderErrorKind>,
    pub error_detail: Option<String>,
}

impl PartOutcome {
    pub fn sent(part: MessagePart, provider_message_id: String) -> Self {
        Self {
            part,
            success: true,
            provider_message_id: Some(provider_message_id),
            error: None,
            error_detail: None,
        }
    }

    pub fn failed(part: MessagePart, error: ProviderErrorKind, detail: impl Into<String>) -> Self {
        Self {
            part,
            success: false,
            provider_message_id: None,
            error: Some(error),
            error_detail: Some(detail.into()),
        }
    }
}

/// Result of a provider health probe.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderHealth {
    pub healthy: bool,
    pub display_number: Option<String>,
    pub verified_name: Option<String>,
    pub quality_rating: Option<String>,
    pub error: Option<String>,
}

impl ProviderHealth {
    pub fn unhealthy(error: impl Into<String>) -> Self {
        Self {
            healthy: false,
            display_number: None,
            verified_name: None,
            quality_rating: None,
            error: Some(error.into()),
        }
    }
}

/// Seam between the dispatch engine and the external messaging channel.
///
/// Implementations must be side-effect free on malformed input: a phone
/// number failing local validation produces a `LocalValidation` outcome
/// without any outbound call.
#[allow(async_fn_in_trait)]
pub trait MessageProvider: Send + Sync {
    async fn send_text(&self, phone_number: &str, body: &str) -> PartOutcome;

    async fn send_location(
        &self,
        phone_number: &str,
        latitude: f64,
        longitude: f64,
        label: &str,
    ) -> PartOutcome;

    async fn health_check(&self) -> ProviderHealth;
}
