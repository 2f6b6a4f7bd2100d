use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Closed taxonomy for provider-side send failures.
///
/// Produced once at the gateway boundary and consumed uniformly downstream;
/// callers never re-parse the provider's error response shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderErrorKind {
    /// Rejected locally (malformed phone number), no outbound call was made.
    LocalValidation,
    /// The provider throttled the call.
    RateLimited,
    /// Access token rejected or expired.
    InvalidCredential,
    /// The recipient number cannot receive messages on this channel.
    InvalidRecipient,
    /// Timeout, connection failure or a provider-side 5xx.
    Transient,
    /// Anything the taxonomy does not recognize.
    Unknown,
}

impl ProviderErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderErrorKind::LocalValidation => "local_validation",
            ProviderErrorKind::RateLimited => "rate_limited",
            ProviderErrorKind::InvalidCredential => "invalid_credential",
            ProviderErrorKind::InvalidRecipient => "invalid_recipient",
            ProviderErrorKind::Transient => "transient",
            ProviderErrorKind::Unknown => "unknown",
        }
    }

    /// Whether a later dispatch could plausibly succeed without operator action.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            ProviderErrorKind::RateLimited | ProviderErrorKind::Transient
        )
    }
}

impl std::fmt::Display for ProviderErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape/range failures detected before any side effect.
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("at least one recipient is required")]
    NoRecipients,
    #[error("too many recipients: {0} (maximum 3)")]
    TooManyRecipients(usize),
    #[error("recipient display name must not be empty")]
    EmptyDisplayName,
    #[error("invalid phone number: {0}")]
    InvalidPhoneNumber(String),
    #[error("message must not be empty")]
    EmptyMessage,
    #[error("message too long: {0} characters (maximum 1000)")]
    MessageTooLong(usize),
    #[error("latitude out of range: {0}")]
    InvalidLatitude(f64),
    #[error("longitude out of range: {0}")]
    InvalidLongitude(f64),
}

/// Persistence layer failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("user {0} not found")]
    UserNotFound(i32),
}

/// Failures that reject a dispatch before any provider call is made.
///
/// Per-part provider failures never appear here; they are absorbed into the
/// corresponding [`crate::provider::PartOutcome`] and reported through the
/// dispatch result instead.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("user {0} is not authorized for the messaging service")]
    Authorization(i32),
    #[error("quota exceeded: {used}/{limit} used, {requested} more requested")]
    QuotaExceeded {
        used: i32,
        limit: i32,
        requested: i32,
    },
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DispatchError {
    /// True when the rejection happened before any side effect, so the caller
    /// may safely resubmit a corrected request.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            DispatchError::Validation(_)
                | DispatchError::Authorization(_)
                | DispatchError::QuotaExceeded { .. }
        )
    }
}
