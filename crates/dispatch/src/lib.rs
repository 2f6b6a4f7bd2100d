//! Emergency alert dispatch engine.
//!
//! Turns a validated alert request into a sequence of WhatsApp Business
//! Cloud API calls under concurrency and pacing limits, aggregates the
//! per-recipient outcomes, reconciles the subscriber's message quota and
//! appends one immutable audit record per attempt.
//!
//! HTTP routing, authentication and background maintenance are external
//! collaborators; they embed [`service::DispatchService`] and own the rest.

pub mod audit;
pub mod config;
pub mod dispatch;
pub mod entity;
pub mod error;
pub mod provider;
pub mod quota;
pub mod request;
pub mod service;
pub mod store;

pub use config::{AppConfig, PacingConfig, WhatsAppConfig};
pub use dispatch::{BulkDispatchResult, DispatchSummary, RecipientOutcome};
pub use error::{DispatchError, ProviderErrorKind, ValidationError};
pub use provider::{
    AccountInfo, MessagePart, MessageProvider, PartOutcome, ProviderHealth, WhatsAppGateway,
};
pub use request::{AlertInput, AlertRequest, GeoLocation, Recipient};
pub use service::{DispatchResponse, DispatchService, QuotaUsage, TestMessageResponse};
pub use store::{AlertStore, SeaOrmStore};
