//! Narrow persistence contracts consumed by the dispatch engine.
//!
//! The engine never talks to the database directly; everything goes through
//! [`AlertStore`]. The quota reservation is the single concurrency-sensitive
//! operation and must be an atomic check-and-increment at the storage layer.

pub mod db;

pub use db::SeaOrmStore;

use crate::error::StoreError;
use serde::Serialize;
use time::OffsetDateTime;

/// Per-user monthly message-unit budget.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuotaState {
    pub used: i32,
    pub limit: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reset_at: Option<OffsetDateTime>,
}

impl QuotaState {
    pub fn remaining(&self) -> i32 {
        (self.limit - self.used).max(0)
    }
}

/// Result of an atomic quota reservation attempt.
///
/// When `allowed` is true the returned state already includes the reserved
/// units; when false, nothing was mutated and the state is the current one.
#[derive(Debug, Clone, Copy)]
pub struct QuotaReservation {
    pub allowed: bool,
    pub state: QuotaState,
}

/// The slice of the user aggregate the engine needs.
#[derive(Debug, Clone)]
pub struct UserProfile {
    pub id: i32,
    pub premium_active: bool,
    pub quota: QuotaState,
}

/// Kind discriminator of an audit record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    EmergencyAlert,
    TestMessage,
}

impl AuditKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditKind::EmergencyAlert => "emergency_alert",
            AuditKind::TestMessage => "test_message",
        }
    }
}

/// Binary projection of the dispatch outcome stored on the record. The full
/// per-recipient outcome list is persisted alongside it, so the projection
/// loses no detail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditStatus {
    Sent,
    Failed,
}

impl AuditStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuditStatus::Sent => "sent",
            AuditStatus::Failed => "failed",
        }
    }
}

/// One immutable audit record, ready to append.
#[derive(Debug, Clone)]
pub struct NewAuditRecord {
    pub user_id: i32,
    pub kind: AuditKind,
    pub recipients: serde_json::Value,
    pub content: String,
    pub location: Option<serde_json::Value>,
    pub provider_message_ids: Option<String>,
    pub status: AuditStatus,
    pub error_detail: Option<String>,
    /// Full per-recipient outcome list (serialized [`crate::dispatch::RecipientOutcome`]s).
    pub outcomes: serde_json::Value,
    pub sent_at: OffsetDateTime,
}

/// Receipt for an appended audit record.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct AuditReceipt {
    pub id: i32,
    pub created_at: OffsetDateTime,
}

/// Persistence operations consumed by the engine.
#[allow(async_fn_in_trait)]
pub trait AlertStore: Send + Sync {
    async fn get_user(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError>;

    /// Atomic check-and-increment: allowed iff `used + units <= limit`, and
    /// the increment happens in the same storage-level read-modify-write as
    /// the check. Denial must not mutate anything.
    async fn reserve_quota(&self, user_id: i32, units: i32)
    -> Result<QuotaReservation, StoreError>;

    async fn append_audit_record(&self, record: NewAuditRecord)
    -> Result<AuditReceipt, StoreError>;

    async fn touch_user_activity(&self, user_id: i32) -> Result<(), StoreError>;
}
