//! Immutable audit records of dispatch attempts.
//!
//! Exactly one record per completed dispatch attempt, including failed and
//! partial-failure attempts; never one for requests rejected before dispatch.
//! A write failure here is reported to the operational log and surfaces as a
//! missing receipt — it must never suppress or alter the dispatch result
//! already computed.

use crate::dispatch::BulkDispatchResult;
use crate::error::StoreError;
use crate::request::AlertRequest;
use crate::store::{AlertStore, AuditKind, AuditReceipt, AuditStatus, NewAuditRecord};
use serde_json::json;
use std::sync::Arc;

pub struct AuditLogger<S> {
    store: Arc<S>,
}

impl<S: AlertStore> AuditLogger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Append the record for one completed bulk dispatch.
    #[tracing::instrument(skip(self, request, result))]
    pub async fn record_dispatch(
        &self,
        user_id: i32,
        kind: AuditKind,
        request: &AlertRequest,
        result: &BulkDispatchResult,
    ) -> Result<AuditReceipt, StoreError> {
        let status = if result.overall_success {
            AuditStatus::Sent
        } else {
            AuditStatus::Failed
        };
        let recipients = json!(
            request
                .recipients()
                .iter()
                .map(|r| json!({ "name": r.display_name, "phone_number": r.phone_number }))
                .collect::<Vec<_>>()
        );
        let record = NewAuditRecord {
            user_id,
            kind,
            recipients,
            content: request.message().to_string(),
            location: request.location().map(|loc| json!(loc)),
            provider_message_ids: result.joined_message_ids(),
            status,
            error_detail: result.failure_detail(),
            outcomes: serde_json::to_value(&result.recipient_outcomes)
                .unwrap_or(serde_json::Value::Null),
            sent_at: request.sent_at(),
        };
        self.append(record).await
    }

    /// Append the record for one test-message attempt.
    #[tracing::instrument(skip(self, content, outcome))]
    pub async fn record_test_message(
        &self,
        user_id: i32,
        phone_number: &str,
        content: &str,
        outcome: &crate::provider::PartOutcome,
        sent_at: time::OffsetDateTime,
    ) -> Result<AuditReceipt, StoreError> {
        let status = if outcome.success {
            AuditStatus::Sent
        } else {
            AuditStatus::Failed
        };
        let record = NewAuditRecord {
            user_id,
            kind: AuditKind::TestMessage,
            recipients: json!([{ "phone_number": phone_number }]),
            content: content.to_string(),
            location: None,
            provider_message_ids: outcome.provider_message_id.clone(),
            status,
            error_detail: outcome.error_detail.clone(),
            outcomes: serde_json::to_value(std::slice::from_ref(outcome))
                .unwrap_or(serde_json::Value::Null),
            sent_at,
        };
        self.append(record).await
    }

    async fn append(&self, record: NewAuditRecord) -> Result<AuditReceipt, StoreError> {
        let receipt = self.store.append_audit_record(record).await?;
        tracing::debug!(audit_id = receipt.id, "audit record appended");
        Ok(receipt)
    }
}
