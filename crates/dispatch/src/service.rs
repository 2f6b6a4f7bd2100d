//! The boundary-facing dispatch service.
//!
//! Wires the normalizer, quota ledger, orchestrator and audit logger behind
//! one entry point per operation. All collaborators are injected at
//! construction; there are no process-wide singletons.

use crate::audit::AuditLogger;
use crate::config::PacingConfig;
use crate::dispatch::{BulkDispatchResult, DispatchOrchestrator, DispatchSummary, RecipientOutcome};
use crate::error::{DispatchError, ProviderErrorKind, ValidationError};
use crate::provider::{MessageProvider, ProviderHealth};
use crate::quota::QuotaLedger;
use crate::request::{AlertInput, MAX_MESSAGE_CHARS};
use crate::request;
use crate::provider::phone;
use crate::store::{AlertStore, AuditKind, AuditReceipt, QuotaState, UserProfile};
use serde::Serialize;
use std::sync::Arc;
use time::OffsetDateTime;

/// Quota view returned alongside every successful operation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaUsage {
    pub used: i32,
    pub limit: i32,
    pub remaining: i32,
}

impl From<QuotaState> for QuotaUsage {
    fn from(state: QuotaState) -> Self {
        Self {
            used: state.used,
            limit: state.limit,
            remaining: state.remaining(),
        }
    }
}

/// Result of one emergency alert dispatch, as handed to the boundary layer.
#[derive(Debug, Serialize)]
pub struct DispatchResponse {
    pub overall_success: bool,
    pub recipient_outcomes: Vec<RecipientOutcome>,
    pub summary: DispatchSummary,
    pub quota: QuotaUsage,
    /// `None` when the audit write failed; the dispatch result stands either way.
    pub audit: Option<AuditReceipt>,
    pub sent_at: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct TestMessageResponse {
    pub success: bool,
    pub phone_number: String,
    pub provider_message_id: Option<String>,
    pub error: Option<ProviderErrorKind>,
    pub quota: QuotaUsage,
    pub audit: Option<AuditReceipt>,
}

#[derive(Debug, Serialize)]
pub struct QuotaStatus {
    pub used: i32,
    pub limit: i32,
    pub remaining: i32,
    pub reset_at: Option<OffsetDateTime>,
    pub percent_used: i32,
}

pub struct DispatchService<P, S> {
    store: Arc<S>,
    provider: Arc<P>,
    orchestrator: DispatchOrchestrator<P>,
    ledger: QuotaLedger<S>,
    audit: AuditLogger<S>,
}

impl<P: MessageProvider, S: AlertStore> DispatchService<P, S> {
    pub fn new(provider: Arc<P>, store: Arc<S>, pacing: PacingConfig) -> Self {
        Self {
            orchestrator: DispatchOrchestrator::new(provider.clone(), pacing),
            ledger: QuotaLedger::new(store.clone()),
            audit: AuditLogger::new(store.clone()),
            store,
            provider,
        }
    }

    async fn authorized_user(&self, user_id: i32) -> Result<UserProfile, DispatchError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(DispatchError::Authorization(user_id))?;
        if !user.premium_active {
            return Err(DispatchError::Authorization(user_id));
        }
        Ok(user)
    }

    /// Dispatch an emergency alert to 1-3 recipients.
    ///
    /// Rejections (validation, authorization, quota) happen before any
    /// provider call and leave no side effects. Once dispatch starts it runs
    /// to completion; per-recipient failures are absorbed into the result.
    #[tracing::instrument(skip(self, input))]
    pub async fn dispatch_emergency_alert(
        &self,
        user_id: i32,
        input: AlertInput,
    ) -> Result<DispatchResponse, DispatchError> {
        self.authorized_user(user_id).await?;
        let request = input.normalize()?;

        let reservation = self.ledger.reserve(user_id, request.units_needed()).await?;
        if !reservation.allowed {
            return Err(DispatchError::QuotaExceeded {
                used: reservation.state.used,
                limit: reservation.state.limit,
                requested: request.units_needed(),
            });
        }

        let outcomes = self.orchestrator.dispatch(&request).await;
        let result = BulkDispatchResult::from_outcomes(outcomes);
        tracing::info!(
            name = "dispatch.completed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            user_id,
            total = result.summary.total,
            successful = result.summary.successful,
            failed = result.summary.failed,
            overall_success = result.overall_success,
            message = "Bulk dispatch completed"
        );

        let audit = self
            .write_audit(user_id, AuditKind::EmergencyAlert, &request, &result)
            .await;
        self.touch_activity(user_id).await;

        let BulkDispatchResult {
            recipient_outcomes,
            summary,
            overall_success,
        } = result;
        Ok(DispatchResponse {
            overall_success,
            recipient_outcomes,
            summary,
            quota: reservation.state.into(),
            audit,
            sent_at: request.sent_at(),
        })
    }

    /// Send a single test text message to verify the subscriber's setup.
    #[tracing::instrument(skip(self, message))]
    pub async fn send_test_message(
        &self,
        user_id: i32,
        phone_number: &str,
        message: Option<String>,
    ) -> Result<TestMessageResponse, DispatchError> {
        self.authorized_user(user_id).await?;

        let number = phone::normalize(phone_number).ok_or_else(|| {
            ValidationError::InvalidPhoneNumber(phone_number.to_string())
        })?;
        if let Some(message) = &message {
            let chars = message.chars().count();
            if chars == 0 {
                return Err(ValidationError::EmptyMessage.into());
            }
            if chars > MAX_MESSAGE_CHARS {
                return Err(ValidationError::MessageTooLong(chars).into());
            }
        }

        let reservation = self.ledger.reserve(user_id, 1).await?;
        if !reservation.allowed {
            return Err(DispatchError::QuotaExceeded {
                used: reservation.state.used,
                limit: reservation.state.limit,
                requested: 1,
            });
        }

        let sent_at = OffsetDateTime::now_utc();
        let body = message.unwrap_or_else(|| request::test_message(sent_at));
        let outcome = self.provider.send_text(&number, &body).await;

        let audit = match self
            .audit
            .record_test_message(user_id, &number, &body, &outcome, sent_at)
            .await
        {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                self.report_audit_failure(user_id, &e);
                None
            }
        };
        self.touch_activity(user_id).await;

        Ok(TestMessageResponse {
            success: outcome.success,
            phone_number: number,
            provider_message_id: outcome.provider_message_id,
            error: outcome.error,
            quota: reservation.state.into(),
            audit,
        })
    }

    /// Current quota state for the subscriber.
    #[tracing::instrument(skip(self))]
    pub async fn quota_status(&self, user_id: i32) -> Result<QuotaStatus, DispatchError> {
        let user = self
            .store
            .get_user(user_id)
            .await?
            .ok_or(DispatchError::Authorization(user_id))?;
        let quota = user.quota;
        let percent_used = if quota.limit > 0 {
            ((quota.used as f64 / quota.limit as f64) * 100.0).round() as i32
        } else {
            0
        };
        Ok(QuotaStatus {
            used: quota.used,
            limit: quota.limit,
            remaining: quota.remaining(),
            reset_at: quota.reset_at,
            percent_used,
        })
    }

    /// Pass-through provider health probe.
    pub async fn provider_health(&self) -> ProviderHealth {
        self.provider.health_check().await
    }

    async fn write_audit(
        &self,
        user_id: i32,
        kind: AuditKind,
        request: &crate::request::AlertRequest,
        result: &BulkDispatchResult,
    ) -> Option<AuditReceipt> {
        match self.audit.record_dispatch(user_id, kind, request, result).await {
            Ok(receipt) => Some(receipt),
            Err(e) => {
                self.report_audit_failure(user_id, &e);
                None
            }
        }
    }

    // Messages were actually sent at this point; the failure goes to the
    // operational log and the caller sees a missing receipt, never an error.
    fn report_audit_failure(&self, user_id: i32, error: &crate::error::StoreError) {
        tracing::error!(
            name = "audit.write_failed",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            user_id,
            error = %error,
            message = "Failed to persist audit record for a completed dispatch"
        );
    }

    async fn touch_activity(&self, user_id: i32) {
        if let Err(e) = self.store.touch_user_activity(user_id).await {
            tracing::warn!(user_id, error = %e, "failed to update user activity");
        }
    }
}
