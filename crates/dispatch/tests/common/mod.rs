//! Shared test doubles: a recording provider and an in-memory store.

// Not every test binary uses every helper.
#![allow(dead_code)]

use alert_dispatch::error::{ProviderErrorKind, StoreError};
use alert_dispatch::provider::{MessagePart, MessageProvider, PartOutcome, ProviderHealth};
use alert_dispatch::store::{
    AlertStore, AuditReceipt, NewAuditRecord, QuotaReservation, QuotaState, UserProfile,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicI32, AtomicUsize, Ordering};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub part: MessagePart,
    pub phone_number: String,
}

/// Provider double that records every call in arrival order.
#[derive(Default)]
pub struct MockProvider {
    calls: Mutex<Vec<RecordedCall>>,
    fail_text_for: Mutex<HashSet<String>>,
    fail_location_for: Mutex<HashSet<String>>,
    next_id: AtomicUsize,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the text part fail for this (normalized) phone number.
    pub fn fail_text_for(&self, phone_number: &str) {
        self.fail_text_for
            .lock()
            .unwrap()
            .insert(phone_number.to_string());
    }

    pub fn fail_location_for(&self, phone_number: &str) {
        self.fail_location_for
            .lock()
            .unwrap()
            .insert(phone_number.to_string());
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    fn record(&self, part: MessagePart, phone_number: &str) {
        self.calls.lock().unwrap().push(RecordedCall {
            part,
            phone_number: phone_number.to_string(),
        });
    }

    fn next_message_id(&self) -> String {
        format!("wamid.{}", self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl MessageProvider for MockProvider {
    async fn send_text(&self, phone_number: &str, _body: &str) -> PartOutcome {
        self.record(MessagePart::Text, phone_number);
        if self.fail_text_for.lock().unwrap().contains(phone_number) {
            PartOutcome::failed(
                MessagePart::Text,
                ProviderErrorKind::Transient,
                "injected text failure",
            )
        } else {
            PartOutcome::sent(MessagePart::Text, self.next_message_id())
        }
    }

    async fn send_location(
        &self,
        phone_number: &str,
        _latitude: f64,
        _longitude: f64,
        _label: &str,
    ) -> PartOutcome {
        self.record(MessagePart::Location, phone_number);
        if self.fail_location_for.lock().unwrap().contains(phone_number) {
            PartOutcome::failed(
                MessagePart::Location,
                ProviderErrorKind::RateLimited,
                "injected location failure",
            )
        } else {
            PartOutcome::sent(MessagePart::Location, self.next_message_id())
        }
    }

    async fn health_check(&self) -> ProviderHealth {
        ProviderHealth {
            healthy: true,
            display_number: Some("+15550001111".to_string()),
            verified_name: Some("Test sender".to_string()),
            quality_rating: Some("GREEN".to_string()),
            error: None,
        }
    }
}

struct StoredUser {
    premium_active: bool,
    used: i32,
    limit: i32,
}

/// Store double whose quota reservation is a check-and-increment under one
/// lock, mirroring the conditional-UPDATE atomicity of the real store.
#[derive(Default)]
pub struct InMemoryStore {
    users: Mutex<HashMap<i32, StoredUser>>,
    audits: Mutex<Vec<NewAuditRecord>>,
    next_audit_id: AtomicI32,
    pub fail_audit_writes: AtomicBool,
    pub activity_touches: AtomicUsize,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_user(self, user_id: i32, premium_active: bool, used: i32, limit: i32) -> Self {
        self.users.lock().unwrap().insert(
            user_id,
            StoredUser {
                premium_active,
                used,
                limit,
            },
        );
        self
    }

    pub fn audit_count(&self) -> usize {
        self.audits.lock().unwrap().len()
    }

    pub fn audit_records(&self) -> Vec<NewAuditRecord> {
        self.audits.lock().unwrap().clone()
    }

    pub fn quota_used(&self, user_id: i32) -> i32 {
        self.users.lock().unwrap()[&user_id].used
    }
}

impl AlertStore for InMemoryStore {
    async fn get_user(&self, user_id: i32) -> Result<Option<UserProfile>, StoreError> {
        Ok(self.users.lock().unwrap().get(&user_id).map(|u| UserProfile {
            id: user_id,
            premium_active: u.premium_active,
            quota: QuotaState {
                used: u.used,
                limit: u.limit,
                reset_at: None,
            },
        }))
    }

    async fn reserve_quota(
        &self,
        user_id: i32,
        units: i32,
    ) -> Result<QuotaReservation, StoreError> {
        let mut users = self.users.lock().unwrap();
        let user = users
            .get_mut(&user_id)
            .ok_or(StoreError::UserNotFound(user_id))?;
        let allowed = user.used + units <= user.limit;
        if allowed {
            user.used += units;
        }
        Ok(QuotaReservation {
            allowed,
            state: QuotaState {
                used: user.used,
                limit: user.limit,
                reset_at: None,
            },
        })
    }

    async fn append_audit_record(
        &self,
        record: NewAuditRecord,
    ) -> Result<AuditReceipt, StoreError> {
        if self.fail_audit_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database(sea_orm::DbErr::Custom(
                "injected audit write failure".to_string(),
            )));
        }
        self.audits.lock().unwrap().push(record);
        Ok(AuditReceipt {
            id: self.next_audit_id.fetch_add(1, Ordering::SeqCst) + 1,
            created_at: OffsetDateTime::now_utc(),
        })
    }

    async fn touch_user_activity(&self, _user_id: i32) -> Result<(), StoreError> {
        self.activity_touches.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
