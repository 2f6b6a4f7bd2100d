//! Quota reservation against the per-user message-unit budget.
//!
//! The ledger reserves the same `units_needed` computed by the normalizer
//! (one unit per message part), so the pre-check cost and the reserved cost
//! always agree. Atomicity lives in the store: check and increment are one
//! storage-level operation.

use crate::error::StoreError;
use crate::store::{AlertStore, QuotaReservation};
use std::sync::Arc;

pub struct QuotaLedger<S> {
    store: Arc<S>,
}

impl<S: AlertStore> QuotaLedger<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Reserve `units` for `user_id`. Allowed iff `used + units <= limit`;
    /// on denial nothing is mutated and the current state is returned so the
    /// caller can report remaining budget.
    #[tracing::instrument(skip(self))]
    pub async fn reserve(&self, user_id: i32, units: i32) -> Result<QuotaReservation, StoreError> {
        let reservation = self.store.reserve_quota(user_id, units).await?;
        if reservation.allowed {
            tracing::debug!(
                user_id,
                units,
                used = reservation.state.used,
                limit = reservation.state.limit,
                "quota reserved"
            );
        } else {
            tracing::warn!(
                name = "quota.reservation_denied",
                target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
                user_id,
                units,
                used = reservation.state.used,
                limit = reservation.state.limit,
                message = "Quota reservation denied"
            );
        }
        Ok(reservation)
    }
}
