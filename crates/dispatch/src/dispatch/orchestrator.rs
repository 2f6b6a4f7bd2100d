//! Batched, paced execution of recipient pipelines.
//!
//! The batch/pause scheme exists to stay under the provider's implicit rate
//! limit. Pipelines inside one batch run concurrently with no ordering
//! guarantee; batches are separated by a hard barrier.

use crate::config::PacingConfig;
use crate::dispatch::outcome::RecipientOutcome;
use crate::provider::MessageProvider;
use crate::request::{AlertRequest, Recipient};
use futures::future::join_all;
use std::sync::Arc;
use tokio::time::sleep;

pub const LOCATION_LABEL: &str = "🚨 Emergency location";

pub struct DispatchOrchestrator<P> {
    provider: Arc<P>,
    pacing: PacingConfig,
}

impl<P: MessageProvider> DispatchOrchestrator<P> {
    pub fn new(provider: Arc<P>, pacing: PacingConfig) -> Self {
        Self { provider, pacing }
    }

    /// Run one pipeline per recipient, batched and paced.
    ///
    /// Returns exactly one outcome per recipient, preserving input order.
    /// Runs to completion: there is no mid-flight abort path, and a failure
    /// local to one recipient never affects the others.
    #[tracing::instrument(skip(self, request), fields(recipients = request.recipients().len()))]
    pub async fn dispatch(&self, request: &AlertRequest) -> Vec<RecipientOutcome> {
        let recipients = request.recipients();
        // chunks(0) panics; a misconfigured batch size degrades to
        // single-recipient batches instead.
        let batch_size = self.pacing.batch_size.max(1);
        let batches: Vec<&[Recipient]> = recipients.chunks(batch_size).collect();
        let batch_count = batches.len();
        let mut outcomes = Vec::with_capacity(recipients.len());

        tracing::info!(
            name = "dispatch.started",
            target = concat!(env!("CARGO_PKG_NAME"), "::", module_path!()),
            recipients = recipients.len(),
            batches = batch_count,
            has_location = request.location().is_some(),
            message = "Starting bulk dispatch"
        );

        for (index, batch) in batches.into_iter().enumerate() {
            let settled = join_all(
                batch
                    .iter()
                    .map(|recipient| self.run_pipeline(recipient, request)),
            )
            .await;
            outcomes.extend(settled);

            // Barrier: the next batch never starts before this one resolved.
            if index + 1 < batch_count {
                sleep(self.pacing.inter_batch_pause()).await;
            }
        }

        outcomes
    }

    /// Text first; location only after the text was accepted.
    async fn run_pipeline(&self, recipient: &Recipient, request: &AlertRequest) -> RecipientOutcome {
        let mut parts = Vec::with_capacity(2);

        let text = self
            .provider
            .send_text(&recipient.phone_number, request.message())
            .await;
        let text_sent = text.success;
        parts.push(text);

        // No orphan location sends: a failed text stops the pipeline.
        if text_sent && let Some(location) = request.location() {
            sleep(self.pacing.inter_message_pause()).await;
            let location_outcome = self
                .provider
                .send_location(
                    &recipient.phone_number,
                    location.latitude,
                    location.longitude,
                    LOCATION_LABEL,
                )
                .await;
            parts.push(location_outcome);
        }

        RecipientOutcome {
            phone_number: recipient.phone_number.clone(),
            parts,
        }
    }
}
