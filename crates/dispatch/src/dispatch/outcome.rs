//! Per-recipient outcomes and their aggregation into a dispatch summary.

use crate::provider::PartOutcome;
use serde::{Deserialize, Serialize};

/// Everything that happened for a single recipient: the text part, and the
/// location part when one was attempted. Success is the AND of all attempted
/// parts — a recipient whose text failed never has a location part.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipientOutcome {
    pub phone_number: String,
    pub parts: Vec<PartOutcome>,
}

impl RecipientOutcome {
    pub fn success(&self) -> bool {
        !self.parts.is_empty() && self.parts.iter().all(|p| p.success)
    }

    /// Provider ids of the successfully sent parts, in pipeline order.
    pub fn provider_message_ids(&self) -> impl Iterator<Item = &str> {
        self.parts
            .iter()
            .filter_map(|p| p.provider_message_id.as_deref())
    }

    /// First error of the pipeline, if any part failed.
    pub fn first_error(&self) -> Option<&PartOutcome> {
        self.parts.iter().find(|p| !p.success)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DispatchSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Rounded to one decimal place.
    pub success_rate_percent: f64,
}

/// Aggregate result of one bulk dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct BulkDispatchResult {
    pub recipient_outcomes: Vec<RecipientOutcome>,
    pub summary: DispatchSummary,
    /// True when at least one recipient pipeline fully succeeded, even amid
    /// partial failures.
    pub overall_success: bool,
}

impl BulkDispatchResult {
    pub fn from_outcomes(recipient_outcomes: Vec<RecipientOutcome>) -> Self {
        let summary = summarize(&recipient_outcomes);
        let overall_success = summary.successful > 0;
        Self {
            recipient_outcomes,
            summary,
            overall_success,
        }
    }

    /// Joined provider message ids across all recipients, audit-record form.
    pub fn joined_message_ids(&self) -> Option<String> {
        let ids: Vec<&str> = self
            .recipient_outcomes
            .iter()
            .flat_map(|o| o.provider_message_ids())
            .collect();
        (!ids.is_empty()).then(|| ids.join(","))
    }

    /// Serialized detail of the failing pipelines, for the audit error field.
    pub fn failure_detail(&self) -> Option<String> {
        let failures: Vec<&RecipientOutcome> = self
            .recipient_outcomes
            .iter()
            .filter(|o| !o.success())
            .collect();
        if failures.is_empty() {
            return None;
        }
        serde_json::to_string(&failures).ok()
    }
}

/// Fold per-recipient outcomes into counts and a success rate.
pub fn summarize(outcomes: &[RecipientOutcome]) -> DispatchSummary {
    let total = outcomes.len();
    let successful = outcomes.iter().filter(|o| o.success()).count();
    let failed = total - successful;
    let success_rate_percent = if total == 0 {
        0.0
    } else {
        round_one_decimal(successful as f64 / total as f64 * 100.0)
    };
    DispatchSummary {
        total,
        successful,
        failed,
        success_rate_percent,
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ProviderErrorKind;
    use crate::provider::{MessagePart, PartOutcome};

    fn ok(phone: &str, parts: usize) -> RecipientOutcome {
        let mut outcome = RecipientOutcome {
            phone_number: phone.to_string(),
            parts: vec![PartOutcome::sent(MessagePart::Text, "wamid.1".into())],
        };
        if parts > 1 {
            outcome
                .parts
                .push(PartOutcome::sent(MessagePart::Location, "wamid.2".into()));
        }
        outcome
    }

    fn failed(phone: &str) -> RecipientOutcome {
        RecipientOutcome {
            phone_number: phone.to_string(),
            parts: vec![PartOutcome::failed(
                MessagePart::Text,
                ProviderErrorKind::Transient,
                "timeout",
            )],
        }
    }

    #[test]
    fn two_of_three_rounds_to_66_7() {
        let summary = summarize(&[ok("+1", 1), ok("+2", 1), failed("+3")]);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.successful, 2);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.success_rate_percent, 66.7);
    }

    #[test]
    fn partial_failure_still_reports_overall_success() {
        let result = BulkDispatchResult::from_outcomes(vec![ok("+1", 1), ok("+2", 1), failed("+3")]);
        assert!(result.overall_success);
    }

    #[test]
    fn all_failed_reports_overall_failure() {
        let result = BulkDispatchResult::from_outcomes(vec![failed("+1"), failed("+2")]);
        assert!(!result.overall_success);
        assert_eq!(result.summary.success_rate_percent, 0.0);
        assert!(result.joined_message_ids().is_none());
    }

    #[test]
    fn recipient_success_requires_every_attempted_part() {
        let mut outcome = ok("+1", 2);
        assert!(outcome.success());
        outcome.parts[1] = PartOutcome::failed(
            MessagePart::Location,
            ProviderErrorKind::RateLimited,
            "throttled",
        );
        assert!(!outcome.success());
        assert_eq!(
            outcome.first_error().and_then(|p| p.error),
            Some(ProviderErrorKind::RateLimited)
        );
    }

    #[test]
    fn message_ids_join_in_pipeline_order() {
        let result = BulkDispatchResult::from_outcomes(vec![ok("+1", 2), ok("+2", 1)]);
        assert_eq!(
            result.joined_message_ids().as_deref(),
            Some("wamid.1,wamid.2,wamid.1")
        );
    }

    #[test]
    fn failure_detail_lists_only_failing_recipients() {
        let result = BulkDispatchResult::from_outcomes(vec![ok("+1", 1), failed("+2")]);
        let detail = result.failure_detail().unwrap();
        assert!(detail.contains("+2"));
        assert!(!detail.contains("\"+1\""));
    }
}
