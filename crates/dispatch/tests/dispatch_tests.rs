//! Orchestrator-level tests: batching, pacing barriers, pipeline ordering.

mod common;

use alert_dispatch::config::PacingConfig;
use alert_dispatch::dispatch::DispatchOrchestrator;
use alert_dispatch::provider::MessagePart;
use alert_dispatch::request::{AlertInput, AlertRequest, GeoLocation, Recipient};
use common::MockProvider;
use std::sync::Arc;
use time::macros::datetime;

fn fast_pacing(batch_size: usize) -> PacingConfig {
    PacingConfig {
        batch_size,
        inter_message_pause_ms: 1,
        inter_batch_pause_ms: 5,
    }
}

fn request(count: usize, location: Option<GeoLocation>) -> AlertRequest {
    let recipients = (1..=count)
        .map(|i| Recipient {
            display_name: format!("Contact {i}"),
            phone_number: format!("+34600000{i:03}"),
        })
        .collect();
    AlertInput {
        message: Some("Help".to_string()),
        recipients,
        location,
        timestamp: Some(datetime!(2025-06-01 12:00:00 UTC)),
    }
    .normalize()
    .unwrap()
}

fn location() -> Option<GeoLocation> {
    Some(GeoLocation {
        latitude: 37.0,
        longitude: -1.0,
    })
}

#[tokio::test]
async fn one_outcome_per_recipient_in_input_order() {
    let provider = Arc::new(MockProvider::new());
    provider.fail_text_for("+34600000002");
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    let request = request(3, None);
    let outcomes = orchestrator.dispatch(&request).await;

    assert_eq!(outcomes.len(), 3);
    let phones: Vec<&str> = outcomes.iter().map(|o| o.phone_number.as_str()).collect();
    assert_eq!(
        phones,
        vec!["+34600000001", "+34600000002", "+34600000003"]
    );
    assert!(outcomes[0].success());
    assert!(!outcomes[1].success());
    assert!(outcomes[2].success());
}

#[tokio::test]
async fn no_location_parts_when_request_has_no_location() {
    let provider = Arc::new(MockProvider::new());
    provider.fail_text_for("+34600000001");
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    let outcomes = orchestrator.dispatch(&request(2, None)).await;

    for outcome in &outcomes {
        assert!(
            outcome
                .parts
                .iter()
                .all(|p| p.part == MessagePart::Text)
        );
    }
    assert_eq!(provider.call_count(), 2);
}

#[tokio::test]
async fn failed_text_suppresses_the_location_send() {
    let provider = Arc::new(MockProvider::new());
    provider.fail_text_for("+34600000001");
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    let outcomes = orchestrator.dispatch(&request(2, location())).await;

    // Failed pipeline: text only. Succeeding pipeline: text then location.
    assert_eq!(outcomes[0].parts.len(), 1);
    assert_eq!(outcomes[0].parts[0].part, MessagePart::Text);
    assert_eq!(outcomes[1].parts.len(), 2);
    assert_eq!(outcomes[1].parts[1].part, MessagePart::Location);

    // No orphan location call reached the provider for the failed recipient.
    let location_calls: Vec<_> = provider
        .calls()
        .into_iter()
        .filter(|c| c.part == MessagePart::Location)
        .collect();
    assert_eq!(location_calls.len(), 1);
    assert_eq!(location_calls[0].phone_number, "+34600000002");
}

#[tokio::test]
async fn seven_recipients_split_into_batches_of_3_3_1() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    let request = request(7, None);
    let outcomes = orchestrator.dispatch(&request).await;
    assert_eq!(outcomes.len(), 7);

    // The barrier means every batch-1 call resolves before any batch-2 call
    // is issued, so the recorded call log is grouped by batch.
    let calls = provider.calls();
    assert_eq!(calls.len(), 7);
    let batch_of = |phone: &str| -> usize {
        let index = request
            .recipients()
            .iter()
            .position(|r| r.phone_number == phone)
            .unwrap();
        index / 3
    };
    let batches: Vec<usize> = calls.iter().map(|c| batch_of(&c.phone_number)).collect();
    assert_eq!(&batches[0..3], &[0, 0, 0]);
    assert_eq!(&batches[3..6], &[1, 1, 1]);
    assert_eq!(&batches[6..], &[2]);
}

#[tokio::test]
async fn text_always_precedes_location_within_a_pipeline() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    orchestrator.dispatch(&request(3, location())).await;

    let calls = provider.calls();
    for recipient in ["+34600000001", "+34600000002", "+34600000003"] {
        let text_pos = calls
            .iter()
            .position(|c| c.phone_number == recipient && c.part == MessagePart::Text)
            .unwrap();
        let location_pos = calls
            .iter()
            .position(|c| c.phone_number == recipient && c.part == MessagePart::Location)
            .unwrap();
        assert!(text_pos < location_pos);
    }
}

#[tokio::test]
async fn zero_batch_size_degrades_to_single_recipient_batches() {
    let provider = Arc::new(MockProvider::new());
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(0));

    let outcomes = orchestrator.dispatch(&request(2, None)).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(provider.call_count(), 2);
    assert!(outcomes.iter().all(|o| o.success()));
}

#[tokio::test]
async fn location_failure_marks_recipient_failed_but_keeps_both_parts() {
    let provider = Arc::new(MockProvider::new());
    provider.fail_location_for("+34600000001");
    let orchestrator = DispatchOrchestrator::new(provider.clone(), fast_pacing(3));

    let outcomes = orchestrator.dispatch(&request(1, location())).await;

    assert_eq!(outcomes[0].parts.len(), 2);
    assert!(outcomes[0].parts[0].success);
    assert!(!outcomes[0].parts[1].success);
    assert!(!outcomes[0].success());
}
