//! Dispatch engine: orchestration of recipient pipelines and aggregation of
//! their outcomes.

pub mod orchestrator;
pub mod outcome;

pub use orchestrator::DispatchOrchestrator;
pub use outcome::{BulkDispatchResult, DispatchSummary, RecipientOutcome, summarize};
