//! Result aggregation.
//!
//! The router fans strategies out over one input; the merger collapses
//! their overlapping findings.

pub mod merger;
pub mod observer;
pub mod router;
pub mod stats;

pub use observer::{AuditObserver, NoopObserver, TracingObserver};
pub use router::{BatchReport, OutcomeStatus, StrategyOutcome, StrategyRouter};
pub use stats::FindingSummary;
