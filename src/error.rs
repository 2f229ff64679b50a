//! Error types.
//!
//! Only [`AuditError`] ever reaches the caller of a batch. [`AnalyzerError`]
//! describes why a single strategy produced nothing; the router records it
//! and carries on.

use std::time::Duration;
use thiserror::Error;

/// Errors that abort a whole batch.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuditError {
    /// The router was built without any strategies.
    #[error("no analysis strategies were supplied")]
    NoStrategies,

    /// The caller cancelled the batch before every strategy settled.
    #[error("audit batch was cancelled")]
    Cancelled,
}

/// Why one strategy contributed zero findings.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AnalyzerError {
    #[error("timed out after {after:?}")]
    TimedOut { after: Duration },

    #[error("request failed: {0}")]
    Request(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error("invalid response: {0}")]
    InvalidResponse(String),

    #[error("cancelled")]
    Cancelled,
}
