//! Structured batch events.
//!
//! The router and merger report what they do through an [`AuditObserver`]
//! handed to them at construction instead of logging directly. The default
//! [`TracingObserver`] turns each event into a `tracing` record.

use crate::error::AnalyzerError;
use crate::models::Finding;
use std::time::Duration;
use tracing::{debug, error, info};

/// Receives events from a batch. Every method defaults to a no-op.
pub trait AuditObserver: Send + Sync {
    /// A strategy invocation is starting.
    fn strategy_started(&self, _name: &str, _priority: i32) {}

    /// A strategy returned findings.
    fn strategy_finished(&self, _name: &str, _findings: usize, _elapsed: Duration) {}

    /// A strategy failed and contributes nothing.
    fn strategy_failed(&self, _name: &str, _error: &AnalyzerError, _elapsed: Duration) {}

    /// The merger is about to scan `count` findings.
    fn merge_started(&self, _count: usize) {}

    /// `absorbed` was folded into cluster `cluster`, producing `representative`.
    fn findings_merged(&self, _cluster: usize, _absorbed: &Finding, _representative: &Finding) {}

    /// The merger reduced `input` findings to `output`.
    fn merge_finished(&self, _input: usize, _output: usize) {}

    /// A batch completed.
    fn batch_finished(&self, _raw: usize, _merged: usize, _failed: usize) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl AuditObserver for NoopObserver {}

/// Observer that emits `tracing` events with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl AuditObserver for TracingObserver {
    fn strategy_started(&self, name: &str, priority: i32) {
        info!(strategy = name, priority, "Executing strategy {}", name);
    }

    fn strategy_finished(&self, name: &str, findings: usize, elapsed: Duration) {
        info!(
            strategy = name,
            findings,
            elapsed_ms = elapsed.as_millis() as u64,
            "Strategy {} found {} findings",
            name,
            findings
        );
    }

    fn strategy_failed(&self, name: &str, error: &AnalyzerError, elapsed: Duration) {
        error!(
            strategy = name,
            error = %error,
            elapsed_ms = elapsed.as_millis() as u64,
            "Strategy {} failed: {}",
            name,
            error
        );
    }

    fn merge_started(&self, count: usize) {
        info!(findings = count, "Merging {} findings", count);
    }

    fn findings_merged(&self, cluster: usize, absorbed: &Finding, representative: &Finding) {
        debug!(
            cluster,
            absorbed = %truncate(&absorbed.title, 50),
            representative = %truncate(&representative.title, 50),
            "Merged duplicate finding into cluster {}",
            cluster
        );
    }

    fn merge_finished(&self, input: usize, output: usize) {
        info!(
            input,
            output,
            "Merged {} findings into {} unique findings",
            input,
            output
        );
    }

    fn batch_finished(&self, raw: usize, merged: usize, failed: usize) {
        info!(
            raw,
            merged,
            failed_strategies = failed,
            "Batch complete: {} raw findings, {} after merging",
            raw,
            merged
        );
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}
