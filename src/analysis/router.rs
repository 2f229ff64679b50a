//! Strategy routing.
//!
//! The router runs every strategy concurrently over the same input, isolates
//! failures and timeouts per strategy, and merges whatever succeeded.

use crate::agent::AnalysisStrategy;
use crate::analysis::merger;
use crate::analysis::observer::{AuditObserver, TracingObserver};
use crate::cancel::CancellationToken;
use crate::error::{AnalyzerError, AuditError};
use crate::models::{AuditInput, Finding};
use futures::future::join_all;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Default per-strategy timeout in seconds.
pub const DEFAULT_STRATEGY_TIMEOUT_SECS: u64 = 600;

/// How a single strategy invocation ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeStatus {
    Succeeded { findings: usize },
    Failed(AnalyzerError),
}

/// Per-strategy record of a batch.
#[derive(Debug, Clone)]
pub struct StrategyOutcome {
    pub name: String,
    pub priority: i32,
    pub status: OutcomeStatus,
    pub elapsed: Duration,
}

impl StrategyOutcome {
    pub fn succeeded(&self) -> bool {
        matches!(self.status, OutcomeStatus::Succeeded { .. })
    }
}

/// Result of one batch.
#[derive(Debug, Clone)]
pub struct BatchReport {
    /// Merged findings.
    pub findings: Vec<Finding>,
    /// Outcomes in execution order.
    pub outcomes: Vec<StrategyOutcome>,
    /// Number of findings before merging.
    pub raw_count: usize,
    /// Wall time of the batch.
    pub duration: Duration,
}

impl BatchReport {
    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| !o.succeeded()).count()
    }
}

/// Runs a fixed set of strategies and merges their findings.
pub struct StrategyRouter {
    strategies: Vec<Box<dyn AnalysisStrategy>>,
    timeout: Duration,
    observer: Arc<dyn AuditObserver>,
}

impl StrategyRouter {
    /// Create a router. Strategies are ordered by priority, highest first;
    /// ties keep the order they were supplied in.
    pub fn new(mut strategies: Vec<Box<dyn AnalysisStrategy>>) -> Result<Self, AuditError> {
        if strategies.is_empty() {
            return Err(AuditError::NoStrategies);
        }

        strategies.sort_by_key(|s| std::cmp::Reverse(s.priority()));

        info!(
            "Initialized StrategyRouter with {} strategies",
            strategies.len()
        );
        for strategy in &strategies {
            debug!("  - {} (priority: {})", strategy.name(), strategy.priority());
        }

        Ok(Self {
            strategies,
            timeout: Duration::from_secs(DEFAULT_STRATEGY_TIMEOUT_SECS),
            observer: Arc::new(TracingObserver),
        })
    }

    /// Set the per-strategy timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the event observer.
    pub fn with_observer(mut self, observer: Arc<dyn AuditObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// Strategy names in execution order.
    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Run all strategies and return the merged findings.
    pub async fn run(
        &self,
        input: &AuditInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<Finding>, AuditError> {
        self.run_batch(input, cancel).await.map(|batch| batch.findings)
    }

    /// Run all strategies and return the merged findings with per-strategy
    /// outcomes.
    ///
    /// Strategy failures never surface here. The only error is
    /// [`AuditError::Cancelled`], returned as soon as `cancel` fires; nothing
    /// that already completed is returned in that case.
    pub async fn run_batch(
        &self,
        input: &AuditInput,
        cancel: &CancellationToken,
    ) -> Result<BatchReport, AuditError> {
        let start = Instant::now();

        let runs = self
            .strategies
            .iter()
            .map(|strategy| self.run_strategy(strategy.as_ref(), input, cancel));

        let results = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Audit batch cancelled with strategies still running");
                return Err(AuditError::Cancelled);
            }
            results = join_all(runs) => results,
        };

        if cancel.is_cancelled() {
            warn!("Audit batch cancelled");
            return Err(AuditError::Cancelled);
        }

        let mut raw = Vec::new();
        let mut outcomes = Vec::with_capacity(results.len());
        for (outcome, findings) in results {
            raw.extend(findings);
            outcomes.push(outcome);
        }

        let raw_count = raw.len();
        let findings = if raw.is_empty() {
            debug!("No findings from any strategy; skipping merge");
            Vec::new()
        } else {
            merger::merge_observed(raw, self.observer.as_ref())
        };

        let batch = BatchReport {
            findings,
            outcomes,
            raw_count,
            duration: start.elapsed(),
        };

        self.observer
            .batch_finished(raw_count, batch.findings.len(), batch.failed_count());

        Ok(batch)
    }

    async fn run_strategy(
        &self,
        strategy: &dyn AnalysisStrategy,
        input: &AuditInput,
        cancel: &CancellationToken,
    ) -> (StrategyOutcome, Vec<Finding>) {
        let name = strategy.name();
        let priority = strategy.priority();
        self.observer.strategy_started(name, priority);

        let started = Instant::now();
        let result = match tokio::time::timeout(self.timeout, strategy.analyze(input, cancel)).await
        {
            Ok(result) => result,
            Err(_) => Err(AnalyzerError::TimedOut {
                after: self.timeout,
            }),
        };
        let elapsed = started.elapsed();

        let (status, findings) = match result {
            Ok(findings) => {
                self.observer
                    .strategy_finished(name, findings.len(), elapsed);
                (
                    OutcomeStatus::Succeeded {
                        findings: findings.len(),
                    },
                    findings,
                )
            }
            Err(e) => {
                self.observer.strategy_failed(name, &e, elapsed);
                (OutcomeStatus::Failed(e), Vec::new())
            }
        };

        let outcome = StrategyOutcome {
            name: name.to_string(),
            priority,
            status,
            elapsed,
        };

        (outcome, findings)
    }
}
