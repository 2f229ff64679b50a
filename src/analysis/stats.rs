//! Finding statistics and filtering.
//!
//! Helpers used by the report generator and the CLI thresholds.

use crate::models::{Finding, Severity};
use std::collections::BTreeMap;

/// Severity counts for a set of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FindingSummary {
    pub total: usize,
    pub critical: usize,
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub info: usize,
    /// Findings whose severity string was not recognized.
    pub unranked: usize,
}

impl FindingSummary {
    pub fn from_findings(findings: &[Finding]) -> Self {
        let mut summary = Self {
            total: findings.len(),
            ..Self::default()
        };

        for finding in findings {
            match finding.severity_level() {
                Some(Severity::Critical) => summary.critical += 1,
                Some(Severity::High) => summary.high += 1,
                Some(Severity::Medium) => summary.medium += 1,
                Some(Severity::Low) => summary.low += 1,
                Some(Severity::Info) => summary.info += 1,
                None => summary.unranked += 1,
            }
        }

        summary
    }
}

/// Sort findings by severity rank, highest first. Stable.
pub fn sort_by_severity(findings: &mut [Finding]) {
    findings.sort_by_key(|f| std::cmp::Reverse(f.rank()));
}

/// Keep only findings ranked at or above `min`. Unranked findings are dropped.
pub fn filter_min_severity(findings: Vec<Finding>, min: Severity) -> Vec<Finding> {
    findings
        .into_iter()
        .filter(|f| f.rank() >= min.rank())
        .collect()
}

/// True if any finding ranks at or above `threshold`.
pub fn any_at_or_above(findings: &[Finding], threshold: Severity) -> bool {
    findings.iter().any(|f| f.rank() >= threshold.rank())
}

/// Count findings per location. A finding counts once for each location.
pub fn findings_per_location(findings: &[Finding]) -> BTreeMap<String, usize> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();

    for finding in findings {
        for location in &finding.locations {
            *counts.entry(location.clone()).or_default() += 1;
        }
    }

    counts
}

/// The `n` locations with the most findings, most first.
pub fn most_affected_locations(findings: &[Finding], n: usize) -> Vec<(String, usize)> {
    let mut locations: Vec<_> = findings_per_location(findings).into_iter().collect();
    locations.sort_by_key(|(_, count)| std::cmp::Reverse(*count));
    locations.truncate(n);
    locations
}
