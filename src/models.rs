//! Data models for the audit aggregator.
//!
//! This module contains the core data structures passed between the
//! strategies, the router and the merger: findings, severities and the
//! shared analysis input.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Ranked severity level.
///
/// Findings carry their severity as the raw string an analyzer reported;
/// this enum only provides the ordering used when two findings are folded
/// together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Severity {
    /// Informational - best-practice or optimization notes
    Info,
    /// Low severity - edge cases, minor inefficiencies
    Low,
    /// Medium severity - disruption or partial compromise
    Medium,
    /// High severity - direct loss of funds possible
    High,
    /// Critical severity - catastrophic protocol failure
    Critical,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Info => write!(f, "Info"),
            Severity::Low => write!(f, "Low"),
            Severity::Medium => write!(f, "Medium"),
            Severity::High => write!(f, "High"),
            Severity::Critical => write!(f, "Critical"),
        }
    }
}

impl Severity {
    /// Parse a reported severity string. `Informational` is an alias for `Info`.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" | "informational" => Some(Severity::Info),
            _ => None,
        }
    }

    /// Numeric rank, 1 (Info) through 5 (Critical).
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Info => 1,
            Severity::Low => 2,
            Severity::Medium => 3,
            Severity::High => 4,
            Severity::Critical => 5,
        }
    }

    /// Rank of a raw severity string; unrecognized strings rank 0.
    pub fn rank_of(s: &str) -> u8 {
        Self::parse(s).map(|sev| sev.rank()).unwrap_or(0)
    }

    /// Returns an emoji representation of the severity.
    pub fn emoji(&self) -> &'static str {
        match self {
            Severity::Info => "🔵",
            Severity::Low => "🟢",
            Severity::Medium => "🟡",
            Severity::High => "🟠",
            Severity::Critical => "🔴",
        }
    }
}

/// A single issue reported by an analysis strategy.
///
/// Serializes to exactly `{title, description, severity, locations}`.
/// Analyzer responses may use `file_paths` in place of `locations`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Finding {
    /// Short title describing the issue.
    pub title: String,
    /// Detailed description, usually including a recommended fix.
    pub description: String,
    /// Severity exactly as reported (e.g. "High", "info").
    pub severity: String,
    /// Affected locations, typically file paths, in reported order.
    #[serde(alias = "file_paths")]
    pub locations: Vec<String>,
}

impl Finding {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        severity: impl Into<String>,
        locations: Vec<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            severity: severity.into(),
            locations,
        }
    }

    /// Rank of this finding's severity (0 when unrecognized).
    pub fn rank(&self) -> u8 {
        Severity::rank_of(&self.severity)
    }

    /// Parsed severity, if recognized.
    pub fn severity_level(&self) -> Option<Severity> {
        Severity::parse(&self.severity)
    }
}

/// Envelope analyzers are asked to respond with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Audit {
    #[serde(default)]
    pub findings: Vec<Finding>,
}

/// A question-answer pair supplied alongside the contracts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaPair {
    pub question: String,
    pub answer: String,
}

/// Input shared read-only by every strategy in a batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AuditInput {
    /// Concatenated contract sources.
    pub contracts: String,
    /// Concatenated documentation (may be empty).
    #[serde(default)]
    pub docs: String,
    /// Reference links.
    #[serde(default)]
    pub additional_links: Vec<String>,
    /// Free-text additional documentation.
    #[serde(default)]
    pub additional_docs: Option<String>,
    /// Structured Q&A pairs.
    #[serde(default)]
    pub qa_responses: Vec<QaPair>,
}

impl AuditInput {
    pub fn new(contracts: impl Into<String>) -> Self {
        Self {
            contracts: contracts.into(),
            ..Self::default()
        }
    }
}
