//! JSON and Markdown report generation.
//!
//! The JSON report is the output contract: an array of findings, each with
//! exactly `title`, `description`, `severity` and `locations`. The Markdown
//! report adds batch metadata and per-strategy outcomes for humans.

use crate::analysis::stats::{most_affected_locations, sort_by_severity, FindingSummary};
use crate::analysis::{OutcomeStatus, StrategyOutcome};
use crate::models::{Finding, Severity};
use anyhow::Result;
use chrono::{DateTime, Utc};

/// Metadata about one audit run.
#[derive(Debug, Clone)]
pub struct ReportMetadata {
    /// Directory the contracts were read from.
    pub contracts_path: String,
    /// Date and time of the analysis.
    pub analysis_date: DateTime<Utc>,
    /// Name of the LLM model used.
    pub model_used: String,
    /// Number of contract files included.
    pub files_analyzed: usize,
    /// Findings before merging.
    pub raw_findings: usize,
    /// Duration of the batch in seconds.
    pub duration_seconds: f64,
}

/// Everything the Markdown report shows.
#[derive(Debug, Clone)]
pub struct AuditReport {
    pub metadata: ReportMetadata,
    pub outcomes: Vec<StrategyOutcome>,
    pub findings: Vec<Finding>,
    pub summary: FindingSummary,
}

/// Serialize findings as the JSON output contract.
pub fn generate_json_report(findings: &[Finding]) -> Result<String> {
    serde_json::to_string_pretty(findings).map_err(Into::into)
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &AuditReport) -> String {
    let mut output = String::new();

    output.push_str("# auditmesh Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, &report.summary));
    output.push_str(&generate_strategies_section(&report.outcomes));
    output.push_str(&generate_summary_section(&report.summary, &report.findings));
    output.push_str(&generate_findings_section(&report.findings));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata, summary: &FindingSummary) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Contracts:** `{}`\n", metadata.contracts_path));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.analysis_date.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model_used));
    section.push_str(&format!("- **Files Analyzed:** {}\n", metadata.files_analyzed));
    section.push_str(&format!(
        "- **Findings:** {} ({} before merging)\n",
        summary.total, metadata.raw_findings
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_strategies_section(outcomes: &[StrategyOutcome]) -> String {
    let mut section = String::new();

    section.push_str("## Strategies\n\n");
    section.push_str("| Strategy | Priority | Status | Findings | Time |\n");
    section.push_str("|:---|:---:|:---|:---:|:---:|\n");

    for outcome in outcomes {
        let (status, findings) = match &outcome.status {
            OutcomeStatus::Succeeded { findings } => ("✅ ok".to_string(), findings.to_string()),
            OutcomeStatus::Failed(e) => (format!("❌ {}", e), "-".to_string()),
        };
        section.push_str(&format!(
            "| {} | {} | {} | {} | {:.1}s |\n",
            outcome.name,
            outcome.priority,
            status,
            findings,
            outcome.elapsed.as_secs_f64()
        ));
    }
    section.push('\n');

    section
}

fn generate_summary_section(summary: &FindingSummary, findings: &[Finding]) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str(&format!(
        "| {} Critical | {} High | {} Medium | {} Low | {} Info | **Total** |\n",
        Severity::Critical.emoji(),
        Severity::High.emoji(),
        Severity::Medium.emoji(),
        Severity::Low.emoji(),
        Severity::Info.emoji(),
    ));
    section.push_str("|:---:|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} | {} | {} | {} | {} | **{}** |\n\n",
        summary.critical, summary.high, summary.medium, summary.low, summary.info, summary.total
    ));

    if summary.unranked > 0 {
        section.push_str(&format!(
            "{} finding(s) reported an unrecognized severity.\n\n",
            summary.unranked
        ));
    }

    let affected = most_affected_locations(findings, 5);
    if !affected.is_empty() {
        section.push_str("### Most Affected Files\n\n");
        section.push_str("| File | Findings |\n");
        section.push_str("|:---|:---:|\n");

        for (location, count) in affected {
            section.push_str(&format!("| `{}` | {} |\n", location, count));
        }
        section.push('\n');
    }

    section
}

fn generate_findings_section(findings: &[Finding]) -> String {
    let mut section = String::new();

    section.push_str("## Findings\n\n");

    if findings.is_empty() {
        section.push_str("No findings were reported.\n\n");
        return section;
    }

    let mut ordered = findings.to_vec();
    sort_by_severity(&mut ordered);

    for (i, finding) in ordered.iter().enumerate() {
        section.push_str(&generate_finding_block(i + 1, finding));
    }

    section
}

fn generate_finding_block(number: usize, finding: &Finding) -> String {
    let mut block = String::new();

    let badge = match finding.severity_level() {
        Some(level) => format!("{} **{}**", level.emoji(), level.to_string().to_uppercase()),
        None => format!("⚪ **{}**", finding.severity.trim()),
    };

    block.push_str(&format!("### {}. {} {}\n\n", number, badge, finding.title));

    if !finding.locations.is_empty() {
        let locations: Vec<String> = finding
            .locations
            .iter()
            .map(|l| format!("`{}`", l))
            .collect();
        block.push_str(&format!("**Locations:** {}\n\n", locations.join(", ")));
    }

    if !finding.description.is_empty() {
        block.push_str(&finding.description);
        block.push_str("\n\n");
    }

    block.push_str("---\n\n");

    block
}

fn generate_footer() -> String {
    "*Report generated by auditmesh*\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AnalyzerError;
    use std::time::Duration;

    fn create_test_findings() -> Vec<Finding> {
        vec![
            Finding::new(
                "Gas Optimization",
                "Cache the array length.",
                "Info",
                vec!["Bank.sol".to_string()],
            ),
            Finding::new(
                "Reentrancy in withdraw",
                "Balance is updated after the external call.",
                "High",
                vec!["Bank.sol".to_string(), "Vault.sol".to_string()],
            ),
        ]
    }

    fn create_test_report() -> AuditReport {
        let findings = create_test_findings();
        AuditReport {
            metadata: ReportMetadata {
                contracts_path: "./contracts".to_string(),
                analysis_date: Utc::now(),
                model_used: "test-model".to_string(),
                files_analyzed: 3,
                raw_findings: 4,
                duration_seconds: 12.5,
            },
            outcomes: vec![
                StrategyOutcome {
                    name: "general".to_string(),
                    priority: 100,
                    status: OutcomeStatus::Succeeded { findings: 4 },
                    elapsed: Duration::from_secs(10),
                },
                StrategyOutcome {
                    name: "flash_loan".to_string(),
                    priority: 70,
                    status: OutcomeStatus::Failed(AnalyzerError::TimedOut {
                        after: Duration::from_secs(600),
                    }),
                    elapsed: Duration::from_secs(600),
                },
            ],
            summary: FindingSummary::from_findings(&findings),
            findings,
        }
    }

    #[test]
    fn test_generate_json_report_has_exact_fields() {
        let json = generate_json_report(&create_test_findings()).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 2);
        for item in items {
            let obj = item.as_object().unwrap();
            assert_eq!(obj.len(), 4);
            for key in ["title", "description", "severity", "locations"] {
                assert!(obj.contains_key(key), "missing {}", key);
            }
        }
    }

    #[test]
    fn test_generate_json_report_empty() {
        assert_eq!(generate_json_report(&[]).unwrap(), "[]");
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# auditmesh Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("## Strategies"));
        assert!(markdown.contains("| flash_loan | 70 | ❌ timed out after 600s |"));
        assert!(markdown.contains("2 (4 before merging)"));
        assert!(markdown.contains("`Bank.sol`"));
    }

    #[test]
    fn test_findings_ordered_by_severity() {
        let markdown = generate_markdown_report(&create_test_report());
        let high = markdown.find("Reentrancy in withdraw").unwrap();
        let info = markdown.find("Gas Optimization").unwrap();
        assert!(high < info);
        assert!(markdown.contains("**HIGH** Reentrancy in withdraw"));
    }

    #[test]
    fn test_unrecognized_severity_badge() {
        let finding = Finding::new("Odd", "desc", "Severe", vec![]);
        let block = generate_finding_block(1, &finding);
        assert!(block.contains("**Severe** Odd"));
        assert!(!block.contains("**Locations:**"));
    }

    #[test]
    fn test_no_findings_message() {
        let section = generate_findings_section(&[]);
        assert!(section.contains("No findings were reported."));
    }
}
