//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation. Options that also exist in the configuration
//! file are `Option`s so that an omitted flag leaves the file's value alone.

use crate::models::Severity;
use clap::Parser;
use std::path::PathBuf;

/// auditmesh - multi-strategy LLM auditor for smart contracts
///
/// Runs several focused audit strategies (general, reentrancy, flash loan,
/// access control) against the same contracts and merges their findings.
///
/// Examples:
///   auditmesh --contracts ./contracts
///   auditmesh --contracts ./src --docs README.md,docs/spec.md --format markdown
///   auditmesh --contracts ./src --strategies general,reentrancy --fail-on high
///   auditmesh --contracts ./src --dry-run
///   auditmesh --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Directory containing the contracts to audit
    #[arg(long, value_name = "DIR", required_unless_present = "init_config")]
    pub contracts: Option<PathBuf>,

    /// Documentation files to include (comma-separated)
    #[arg(long, value_name = "FILES", value_delimiter = ',')]
    pub docs: Vec<PathBuf>,

    /// Reference links to include (comma-separated)
    #[arg(long, value_name = "URLS", value_delimiter = ',')]
    pub links: Vec<String>,

    /// File with additional free-text documentation
    #[arg(long, value_name = "FILE")]
    pub additional_docs: Option<PathBuf>,

    /// JSON file with question/answer pairs
    ///
    /// Format: [{"question": "...", "answer": "..."}]
    #[arg(long, value_name = "FILE")]
    pub qa: Option<PathBuf>,

    /// Strategies to run (comma-separated)
    ///
    /// Available: general, reentrancy, flash_loan, access_control
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub strategies: Option<Vec<String>>,

    /// Ollama model to use for analysis
    #[arg(short, long, env = "AUDITMESH_MODEL")]
    pub model: Option<String>,

    /// Ollama API endpoint URL
    #[arg(long, env = "OLLAMA_URL")]
    pub ollama_url: Option<String>,

    /// Temperature for LLM responses (0.0 - 1.0)
    #[arg(long)]
    pub temperature: Option<f32>,

    /// Per-strategy timeout in seconds
    ///
    /// A strategy exceeding it contributes no findings; the others still run.
    #[arg(long, value_name = "SECS")]
    pub timeout: Option<u64>,

    /// Output file path for the report
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format (json, markdown)
    #[arg(long, default_value = "json", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Path to configuration file
    ///
    /// If not specified, looks for .auditmesh.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Contract file extensions to include (comma-separated)
    #[arg(long, value_name = "EXTS", value_delimiter = ',')]
    pub extensions: Option<Vec<String>>,

    /// Directory or file names to exclude (comma-separated)
    #[arg(long, value_name = "NAMES", value_delimiter = ',')]
    pub exclude: Option<Vec<String>>,

    /// Maximum number of contract files to include
    #[arg(long, value_name = "COUNT")]
    pub max_files: Option<usize>,

    /// Minimum severity to include in the report
    #[arg(long, value_name = "LEVEL")]
    pub min_severity: Option<SeverityLevel>,

    /// Fail if findings at or above this severity are found
    ///
    /// Useful for CI pipelines. Exit code 2 when the threshold is met.
    #[arg(long, value_name = "LEVEL")]
    pub fail_on: Option<SeverityLevel>,

    /// Dry run: list contracts and strategies without calling the LLM
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .auditmesh.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for the report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// JSON array of findings (default)
    #[default]
    Json,
    /// Markdown report
    Markdown,
}

/// Severity level for --fail-on and --min-severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, clap::ValueEnum)]
pub enum SeverityLevel {
    Info,
    Low,
    Medium,
    High,
    Critical,
}

impl From<SeverityLevel> for Severity {
    fn from(level: SeverityLevel) -> Self {
        match level {
            SeverityLevel::Info => Severity::Info,
            SeverityLevel::Low => Severity::Low,
            SeverityLevel::Medium => Severity::Medium,
            SeverityLevel::High => Severity::High,
            SeverityLevel::Critical => Severity::Critical,
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        match self.contracts {
            Some(ref dir) if !dir.exists() => {
                return Err(format!("Contracts directory does not exist: {}", dir.display()));
            }
            Some(ref dir) if !dir.is_dir() => {
                return Err(format!("Contracts path is not a directory: {}", dir.display()));
            }
            Some(_) => {}
            None => return Err("--contracts is required".to_string()),
        }

        if let Some(ref url) = self.ollama_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Ollama URL must start with 'http://' or 'https://'".to_string());
            }
        }

        if let Some(temperature) = self.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err("Temperature must be between 0.0 and 1.0".to_string());
            }
        }

        if self.timeout == Some(0) {
            return Err("Timeout must be at least 1 second".to_string());
        }

        if self.max_files == Some(0) {
            return Err("Max files must be at least 1".to_string());
        }

        if let Some(ref strategies) = self.strategies {
            if strategies.iter().all(|s| s.trim().is_empty()) {
                return Err("--strategies needs at least one strategy name".to_string());
            }
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `[general] verbose` from the configuration file;
    /// `--quiet` still wins over it.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
