//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.auditmesh.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".auditmesh.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Model settings.
    #[serde(default)]
    pub model: ModelConfig,

    /// Strategy selection and limits.
    #[serde(default)]
    pub strategies: StrategiesConfig,

    /// Scanner settings.
    #[serde(default)]
    pub scanner: ScannerConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Default output file path.
    #[serde(default = "default_output")]
    pub output: String,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            output: default_output(),
            verbose: false,
        }
    }
}

fn default_output() -> String {
    "audit_findings.json".to_string()
}

/// LLM model settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name.
    #[serde(default = "default_model")]
    pub name: String,

    /// Ollama API URL.
    #[serde(default = "default_ollama_url")]
    pub ollama_url: String,

    /// Temperature for generation.
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// HTTP request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            name: default_model(),
            ollama_url: default_ollama_url(),
            temperature: default_temperature(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_model() -> String {
    "llama3.2:latest".to_string()
}

fn default_ollama_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_temperature() -> f32 {
    0.1
}

fn default_timeout() -> u64 {
    600
}

/// Strategy settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategiesConfig {
    /// Names of the strategies to run.
    #[serde(default = "default_enabled")]
    pub enabled: Vec<String>,

    /// Per-strategy timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for StrategiesConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_enabled() -> Vec<String> {
    vec!["general", "reentrancy", "flash_loan", "access_control"]
        .into_iter()
        .map(String::from)
        .collect()
}

/// Contract scanner settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScannerConfig {
    /// Maximum files to include.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    /// File extensions to include.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,

    /// Names to exclude.
    #[serde(default = "default_excludes")]
    pub excludes: Vec<String>,

    /// Maximum file size in bytes.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            max_files: default_max_files(),
            extensions: default_extensions(),
            excludes: default_excludes(),
            max_file_size: default_max_file_size(),
        }
    }
}

fn default_max_files() -> usize {
    200
}

fn default_extensions() -> Vec<String> {
    vec!["sol".to_string()]
}

fn default_excludes() -> Vec<String> {
    vec![
        ".git",
        "node_modules",
        "lib",
        "out",
        "cache",
        "artifacts",
        "target",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

fn default_max_file_size() -> u64 {
    1024 * 1024 // 1MB
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the current directory.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings, but only
    /// when they were given explicitly.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref model) = args.model {
            self.model.name = model.clone();
        }
        if let Some(ref url) = args.ollama_url {
            self.model.ollama_url = url.clone();
        }
        if let Some(temperature) = args.temperature {
            self.model.temperature = temperature;
        }

        // The per-strategy timeout also bounds each HTTP request.
        if let Some(timeout) = args.timeout {
            self.strategies.timeout_seconds = timeout;
            self.model.timeout_seconds = timeout;
        }

        if let Some(ref strategies) = args.strategies {
            self.strategies.enabled = strategies.clone();
        }

        if let Some(ref extensions) = args.extensions {
            self.scanner.extensions = extensions.clone();
        }
        if let Some(ref excludes) = args.exclude {
            self.scanner.excludes = excludes.clone();
        }
        if let Some(max_files) = args.max_files {
            self.scanner.max_files = max_files;
        }

        if let Some(ref output) = args.output {
            self.general.output = output.display().to_string();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
