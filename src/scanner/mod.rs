//! Input assembly from a local directory.
//!
//! The scanner discovers contract files under a root directory and
//! concatenates them, each preceded by a `// <path>` header, into the single
//! text blob strategies receive.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Configuration for file scanning.
#[derive(Debug, Clone)]
pub struct ScanConfig {
    /// File extensions to include (e.g., ["sol"])
    pub extensions: Vec<String>,
    /// Directory or file names to skip (e.g., ["node_modules", "lib"])
    pub excludes: Vec<String>,
    /// Maximum file size in bytes
    pub max_file_size: u64,
    /// Maximum number of files to include
    pub max_files: Option<usize>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: vec!["sol".to_string()],
            excludes: vec![
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
            .collect(),
            max_file_size: 1024 * 1024,
            max_files: None,
        }
    }
}

impl From<&crate::config::ScannerConfig> for ScanConfig {
    fn from(config: &crate::config::ScannerConfig) -> Self {
        Self {
            extensions: config.extensions.clone(),
            excludes: config.excludes.clone(),
            max_file_size: config.max_file_size,
            max_files: Some(config.max_files),
        }
    }
}

/// Scanned file information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    /// Path relative to the scan root, `/`-separated
    pub path: String,
    /// File size in bytes
    pub size: u64,
}

/// File scanner for discovering contract files.
pub struct FileScanner {
    config: ScanConfig,
    root: PathBuf,
}

impl FileScanner {
    /// Create a new file scanner.
    pub fn new(root: PathBuf, config: ScanConfig) -> Self {
        Self { config, root }
    }

    /// Scan for all matching files, sorted by relative path.
    pub fn scan(&self) -> Result<Vec<ScannedFile>> {
        if !self.root.is_dir() {
            return Err(anyhow::anyhow!(
                "Not a directory: {}",
                self.root.display()
            ));
        }

        let mut files = Vec::new();

        let walker = WalkDir::new(&self.root)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !self.is_excluded(&e.file_name().to_string_lossy()));

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.matches(entry.path()) {
                continue;
            }

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.config.max_file_size {
                debug!("Skipping {} ({} bytes)", entry.path().display(), size);
                continue;
            }

            let rel_path = entry.path().strip_prefix(&self.root).unwrap_or(entry.path());
            files.push(ScannedFile {
                path: to_slash_path(rel_path),
                size,
            });
        }

        files.sort_by(|a, b| a.path.cmp(&b.path));

        if let Some(max) = self.config.max_files {
            if files.len() > max {
                warn!("Found {} files, keeping the first {}", files.len(), max);
                files.truncate(max);
            }
        }

        Ok(files)
    }

    /// Concatenate every matching file into one blob.
    pub fn concatenate(&self) -> Result<String> {
        let files = self.scan()?;
        let paths: Vec<PathBuf> = files.iter().map(|f| PathBuf::from(&f.path)).collect();
        concatenate_files(&self.root, &paths)
    }

    /// Check if a file has an included extension.
    fn matches(&self, path: &Path) -> bool {
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        self.config
            .extensions
            .iter()
            .any(|wanted| wanted.eq_ignore_ascii_case(ext))
    }

    /// Check if a name matches exclusion patterns.
    fn is_excluded(&self, name: &str) -> bool {
        // Hidden files and directories
        if name.starts_with('.') {
            return true;
        }

        self.config.excludes.iter().any(|pattern| name == pattern)
    }
}

/// Read `paths` (relative to `root`) and join them as
/// `// <path>\n<content>\n\n`. Missing files are skipped with a warning;
/// invalid UTF-8 is replaced rather than rejected.
pub fn concatenate_files(root: &Path, paths: &[PathBuf]) -> Result<String> {
    let mut output = String::new();

    for path in paths {
        let full_path = root.join(path);
        if !full_path.is_file() {
            warn!("File not found: {}", full_path.display());
            continue;
        }

        let bytes = fs::read(&full_path)
            .with_context(|| format!("Failed to read {}", full_path.display()))?;
        let content = String::from_utf8_lossy(&bytes);

        output.push_str(&format!("// {}\n{}\n\n", to_slash_path(path), content));
    }

    Ok(output)
}

fn to_slash_path(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
