//! auditmesh - multi-strategy LLM auditor for smart contracts
//!
//! Runs several focused audit strategies concurrently over the same
//! contracts and merges their overlapping findings into one report.
//!
//! Exit codes:
//!   0 - Success (no findings above threshold, or no --fail-on set)
//!   1 - Runtime error (connection, config, cancellation, etc.)
//!   2 - Findings at or above the --fail-on threshold

use anyhow::{Context, Result};
use auditmesh::agent::{self, LlmConfig, OllamaClient, StrategyKind};
use auditmesh::analysis::{stats, FindingSummary, StrategyRouter};
use auditmesh::cancel::CancellationToken;
use auditmesh::cli::{Args, OutputFormat};
use auditmesh::config::{Config, CONFIG_FILE_NAME};
use auditmesh::models::{AuditInput, QaPair, Severity};
use auditmesh::report::{self, AuditReport, ReportMetadata};
use auditmesh::scanner;
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file can raise verbosity, so it is read before logging starts.
    let (config, config_source) = match load_config(&args) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("❌ Error: {:#}", e);
            std::process::exit(1);
        }
    };

    init_logging(args.log_level(config.general.verbose));

    info!("auditmesh v{}", env!("CARGO_PKG_VERSION"));
    match config_source {
        Some(path) => info!("Loaded config from {}", path.display()),
        None => debug!("No config file found, using defaults"),
    }
    debug!("Arguments: {:?}", args);

    match run_audit(args, config).await {
        Ok(exit_code) => std::process::exit(exit_code),
        Err(e) => {
            error!("Audit failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .auditmesh.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    std::fs::write(path, Config::default_toml())
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize model, strategies, scanner and more.");
    Ok(())
}

/// Initialize logging at the given level.
fn init_logging(level: tracing::Level) {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete audit workflow. Returns exit code (0 or 2).
async fn run_audit(args: Args, config: Config) -> Result<i32> {
    let contracts_dir = args
        .contracts
        .clone()
        .context("--contracts is required")?;
    let scan_config = scanner::ScanConfig::from(&config.scanner);

    if args.dry_run {
        return handle_dry_run(&contracts_dir, &scan_config, &config);
    }

    // Step 1: Assemble the shared input
    println!("📂 Reading contracts from {}", contracts_dir.display());
    let file_scanner = scanner::FileScanner::new(contracts_dir.clone(), scan_config);
    let files = file_scanner.scan()?;
    if files.is_empty() {
        warn!("No contract files found in {}", contracts_dir.display());
    }
    let input = build_input(&args, &file_scanner)?;
    println!("   {} contract files, {} bytes", files.len(), input.contracts.len());

    // Step 2: Set up strategies
    let client = Arc::new(OllamaClient::new(LlmConfig {
        ollama_url: config.model.ollama_url.clone(),
        model_name: config.model.name.clone(),
        temperature: config.model.temperature,
        timeout_seconds: config.model.timeout_seconds,
    })?);

    let strategies = agent::strategies_by_names(&config.strategies.enabled, client.clone());
    let router = StrategyRouter::new(strategies)
        .context("No usable strategies selected")?
        .with_timeout(Duration::from_secs(config.strategies.timeout_seconds));

    println!("🤖 Running strategies: {}", router.strategy_names().join(", "));
    println!("   Model: {}", client.model());
    println!("   Ollama: {}", config.model.ollama_url);
    println!("   Timeout: {}s per strategy", config.strategies.timeout_seconds);

    // Step 3: Run the batch, cancellable with Ctrl-C
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, cancelling audit");
            signal_token.cancel();
        }
    });

    let spinner = start_spinner(args.quiet);
    let result = router.run_batch(&input, &cancel).await;
    spinner.finish_and_clear();
    let batch = result?;

    // Step 4: Filter and report
    let mut findings = batch.findings.clone();
    if let Some(min_level) = args.min_severity {
        findings = stats::filter_min_severity(findings, Severity::from(min_level));
    }
    stats::sort_by_severity(&mut findings);

    let summary = FindingSummary::from_findings(&findings);

    println!("\n📝 Generating report...");
    let output = match args.format {
        OutputFormat::Json => report::generate_json_report(&findings)?,
        OutputFormat::Markdown => {
            let audit_report = AuditReport {
                metadata: ReportMetadata {
                    contracts_path: contracts_dir.display().to_string(),
                    analysis_date: Utc::now(),
                    model_used: client.model().to_string(),
                    files_analyzed: files.len(),
                    raw_findings: batch.raw_count,
                    duration_seconds: batch.duration.as_secs_f64(),
                },
                outcomes: batch.outcomes.clone(),
                findings: findings.clone(),
                summary: summary.clone(),
            };
            report::generate_markdown_report(&audit_report)
        }
    };

    let output_path = PathBuf::from(&config.general.output);
    std::fs::write(&output_path, &output)
        .with_context(|| format!("Failed to write report to {}", output_path.display()))?;

    println!("\n📊 Audit Summary:");
    println!(
        "   Strategies: {} run, {} failed",
        batch.outcomes.len(),
        batch.failed_count()
    );
    println!(
        "   Findings: {} ({} before merging)",
        summary.total, batch.raw_count
    );
    println!(
        "   - 🔴 Critical: {} | 🟠 High: {} | 🟡 Medium: {} | 🟢 Low: {} | 🔵 Info: {}",
        summary.critical, summary.high, summary.medium, summary.low, summary.info
    );
    println!("   Duration: {:.1}s", batch.duration.as_secs_f64());
    println!(
        "\n✅ Audit complete! Report saved to: {}",
        output_path.display()
    );

    if let Some(fail_level) = args.fail_on {
        if stats::any_at_or_above(&batch.findings, Severity::from(fail_level)) {
            eprintln!(
                "\n⛔ Findings at or above {:?} severity. Failing (exit code 2).",
                fail_level
            );
            return Ok(2);
        }
    }

    Ok(0)
}

/// Assemble the input every strategy receives.
fn build_input(args: &Args, file_scanner: &scanner::FileScanner) -> Result<AuditInput> {
    let mut input = AuditInput::new(file_scanner.concatenate()?);

    if !args.docs.is_empty() {
        input.docs = scanner::concatenate_files(Path::new("."), &args.docs)?;
    }

    input.additional_links = args
        .links
        .iter()
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty())
        .collect();

    if let Some(ref path) = args.additional_docs {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read additional docs: {}", path.display()))?;
        input.additional_docs = Some(text);
    }

    if let Some(ref path) = args.qa {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read Q&A file: {}", path.display()))?;
        let pairs: Vec<QaPair> = serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse Q&A file: {}", path.display()))?;
        input.qa_responses = pairs;
    }

    Ok(input)
}

/// Spinner shown while strategies run.
fn start_spinner(quiet: bool) -> ProgressBar {
    if quiet {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}") {
        pb.set_style(style);
    }
    pb.set_message("Analyzing contracts...");
    pb.enable_steady_tick(Duration::from_millis(120));
    pb
}

/// Handle --dry-run: list contracts and strategies, exit.
fn handle_dry_run(
    contracts_dir: &Path,
    scan_config: &scanner::ScanConfig,
    config: &Config,
) -> Result<i32> {
    println!("\n🔍 Dry run: scanning contracts (no LLM call)...\n");

    let file_scanner = scanner::FileScanner::new(contracts_dir.to_path_buf(), scan_config.clone());
    let files = file_scanner.scan()?;

    if files.is_empty() {
        println!("   No matching contract files found.");
    } else {
        println!("   Found {} files that would be analyzed:\n", files.len());
        for file in &files {
            println!("     📄 {} ({} bytes)", file.path, file.size);
        }
    }

    let mut kinds: Vec<StrategyKind> = config
        .strategies
        .enabled
        .iter()
        .filter_map(|name| StrategyKind::from_name(name))
        .collect();
    kinds.sort_by_key(|k| std::cmp::Reverse(k.priority()));
    kinds.dedup();

    println!("\n   Strategies that would run:");
    if kinds.is_empty() {
        println!("     (none)");
    }
    for kind in kinds {
        println!("     🧪 {} (priority {})", kind.name(), kind.priority());
    }

    println!("\n✅ Dry run complete. No LLM calls were made.");
    Ok(0)
}

/// Load configuration from file or use defaults, with CLI overrides applied.
///
/// Runs before logging is initialized. Returns the file the configuration
/// came from, if any.
fn load_config(args: &Args) -> Result<(Config, Option<PathBuf>)> {
    let (mut config, source) = if let Some(ref config_path) = args.config {
        (Config::load(config_path)?, Some(config_path.clone()))
    } else {
        match Config::load_default() {
            Ok(Some(config)) => (config, Some(PathBuf::from(CONFIG_FILE_NAME))),
            Ok(None) => (Config::default(), None),
            Err(e) => {
                eprintln!("⚠️  Failed to load config, using defaults: {:#}", e);
                (Config::default(), None)
            }
        }
    };

    config.merge_with_args(args);
    Ok((config, source))
}
