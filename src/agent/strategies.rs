//! Bundled prompt-driven strategies.

use crate::agent::llm::{parse_findings, OllamaClient};
use crate::agent::prompts::{self, PromptTemplate};
use crate::agent::AnalysisStrategy;
use crate::cancel::CancellationToken;
use crate::error::AnalyzerError;
use crate::models::{AuditInput, Finding};
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Detection focus of a bundled strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrategyKind {
    /// Baseline review across all vulnerability classes
    General,
    /// Reentrancy in all its forms
    Reentrancy,
    /// Flash loan / economic manipulation
    FlashLoan,
    /// Authorization and privilege escalation
    AccessControl,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 4] = [
        StrategyKind::General,
        StrategyKind::Reentrancy,
        StrategyKind::FlashLoan,
        StrategyKind::AccessControl,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::General => "general",
            StrategyKind::Reentrancy => "reentrancy",
            StrategyKind::FlashLoan => "flash_loan",
            StrategyKind::AccessControl => "access_control",
        }
    }

    pub fn priority(&self) -> i32 {
        match self {
            StrategyKind::General => 100,
            StrategyKind::Reentrancy => 80,
            StrategyKind::FlashLoan => 70,
            StrategyKind::AccessControl => 60,
        }
    }

    pub fn template(&self) -> &'static PromptTemplate {
        match self {
            StrategyKind::General => &prompts::GENERAL,
            StrategyKind::Reentrancy => &prompts::REENTRANCY,
            StrategyKind::FlashLoan => &prompts::FLASH_LOAN,
            StrategyKind::AccessControl => &prompts::ACCESS_CONTROL,
        }
    }

    /// Look a kind up by name, ignoring case. `-` and `_` are interchangeable.
    pub fn from_name(name: &str) -> Option<Self> {
        let wanted = name.trim().to_lowercase().replace('-', "_");
        Self::ALL.into_iter().find(|kind| kind.name() == wanted)
    }
}

/// A strategy that renders its focus prompt and asks the LLM for findings.
pub struct PromptStrategy {
    kind: StrategyKind,
    client: Arc<OllamaClient>,
}

impl PromptStrategy {
    pub fn new(kind: StrategyKind, client: Arc<OllamaClient>) -> Self {
        Self { kind, client }
    }
}

#[async_trait]
impl AnalysisStrategy for PromptStrategy {
    fn name(&self) -> &str {
        self.kind.name()
    }

    fn priority(&self) -> i32 {
        self.kind.priority()
    }

    async fn analyze(
        &self,
        input: &AuditInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<Finding>, AnalyzerError> {
        let template = self.kind.template();
        let prompt = prompts::render(template, input);

        info!("[{}] Sending analysis request to {}", self.name(), self.client.model());

        let reply = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(AnalyzerError::Cancelled),
            reply = self.client.chat(template.system, &prompt) => reply?,
        };

        debug!("[{}] Received {} bytes", self.name(), reply.len());

        parse_findings(&reply)
    }
}

/// All bundled strategies sharing one client.
pub fn all_strategies(client: Arc<OllamaClient>) -> Vec<Box<dyn AnalysisStrategy>> {
    StrategyKind::ALL
        .into_iter()
        .map(|kind| Box::new(PromptStrategy::new(kind, client.clone())) as Box<dyn AnalysisStrategy>)
        .collect()
}

/// Bundled strategies selected by name. Unknown names are skipped with a
/// warning; duplicates are ignored.
pub fn strategies_by_names(
    names: &[String],
    client: Arc<OllamaClient>,
) -> Vec<Box<dyn AnalysisStrategy>> {
    let mut kinds: Vec<StrategyKind> = Vec::new();

    for name in names {
        match StrategyKind::from_name(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => warn!("Unknown strategy '{}', skipping", name),
        }
    }

    kinds
        .into_iter()
        .map(|kind| Box::new(PromptStrategy::new(kind, client.clone())) as Box<dyn AnalysisStrategy>)
        .collect()
}
