//! Analysis strategies.
//!
//! A strategy is an independent reviewer focused on one class of
//! vulnerabilities. The bundled strategies prompt an LLM; the router only
//! depends on the [`AnalysisStrategy`] trait.

pub mod llm;
pub mod prompts;
pub mod strategies;

pub use llm::{LlmConfig, OllamaClient};
pub use strategies::{all_strategies, strategies_by_names, PromptStrategy, StrategyKind};

use crate::cancel::CancellationToken;
use crate::error::AnalyzerError;
use crate::models::{AuditInput, Finding};
use async_trait::async_trait;

/// A pluggable analyzer run by the router.
#[async_trait]
pub trait AnalysisStrategy: Send + Sync {
    /// Stable identifier (e.g. "reentrancy").
    fn name(&self) -> &str;

    /// Execution priority; higher runs first. Affects ordering only.
    fn priority(&self) -> i32;

    /// Analyze the shared input. Implementations should stop early once
    /// `cancel` fires.
    async fn analyze(
        &self,
        input: &AuditInput,
        cancel: &CancellationToken,
    ) -> Result<Vec<Finding>, AnalyzerError>;
}
