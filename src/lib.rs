//! auditmesh - multi-strategy LLM auditor for smart contracts
//!
//! [`analysis::StrategyRouter`] runs a set of [`agent::AnalysisStrategy`]
//! implementations concurrently over one [`models::AuditInput`] and merges
//! their findings with [`analysis::merger::merge`]. The remaining modules
//! assemble input, configure the bundled LLM strategies and render reports
//! for the `auditmesh` binary.

pub mod agent;
pub mod analysis;
pub mod cancel;
pub mod cli;
pub mod config;
pub mod error;
pub mod models;
pub mod report;
pub mod scanner;
