//! Retro Insights Engine
//!
//! Turns a chronological series of sprint metrics into a retrospective
//! report: what changed, which known dysfunction patterns the changes point
//! to, and which small experiments the team could run next.
//!
//! # Pipeline
//!
//! ```text
//! Vec<SprintMetrics>
//!   -> StatisticalAnalyzer   trends, correlations, anomalies, distributions
//!   -> HypothesisEngine      six pattern templates, confidence scoring, top N
//!   -> ExperimentEngine      hypothesis type -> experiment templates
//!   -> ReportAssembler       RetrospectiveReport (+ optional enrichment)
//! ```
//!
//! Every stage is synchronous and deterministic. Only narrative enrichment is
//! async and it can never change numbers, evidence or ranking.
//!
//! # Usage
//!
//! ```rust,ignore
//! use retro_insights::{AnalysisConfig, ReportAssembler, SprintMetrics};
//!
//! let assembler = ReportAssembler::new(AnalysisConfig::from_env()?)?;
//! let series: Vec<SprintMetrics> = serde_json::from_str(&input)?;
//! let report = assembler.assemble(&series);
//!
//! // Or with an LLM writing the narrative
//! let enricher = ChatCompletionsEnricher::from_env()?;
//! let report = assembler.assemble_enriched(&series, &enricher, None).await;
//! ```
//!
//! # Modules
//!
//! - [`contracts`]: input and output records
//! - [`config`]: validated thresholds and limits
//! - [`analysis`]: pipeline stages and telemetry
//! - [`clients`]: narrative enrichment collaborators

#![warn(rustdoc::missing_crate_level_docs)]

pub mod analysis;
pub mod clients;
pub mod config;
pub mod contracts;

pub use analysis::{
    ExperimentCatalogue, ExperimentEngine, HypothesisEngine, PipelineTelemetry, ReportAssembler,
    StatisticalAnalyzer,
};
pub use clients::{
    ChatCompletionsEnricher, ChatConfig, Enrichment, EnrichmentError, EnrichmentRequest, NarrativeEnricher,
};
pub use config::{AnalysisConfig, ConfigurationError, ExperimentConfig, HypothesisConfig, StatisticalConfig};
pub use contracts::{
    ConfidenceLevel, ExperimentSuggestion, Hypothesis, HypothesisType, Metric, RetrospectiveReport,
    SprintMetrics, TrendResult,
};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
