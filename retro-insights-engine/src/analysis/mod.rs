//! Analysis Pipeline
//!
//! Stages in execution order:
//!
//! 1. [`statistical`]: trends, correlations, anomalies, distributions
//! 2. [`hypothesis`]: pattern templates from [`catalogue`], scored and ranked
//! 3. [`experiment`]: keyed lookup from hypothesis type to experiments
//! 4. [`assembler`]: report packaging with [`narrative`] text and optional enrichment

pub mod assembler;
pub mod catalogue;
pub mod distributions;
pub mod experiment;
pub mod hypothesis;
pub mod narrative;
pub mod statistical;
pub mod telemetry;

pub use assembler::{apply_enrichment, ReportAssembler};
pub use catalogue::{PatternMatch, PatternTemplate, CATALOGUE};
pub use experiment::{ExperimentCatalogue, ExperimentEngine, ExperimentTemplate};
pub use hypothesis::HypothesisEngine;
pub use statistical::{SkipReason, StatisticalAnalyzer};
pub use telemetry::{PipelineStage, PipelineTelemetry, TelemetryEvent, TelemetryEventType};
