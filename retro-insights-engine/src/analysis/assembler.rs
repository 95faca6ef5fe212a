//! Report Assembler
//!
//! Runs analyzer, hypothesis engine and experiment engine in sequence and
//! packages the results with a template narrative. Enrichment, when asked
//! for, runs afterwards and only swaps narrative text.

use chrono::Utc;
use std::time::Instant;
use tracing::{info, instrument, warn};

use crate::clients::{Enrichment, EnrichmentRequest, NarrativeEnricher};
use crate::config::{AnalysisConfig, ConfigurationError};
use crate::contracts::{NarrativeSource, RetrospectiveReport, SprintMetrics};

use super::experiment::{ExperimentCatalogue, ExperimentEngine};
use super::hypothesis::HypothesisEngine;
use super::narrative;
use super::statistical::StatisticalAnalyzer;
use super::telemetry::{PipelineStage, PipelineTelemetry};

/// Builds retrospective reports from a sprint series.
#[derive(Debug, Clone)]
pub struct ReportAssembler {
    config: AnalysisConfig,
    analyzer: StatisticalAnalyzer,
    hypotheses: HypothesisEngine,
    experiments: ExperimentEngine,
}

impl ReportAssembler {
    /// Validate `config` and build the pipeline.
    pub fn new(config: AnalysisConfig) -> Result<Self, ConfigurationError> {
        config.validate_all()?;

        Ok(Self {
            analyzer: StatisticalAnalyzer::with_config(config.statistical.clone()),
            hypotheses: HypothesisEngine::with_config(config.hypothesis.clone()),
            experiments: ExperimentEngine::with_config(config.experiment.clone()),
            config,
        })
    }

    /// Replace the experiment lookup table.
    pub fn with_experiment_catalogue(mut self, catalogue: ExperimentCatalogue) -> Self {
        self.experiments = ExperimentEngine::with_catalogue(self.config.experiment.clone(), catalogue);
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn analyzer(&self) -> &StatisticalAnalyzer {
        &self.analyzer
    }

    /// Full report with template narrative. Never fails.
    #[instrument(skip(self, series), fields(sprints = series.len()))]
    pub fn assemble(&self, series: &[SprintMetrics]) -> RetrospectiveReport {
        let telemetry = self.telemetry();
        self.assemble_with(series, &telemetry)
    }

    /// Full report, then narrative from `enricher`. Any enrichment error keeps
    /// the template narrative.
    #[instrument(skip(self, series, enricher, custom_context), fields(sprints = series.len(), enricher = enricher.name()))]
    pub async fn assemble_enriched(
        &self,
        series: &[SprintMetrics],
        enricher: &dyn NarrativeEnricher,
        custom_context: Option<String>,
    ) -> RetrospectiveReport {
        let telemetry = self.telemetry();
        let report = self.assemble_with(series, &telemetry);

        telemetry.stage_started(PipelineStage::Enrichment);
        let started = Instant::now();
        let request = EnrichmentRequest::from_report(&report, custom_context);

        match enricher.enrich(&request).await {
            Ok(enrichment) => {
                let report = apply_enrichment(report, enrichment);
                telemetry.stage_completed(
                    PipelineStage::Enrichment,
                    elapsed_ms(started),
                    report.hypotheses.iter().filter(|h| h.enhanced_description.is_some()).count(),
                );
                report
            }
            Err(e) => {
                warn!(error = %e, enricher = enricher.name(), "Enrichment failed, using template narrative");
                telemetry.enrichment_fallback(&e.to_string());
                report
            }
        }
    }

    fn telemetry(&self) -> PipelineTelemetry {
        if self.config.telemetry_enabled {
            PipelineTelemetry::new()
        } else {
            PipelineTelemetry::disabled()
        }
    }

    fn assemble_with(&self, series: &[SprintMetrics], telemetry: &PipelineTelemetry) -> RetrospectiveReport {
        let metrics = self.config.analyzed_metrics();

        telemetry.stage_started(PipelineStage::Analysis);
        let started = Instant::now();
        let evidence = self.analyzer.analyze(series, &metrics);
        for metric in metrics.iter().filter(|m| evidence.trend(**m).is_none()) {
            telemetry.item_skipped(PipelineStage::Analysis, metric.as_str(), "no computable trend");
        }
        telemetry.stage_completed(
            PipelineStage::Analysis,
            elapsed_ms(started),
            evidence.trends.len() + evidence.correlations.len() + evidence.anomalies.len(),
        );

        telemetry.stage_started(PipelineStage::Hypotheses);
        let started = Instant::now();
        let hypotheses = self.hypotheses.generate(&evidence);
        telemetry.stage_completed(PipelineStage::Hypotheses, elapsed_ms(started), hypotheses.len());

        telemetry.stage_started(PipelineStage::Experiments);
        let started = Instant::now();
        let experiments = self.experiments.suggest(&hypotheses);
        telemetry.stage_completed(PipelineStage::Experiments, elapsed_ms(started), experiments.len());

        telemetry.stage_started(PipelineStage::Narrative);
        let started = Instant::now();
        let sprint_period = narrative::sprint_period(series);
        let headline = narrative::headline(&evidence.trends, &hypotheses);
        let facilitation_guide =
            narrative::facilitation_guide(&hypotheses, narrative::retro_questions(&hypotheses));
        telemetry.stage_completed(PipelineStage::Narrative, elapsed_ms(started), 1);

        let inputs_hash = RetrospectiveReport::compute_inputs_hash(&series).unwrap_or_else(|e| {
            warn!(error = %e, "Could not hash input series");
            String::new()
        });

        let report = RetrospectiveReport {
            headline,
            summary: narrative::summary(series.len(), &sprint_period),
            sprint_period,
            generated_at: Utc::now(),
            inputs_hash,
            confidence_overall: narrative::overall_confidence(&hypotheses),
            trends: evidence.trends,
            correlations: evidence.correlations,
            anomalies: evidence.anomalies,
            distributions: evidence.distributions,
            hypotheses,
            suggested_experiments: experiments,
            facilitation_guide,
            sprints_analyzed: series.len(),
            narrative_source: NarrativeSource::Template,
        };

        info!(
            run_id = %telemetry.run_id(),
            trends = report.trends.len(),
            hypotheses = report.hypotheses.len(),
            experiments = report.suggested_experiments.len(),
            confidence = %report.confidence_overall,
            "Report assembled"
        );

        report
    }
}

/// Overlay enriched text on a report. Numeric content is left untouched.
pub fn apply_enrichment(mut report: RetrospectiveReport, enrichment: Enrichment) -> RetrospectiveReport {
    let mut applied = false;

    if let Some(headline) = enrichment.headline.map(|h| h.trim().to_string()).filter(|h| !h.is_empty()) {
        report.headline = headline;
        applied = true;
    }

    for (hypothesis, description) in report
        .hypotheses
        .iter_mut()
        .zip(enrichment.hypothesis_descriptions)
    {
        if let Some(description) = description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()) {
            hypothesis.enhanced_description = Some(description);
            applied = true;
        }
    }

    if let Some(mut questions) = enrichment.retro_questions.filter(|q| q.len() >= 3) {
        questions.truncate(3);
        report.facilitation_guide.retro_questions = questions;
        applied = true;
    }

    if applied {
        report.narrative_source = NarrativeSource::Enriched;
    }
    report
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
