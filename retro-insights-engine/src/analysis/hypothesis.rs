//! Hypothesis Engine
//!
//! Runs every catalogue template against an evidence base, scores the
//! patterns that fired, ranks them and keeps the top N.
//!
//! ## Confidence scoring
//!
//! ```text
//! score = 0.60 once a template fires
//!       + 0.15 if a cited correlation is strong and significant
//!       + 0.10 if the evidence cites two or more distinct metrics
//!       + 0.10 if a cited trend has high significance
//! score = min(score, 1.0)
//! ```
//!
//! Scores use decimal arithmetic so the High (0.8) and Medium (0.5) cut-offs
//! are compared exactly.
//!
//! ## Ranking
//! Score descending; equal scores keep catalogue order. An empty result is a
//! valid outcome meaning no significant pattern was detected.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use std::cmp::Reverse;
use tracing::{debug, info, instrument};

use crate::config::HypothesisConfig;
use crate::contracts::{
    ConfidenceLevel, Evidence, EvidenceBase, EvidenceSource, Hypothesis, Metric, Significance,
};

use super::catalogue::{PatternTemplate, CATALOGUE};

/// Score of any fired template.
pub const BASE_SCORE: Decimal = dec!(0.60);

/// Added when a cited correlation is strong and significant.
pub const CORRELATION_BONUS: Decimal = dec!(0.15);

/// Added when two or more distinct metrics support the hypothesis.
pub const CORROBORATION_BONUS: Decimal = dec!(0.10);

/// Added when a cited trend has high significance.
pub const HIGH_TREND_BONUS: Decimal = dec!(0.10);

/// Matches, scores and ranks hypotheses.
#[derive(Debug, Clone)]
pub struct HypothesisEngine {
    config: HypothesisConfig,
    catalogue: &'static [PatternTemplate],
}

impl Default for HypothesisEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl HypothesisEngine {
    /// Create an engine over the standard catalogue with default settings.
    pub fn new() -> Self {
        Self::with_config(HypothesisConfig::default())
    }

    /// Create an engine over the standard catalogue.
    pub fn with_config(config: HypothesisConfig) -> Self {
        Self {
            config,
            catalogue: &CATALOGUE,
        }
    }

    pub fn config(&self) -> &HypothesisConfig {
        &self.config
    }

    /// Fired hypotheses, ranked and truncated to `max_hypotheses`.
    #[instrument(skip(self, base), fields(trends = base.trends.len(), correlations = base.correlations.len()))]
    pub fn generate(&self, base: &EvidenceBase) -> Vec<Hypothesis> {
        let fired = self.evaluate(base);
        let fired_count = fired.len();
        let ranked = rank(fired, self.config.max_hypotheses);

        info!(
            fired = fired_count,
            selected = ranked.len(),
            "Hypotheses generated"
        );

        ranked
    }

    /// Every template that fires, scored, in catalogue order.
    pub fn evaluate(&self, base: &EvidenceBase) -> Vec<Hypothesis> {
        self.catalogue
            .iter()
            .filter_map(|template| {
                let matched = (template.matcher)(base, &self.config)?;
                let hypothesis = build_hypothesis(template, matched.description, matched.evidence);
                debug!(
                    hypothesis_type = %template.hypothesis_type,
                    score = %hypothesis.confidence_score,
                    evidence = hypothesis.evidence.len(),
                    "Template fired"
                );
                Some(hypothesis)
            })
            .collect()
    }
}

fn build_hypothesis(template: &PatternTemplate, description: String, evidence: Vec<Evidence>) -> Hypothesis {
    let confidence_score = score_evidence(&evidence);

    Hypothesis {
        hypothesis_type: Some(template.hypothesis_type),
        title: template.title.to_string(),
        description,
        enhanced_description: None,
        confidence: ConfidenceLevel::from_score(confidence_score),
        confidence_score,
        potential_impact: template.potential_impact.to_string(),
        affected_metrics: distinct_metrics(&evidence),
        trend_magnitude: evidence
            .iter()
            .filter(|e| e.source == EvidenceSource::Trend)
            .filter_map(|e| e.magnitude)
            .fold(0.0, f64::max),
        evidence,
    }
}

/// Confidence score for a fired template's evidence.
pub fn score_evidence(evidence: &[Evidence]) -> Decimal {
    let mut score = BASE_SCORE;

    if evidence
        .iter()
        .any(|e| e.source == EvidenceSource::Correlation && e.strong_and_significant)
    {
        score += CORRELATION_BONUS;
    }
    if distinct_metrics(evidence).len() >= 2 {
        score += CORROBORATION_BONUS;
    }
    if evidence
        .iter()
        .any(|e| e.source == EvidenceSource::Trend && e.significance == Significance::High)
    {
        score += HIGH_TREND_BONUS;
    }

    score.min(Decimal::ONE)
}

/// Sort by score descending, ties by catalogue order, and keep `limit`.
pub fn rank(mut hypotheses: Vec<Hypothesis>, limit: usize) -> Vec<Hypothesis> {
    hypotheses.sort_by_key(|h| {
        (
            Reverse(h.confidence_score),
            h.hypothesis_type.map_or(u8::MAX, |t| t as u8),
        )
    });
    hypotheses.truncate(limit);
    hypotheses
}

fn distinct_metrics(evidence: &[Evidence]) -> Vec<Metric> {
    let mut metrics: Vec<Metric> = Vec::new();
    for e in evidence {
        if !metrics.contains(&e.metric) {
            metrics.push(e.metric);
        }
    }
    metrics
}
