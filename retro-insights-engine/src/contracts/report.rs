//! Retrospective Report Contract
//!
//! The aggregate root of one analysis run. It is assembled once, never
//! mutated afterwards, and handed to the caller for storage.
//!
//! # Fields
//!
//! - headline / summary: narrative text (template or enriched)
//! - sprint_period: "<first sprint> - <last sprint>"
//! - inputs_hash: SHA256 of the serialized sprint series for determinism checks
//! - trends / correlations / anomalies / distributions: the evidence base
//! - hypotheses / suggested_experiments: ranked, bounded outputs
//! - facilitation_guide: questions, agenda and focus areas for the meeting

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::{
    AnomalyFlag, ConfidenceLevel, CorrelationResult, DistributionResult, ExperimentSuggestion,
    Hypothesis, TrendResult,
};

/// Where the narrative text of a report came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NarrativeSource {
    /// Built-in templates only
    Template,
    /// At least one field supplied by the enrichment collaborator
    Enriched,
}

/// Material for running the retrospective meeting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacilitationGuide {
    /// Exactly three discussion questions
    pub retro_questions: Vec<String>,

    /// Four time-boxed agenda steps for a 15 minute session
    pub agenda_15min: Vec<String>,

    /// Titles of the ranked hypotheses
    pub focus_areas: Vec<String>,
}

/// The finished report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrospectiveReport {
    pub headline: String,
    pub summary: String,
    pub sprint_period: String,
    pub generated_at: DateTime<Utc>,

    /// SHA256 (hex) of the serialized input series
    pub inputs_hash: String,

    pub trends: Vec<TrendResult>,
    pub correlations: Vec<CorrelationResult>,
    pub anomalies: Vec<AnomalyFlag>,
    pub distributions: Vec<DistributionResult>,

    /// Ranked, at most the configured maximum
    pub hypotheses: Vec<Hypothesis>,

    /// At most the configured maximum
    pub suggested_experiments: Vec<ExperimentSuggestion>,

    pub facilitation_guide: FacilitationGuide,
    pub sprints_analyzed: usize,

    /// Confidence of the top hypothesis; Low when none fired
    pub confidence_overall: ConfidenceLevel,

    pub narrative_source: NarrativeSource,
}

impl RetrospectiveReport {
    /// Compute the SHA256 hash of serialized inputs.
    pub fn compute_inputs_hash<T: Serialize>(inputs: &T) -> Result<String, serde_json::Error> {
        let json = serde_json::to_string(inputs)?;
        let mut hasher = Sha256::new();
        hasher.update(json.as_bytes());
        Ok(hex::encode(hasher.finalize()))
    }
}
