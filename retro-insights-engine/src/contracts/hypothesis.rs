//! Hypothesis Contracts
//!
//! Ranked, evidence-backed explanations for observed metric patterns.
//! Hypotheses live only inside the report that produced them.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{Metric, Significance};

/// Score at or above which a hypothesis is rated High.
pub const HIGH_CONFIDENCE_SCORE: Decimal = dec!(0.8);

/// Score at or above which a hypothesis is rated Medium.
pub const MEDIUM_CONFIDENCE_SCORE: Decimal = dec!(0.5);

/// Pattern template that produced a hypothesis.
///
/// Declaration order is the catalogue order, which breaks ranking ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HypothesisType {
    ReviewBottleneck,
    StorySizing,
    QualityDegradation,
    TeamMorale,
    WorkflowEfficiency,
    DefectPattern,
}

impl HypothesisType {
    pub const ALL: [HypothesisType; 6] = [
        HypothesisType::ReviewBottleneck,
        HypothesisType::StorySizing,
        HypothesisType::QualityDegradation,
        HypothesisType::TeamMorale,
        HypothesisType::WorkflowEfficiency,
        HypothesisType::DefectPattern,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReviewBottleneck => "review_bottleneck",
            Self::StorySizing => "story_sizing",
            Self::QualityDegradation => "quality_degradation",
            Self::TeamMorale => "team_morale",
            Self::WorkflowEfficiency => "workflow_efficiency",
            Self::DefectPattern => "defect_pattern",
        }
    }
}

impl fmt::Display for HypothesisType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Confidence label derived from a score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    pub fn from_score(score: Decimal) -> Self {
        if score >= HIGH_CONFIDENCE_SCORE {
            Self::High
        } else if score >= MEDIUM_CONFIDENCE_SCORE {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "Low"),
            Self::Medium => write!(f, "Medium"),
            Self::High => write!(f, "High"),
        }
    }
}

/// Which analysis record an evidence entry was taken from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvidenceSource {
    Trend,
    Correlation,
    Anomaly,
    Distribution,
}

/// One analysis record supporting a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Evidence {
    /// Metric the record is about
    pub metric: Metric,

    /// Record kind
    pub source: EvidenceSource,

    /// Short description of the movement, e.g. "up 50.0%"
    pub trend: String,

    /// Formatted value, e.g. "20.0 → 30.0 hours"
    pub value: String,

    pub significance: Significance,

    /// Relative change carried by trend evidence
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub magnitude: Option<f64>,

    /// Correlation evidence only: strong and significant
    #[serde(default)]
    pub strong_and_significant: bool,
}

/// A scored candidate explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Template that fired
    pub hypothesis_type: Option<HypothesisType>,

    /// Short title
    pub title: String,

    /// Template description
    pub description: String,

    /// Narrative description from the enrichment step, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enhanced_description: Option<String>,

    /// Label derived from `confidence_score`
    pub confidence: ConfidenceLevel,

    /// Score in [0, 1]
    #[serde(with = "rust_decimal::serde::float")]
    pub confidence_score: Decimal,

    /// Expected effect if the pattern is addressed
    pub potential_impact: String,

    /// Distinct metrics cited by the evidence, in citation order
    pub affected_metrics: Vec<Metric>,

    /// Records that satisfied the trigger, in evaluation order
    pub evidence: Vec<Evidence>,

    /// Largest relative change among the trend evidence (0 when none)
    pub trend_magnitude: f64,
}
