//! Statistical Result Contracts
//!
//! Plain records produced by the statistical analyzer. They are recomputed on
//! every run and carry no identity of their own.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::Metric;

/// Direction of a trend between the two most recent observations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Up,
    Down,
    Stable,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Up => write!(f, "up"),
            Self::Down => write!(f, "down"),
            Self::Stable => write!(f, "stable"),
        }
    }
}

/// Ordered significance level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Low,
    Medium,
    High,
}

impl Significance {
    /// Classify a relative magnitude against a threshold: high at twice the
    /// threshold or more, medium at the threshold or more.
    pub fn classify(relative: f64, threshold: f64) -> Self {
        if relative >= 2.0 * threshold {
            Self::High
        } else if relative >= threshold {
            Self::Medium
        } else {
            Self::Low
        }
    }
}

impl fmt::Display for Significance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Low => write!(f, "low"),
            Self::Medium => write!(f, "medium"),
            Self::High => write!(f, "high"),
        }
    }
}

/// Change of one metric between its two most recent observations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendResult {
    /// Metric analyzed
    pub metric: Metric,

    /// Up, down or stable
    pub direction: Direction,

    /// |change_percent| / 100
    pub magnitude: f64,

    /// Significance of the change
    pub significance: Significance,

    /// Most recent observed value
    pub current_value: f64,

    /// Observation before `current_value`
    pub previous_value: f64,

    /// Relative change in percent
    pub change_percent: f64,

    /// Index of the current observation in the input series
    pub current_sprint_index: usize,

    /// Index of the previous observation in the input series
    pub previous_sprint_index: usize,
}

impl TrendResult {
    /// Short descriptor, e.g. "up 50.0%".
    pub fn descriptor(&self) -> String {
        match self.direction {
            Direction::Stable => format!("stable ({:+.1}%)", self.change_percent),
            direction => format!("{} {:.1}%", direction, self.change_percent.abs()),
        }
    }
}

/// Pearson correlation between two metrics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationResult {
    pub metric_a: Metric,
    pub metric_b: Metric,

    /// Pearson r, clamped to [-1, 1]
    pub coefficient: f64,

    /// Two-tailed p-value
    pub p_value: f64,

    /// Number of aligned observations used
    pub sample_size: usize,

    /// |r| meets the strength threshold
    pub is_strong: bool,

    /// p-value below the significance level
    pub is_significant: bool,
}

impl CorrelationResult {
    /// Whether this result relates the two given metrics, in either order.
    pub fn involves(&self, a: Metric, b: Metric) -> bool {
        (self.metric_a == a && self.metric_b == b) || (self.metric_a == b && self.metric_b == a)
    }

    /// The other metric of the pair, if `metric` is part of it.
    pub fn partner_of(&self, metric: Metric) -> Option<Metric> {
        if self.metric_a == metric {
            Some(self.metric_b)
        } else if self.metric_b == metric {
            Some(self.metric_a)
        } else {
            None
        }
    }

    /// Plain-language reading of the coefficient.
    pub fn interpretation(&self) -> String {
        let strength = match self.coefficient.abs() {
            r if r < 0.3 => "weak",
            r if r < 0.6 => "moderate",
            _ => "strong",
        };
        let sign = if self.coefficient >= 0.0 { "positive" } else { "negative" };
        let mut text = format!(
            "{} {} correlation between {} and {} (r={:.2})",
            strength,
            sign,
            self.metric_a.title(),
            self.metric_b.title(),
            self.coefficient
        );
        if self.is_significant {
            text.push_str(" (statistically significant)");
        }
        text
    }
}

/// A sprint whose value sits far from the series mean.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyFlag {
    pub metric: Metric,

    /// Position in the input series
    pub sprint_index: usize,

    pub sprint_id: String,
    pub value: f64,
    pub z_score: f64,
}

/// One bucket of a distribution profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BucketShare {
    pub label: String,
    pub count: u32,

    /// count / total
    pub share: f64,
}

/// Bucket shares of the most recent sprint carrying a distribution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionResult {
    /// `story_point_distribution` or `bugs_by_environment`
    pub metric: Metric,
    pub sprint_index: usize,
    pub sprint_id: String,
    pub total: u64,
    pub buckets: Vec<BucketShare>,
}

impl DistributionResult {
    pub fn bucket(&self, label: &str) -> Option<&BucketShare> {
        self.buckets.iter().find(|b| b.label == label)
    }
}

/// Everything one analysis run produced; the input to the hypothesis engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceBase {
    pub trends: Vec<TrendResult>,
    pub correlations: Vec<CorrelationResult>,
    pub anomalies: Vec<AnomalyFlag>,
    pub distributions: Vec<DistributionResult>,
}

impl EvidenceBase {
    pub fn trend(&self, metric: Metric) -> Option<&TrendResult> {
        self.trends.iter().find(|t| t.metric == metric)
    }

    pub fn correlation(&self, a: Metric, b: Metric) -> Option<&CorrelationResult> {
        self.correlations.iter().find(|c| c.involves(a, b))
    }

    pub fn distribution(&self, metric: Metric) -> Option<&DistributionResult> {
        self.distributions.iter().find(|d| d.metric == metric)
    }

    /// Whether `metric` appears in the trend, correlation or distribution sets.
    pub fn cites(&self, metric: Metric) -> bool {
        self.trends.iter().any(|t| t.metric == metric)
            || self
                .correlations
                .iter()
                .any(|c| c.metric_a == metric || c.metric_b == metric)
            || self.distributions.iter().any(|d| d.metric == metric)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn correlation(r: f64, significant: bool) -> CorrelationResult {
        CorrelationResult {
            metric_a: Metric::ReviewTime,
            metric_b: Metric::DefectRateProduction,
            coefficient: r,
            p_value: if significant { 0.01 } else { 0.4 },
            sample_size: 5,
            is_strong: r.abs() >= 0.6,
            is_significant: significant,
        }
    }

    #[test]
    fn test_significance_classification_boundaries() {
        assert_eq!(Significance::classify(0.4, 0.2), Significance::High);
        assert_eq!(Significance::classify(0.2, 0.2), Significance::Medium);
        assert_eq!(Significance::classify(0.19, 0.2), Significance::Low);
        assert!(Significance::High > Significance::Medium);
    }

    #[test]
    fn test_correlation_pair_is_unordered() {
        let c = correlation(0.9, true);
        assert!(c.involves(Metric::DefectRateProduction, Metric::ReviewTime));
        assert_eq!(c.partner_of(Metric::ReviewTime), Some(Metric::DefectRateProduction));
        assert_eq!(c.partner_of(Metric::TestingTime), None);
    }

    #[test]
    fn test_correlation_interpretation() {
        assert_eq!(
            correlation(-0.45, false).interpretation(),
            "moderate negative correlation between Review Time and Defect Rate Production (r=-0.45)"
        );
        assert!(correlation(0.9, true)
            .interpretation()
            .ends_with("(statistically significant)"));
    }

    #[test]
    fn test_evidence_base_cites() {
        let base = EvidenceBase {
            correlations: vec![correlation(0.9, true)],
            ..Default::default()
        };
        assert!(base.cites(Metric::DefectRateProduction));
        assert!(!base.cites(Metric::TeamHappiness));
    }
}
