//! Metric Names
//!
//! The closed set of quantities the pipeline knows how to analyze. Each
//! metric is either a per-sprint scalar (read straight from a
//! [`SprintMetrics`](super::SprintMetrics) row), a derived per-sprint
//! scalar, or a distribution profiled on the latest sprint only.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A named metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    /// Team happiness score (typically 1-10)
    TeamHappiness,
    /// Story points committed at sprint start
    StoryPointsPlanned,
    /// Story points delivered
    StoryPointsCompleted,
    /// Work items delivered
    ItemsCompleted,
    /// Work items carried into the next sprint
    ItemsCarriedOver,
    /// Percentage of items that left the sprint unfinished
    ItemsOutOfSprintPercent,
    /// Average coding hours per item
    CodingTime,
    /// Average review hours per item
    ReviewTime,
    /// Average testing hours per item
    TestingTime,
    /// Share of defects found in production
    DefectRateProduction,
    /// Defects per delivered item across all environments
    DefectRateAll,
    /// Bugs reported in production
    BugsProd,
    /// Bugs open at sprint end
    OpenBugsCount,
    /// Derived: story points completed / story points planned
    CompletionRatio,
    /// Distribution: story-point bucket counts
    StoryPointDistribution,
    /// Distribution: bug counts per environment
    BugsByEnvironment,
}

/// Unit a metric is measured in, used when formatting evidence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricUnit {
    Hours,
    Points,
    Items,
    Ratio,
    Percent,
    Score,
    Count,
}

impl Metric {
    /// Metrics that form a per-sprint time series, in canonical order.
    pub const SERIES: [Metric; 14] = [
        Metric::TeamHappiness,
        Metric::StoryPointsPlanned,
        Metric::StoryPointsCompleted,
        Metric::ItemsCompleted,
        Metric::ItemsCarriedOver,
        Metric::ItemsOutOfSprintPercent,
        Metric::CodingTime,
        Metric::ReviewTime,
        Metric::TestingTime,
        Metric::DefectRateProduction,
        Metric::DefectRateAll,
        Metric::BugsProd,
        Metric::OpenBugsCount,
        Metric::CompletionRatio,
    ];

    /// Snake-case identifier, identical to the serialized form.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::TeamHappiness => "team_happiness",
            Self::StoryPointsPlanned => "story_points_planned",
            Self::StoryPointsCompleted => "story_points_completed",
            Self::ItemsCompleted => "items_completed",
            Self::ItemsCarriedOver => "items_carried_over",
            Self::ItemsOutOfSprintPercent => "items_out_of_sprint_percent",
            Self::CodingTime => "coding_time",
            Self::ReviewTime => "review_time",
            Self::TestingTime => "testing_time",
            Self::DefectRateProduction => "defect_rate_production",
            Self::DefectRateAll => "defect_rate_all",
            Self::BugsProd => "bugs_prod",
            Self::OpenBugsCount => "open_bugs_count",
            Self::CompletionRatio => "completion_ratio",
            Self::StoryPointDistribution => "story_point_distribution",
            Self::BugsByEnvironment => "bugs_by_environment",
        }
    }

    /// Human-readable title, e.g. "Review Time".
    pub fn title(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn unit(&self) -> MetricUnit {
        match self {
            Self::TeamHappiness => MetricUnit::Score,
            Self::StoryPointsPlanned | Self::StoryPointsCompleted => MetricUnit::Points,
            Self::ItemsCompleted | Self::ItemsCarriedOver => MetricUnit::Items,
            Self::ItemsOutOfSprintPercent => MetricUnit::Percent,
            Self::CodingTime | Self::ReviewTime | Self::TestingTime => MetricUnit::Hours,
            Self::DefectRateProduction | Self::DefectRateAll | Self::CompletionRatio => {
                MetricUnit::Ratio
            }
            Self::BugsProd | Self::OpenBugsCount => MetricUnit::Count,
            Self::StoryPointDistribution | Self::BugsByEnvironment => MetricUnit::Count,
        }
    }

    /// Whether this metric is a per-sprint scalar (as opposed to a distribution).
    pub fn is_series(&self) -> bool {
        !matches!(self, Self::StoryPointDistribution | Self::BugsByEnvironment)
    }

    /// Format a value of this metric for evidence text.
    pub fn format_value(&self, value: f64) -> String {
        match self.unit() {
            MetricUnit::Hours => format!("{:.1} hours", value),
            MetricUnit::Points => format!("{:.0} points", value),
            MetricUnit::Items => format!("{:.0} items", value),
            MetricUnit::Ratio => format!("{:.3}", value),
            MetricUnit::Percent => format!("{:.1}%", value),
            MetricUnit::Score => format!("{:.1}/10", value),
            MetricUnit::Count => format!("{:.0}", value),
        }
    }

    /// Format a previous/current pair, e.g. "20.0 → 30.0 hours".
    pub fn format_change(&self, previous: f64, current: f64) -> String {
        match self.unit() {
            MetricUnit::Hours => format!("{:.1} → {:.1} hours", previous, current),
            MetricUnit::Percent => format!("{:.1}% → {:.1}%", previous, current),
            MetricUnit::Ratio => format!("{:.3} → {:.3}", previous, current),
            MetricUnit::Score => format!("{:.1} → {:.1}", previous, current),
            _ => format!("{:.0} → {:.0}", previous, current),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string does not name a known metric.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown metric: {0}")]
pub struct UnknownMetric(pub String);

impl FromStr for Metric {
    type Err = UnknownMetric;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Metric::SERIES
            .iter()
            .chain([Metric::StoryPointDistribution, Metric::BugsByEnvironment].iter())
            .find(|m| m.as_str() == s)
            .copied()
            .ok_or_else(|| UnknownMetric(s.to_string()))
    }
}
