//! Sprint Snapshot Contract
//!
//! One [`SprintMetrics`] row per sprint. Every numeric field is optional:
//! an absent value is excluded from analysis and is never read as zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::Metric;

/// Per-sprint team metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SprintMetrics {
    /// Stable sprint identifier
    pub sprint_id: String,

    /// Display name (e.g. "Sprint 42")
    pub sprint_name: String,

    /// Ordinal position in the team's sprint sequence
    #[serde(default)]
    pub sequence: u32,

    /// Sprint start
    #[serde(default)]
    pub start_date: Option<DateTime<Utc>>,

    /// Sprint end
    #[serde(default)]
    pub end_date: Option<DateTime<Utc>>,

    /// Team happiness score
    #[serde(default)]
    pub team_happiness: Option<f64>,

    /// Story points committed
    #[serde(default)]
    pub story_points_planned: Option<f64>,

    /// Story points delivered
    #[serde(default)]
    pub story_points_completed: Option<f64>,

    /// Story-point bucket label to item count
    #[serde(default)]
    pub story_point_distribution: Option<BTreeMap<String, u32>>,

    /// Items delivered
    #[serde(default)]
    pub items_completed: Option<f64>,

    /// Items carried into the next sprint
    #[serde(default)]
    pub items_carried_over: Option<f64>,

    /// Percentage of items that left the sprint unfinished
    #[serde(default)]
    pub items_out_of_sprint_percent: Option<f64>,

    /// Average coding hours per item
    #[serde(default)]
    pub coding_time: Option<f64>,

    /// Average review hours per item
    #[serde(default)]
    pub review_time: Option<f64>,

    /// Average testing hours per item
    #[serde(default)]
    pub testing_time: Option<f64>,

    /// Production defect rate
    #[serde(default)]
    pub defect_rate_production: Option<f64>,

    /// Overall defect rate
    #[serde(default)]
    pub defect_rate_all: Option<f64>,

    /// Bugs found in production
    #[serde(default)]
    pub bugs_prod: Option<f64>,

    /// Bugs open at sprint end
    #[serde(default)]
    pub open_bugs_count: Option<f64>,

    /// Bug counts per environment
    #[serde(default)]
    pub bugs_by_environment: Option<BugEnvironmentCounts>,
}

impl SprintMetrics {
    /// Create an empty snapshot with identity fields only.
    pub fn new(sprint_id: impl Into<String>, sprint_name: impl Into<String>, sequence: u32) -> Self {
        Self {
            sprint_id: sprint_id.into(),
            sprint_name: sprint_name.into(),
            sequence,
            ..Default::default()
        }
    }

    /// Value of a per-sprint metric, `None` when absent or not finite.
    ///
    /// Distribution metrics always return `None`; use
    /// [`story_point_distribution`](Self::story_point_distribution) and
    /// [`bugs_by_environment`](Self::bugs_by_environment) for those.
    pub fn value(&self, metric: Metric) -> Option<f64> {
        let raw = match metric {
            Metric::TeamHappiness => self.team_happiness,
            Metric::StoryPointsPlanned => self.story_points_planned,
            Metric::StoryPointsCompleted => self.story_points_completed,
            Metric::ItemsCompleted => self.items_completed,
            Metric::ItemsCarriedOver => self.items_carried_over,
            Metric::ItemsOutOfSprintPercent => self.items_out_of_sprint_percent,
            Metric::CodingTime => self.coding_time,
            Metric::ReviewTime => self.review_time,
            Metric::TestingTime => self.testing_time,
            Metric::DefectRateProduction => self.defect_rate_production,
            Metric::DefectRateAll => self.defect_rate_all,
            Metric::BugsProd => self.bugs_prod,
            Metric::OpenBugsCount => self.open_bugs_count,
            Metric::CompletionRatio => self.completion_ratio(),
            Metric::StoryPointDistribution | Metric::BugsByEnvironment => None,
        };
        raw.filter(|v| v.is_finite())
    }

    /// Story points completed over planned; absent when planned is zero.
    pub fn completion_ratio(&self) -> Option<f64> {
        let planned = self.story_points_planned.filter(|p| p.is_finite() && *p != 0.0)?;
        let completed = self.story_points_completed.filter(|c| c.is_finite())?;
        Some(completed / planned)
    }
}

/// Environment a bug was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BugEnvironment {
    Prod,
    Acc,
    Test,
    Dev,
    Other,
}

impl BugEnvironment {
    /// Fixed bucket order used for distribution profiles.
    pub const ALL: [BugEnvironment; 5] = [
        BugEnvironment::Prod,
        BugEnvironment::Acc,
        BugEnvironment::Test,
        BugEnvironment::Dev,
        BugEnvironment::Other,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Prod => "prod",
            Self::Acc => "acc",
            Self::Test => "test",
            Self::Dev => "dev",
            Self::Other => "other",
        }
    }
}

/// Bug counts per environment; absent buckets are skipped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BugEnvironmentCounts {
    #[serde(default)]
    pub prod: Option<u32>,
    #[serde(default)]
    pub acc: Option<u32>,
    #[serde(default)]
    pub test: Option<u32>,
    #[serde(default)]
    pub dev: Option<u32>,
    #[serde(default)]
    pub other: Option<u32>,
}

impl BugEnvironmentCounts {
    pub fn get(&self, environment: BugEnvironment) -> Option<u32> {
        match environment {
            BugEnvironment::Prod => self.prod,
            BugEnvironment::Acc => self.acc,
            BugEnvironment::Test => self.test,
            BugEnvironment::Dev => self.dev,
            BugEnvironment::Other => self.other,
        }
    }

    /// Present buckets in [`BugEnvironment::ALL`] order.
    pub fn buckets(&self) -> impl Iterator<Item = (BugEnvironment, u32)> + '_ {
        BugEnvironment::ALL
            .into_iter()
            .filter_map(move |env| self.get(env).map(|count| (env, count)))
    }

    pub fn total(&self) -> u64 {
        self.buckets().map(|(_, count)| u64::from(count)).sum()
    }
}
