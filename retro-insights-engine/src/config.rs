//! Pipeline Configuration
//!
//! Thresholds and limits for every pipeline stage. Configuration is checked
//! once, before any analysis runs: an invalid threshold is the only failure
//! the pipeline surfaces to its caller.
//!
//! Environment overrides (all optional):
//! - RETRO_TREND_THRESHOLD: relative change that counts as a trend (0 < x <= 1)
//! - RETRO_CORRELATION_THRESHOLD: |r| that counts as strong (0 <= x <= 1)
//! - RETRO_SIGNIFICANCE_LEVEL: alpha for correlation p-values (0 < x < 1)
//! - RETRO_Z_THRESHOLD: |z| above which a value is anomalous (> 0)
//! - RETRO_LARGE_STORY_SHARE: large-story share that signals sizing issues
//! - RETRO_LARGE_STORY_POINTS: smallest numeric bucket counted as large
//! - RETRO_DEFECT_ENVIRONMENT_SHARE: bug share that signals a defect pattern
//! - RETRO_DEFECT_FOCUS_ENVIRONMENT: prod | acc | test | dev | other
//! - RETRO_MIN_BUG_COUNT: bugs required before a defect pattern is reported
//! - RETRO_MAX_HYPOTHESES / RETRO_MAX_EXPERIMENTS / RETRO_MAX_DURATION_SPRINTS
//! - RETRO_FOCUS_METRICS: comma separated metric names to analyze
//! - RETRO_TELEMETRY: "false" disables pipeline telemetry

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::str::FromStr;
use thiserror::Error;
use validator::Validate;

use crate::contracts::{BugEnvironment, Metric};

/// Errors raised while loading or validating configuration.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid value for {name}: {value:?} ({reason})")]
    InvalidValue {
        name: &'static str,
        value: String,
        reason: String,
    },
}

impl From<validator::ValidationErrors> for ConfigurationError {
    fn from(err: validator::ValidationErrors) -> Self {
        ConfigurationError::Validation(err.to_string())
    }
}

/// Statistical analyzer settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct StatisticalConfig {
    /// Relative change below which a trend is stable
    #[validate(range(exclusive_min = 0.0, max = 1.0))]
    pub trend_threshold: f64,

    /// |r| at or above which a correlation is strong
    #[validate(range(min = 0.0, max = 1.0))]
    pub correlation_threshold: f64,

    /// p-value below which a correlation is significant
    #[validate(range(exclusive_min = 0.0, exclusive_max = 1.0))]
    pub significance_level: f64,

    /// |z| above which a value is anomalous
    #[validate(range(exclusive_min = 0.0))]
    pub z_threshold: f64,

    /// Aligned observations required for a correlation
    #[validate(range(min = 3))]
    pub min_correlation_points: usize,

    /// Window for moving averages
    #[validate(range(min = 1))]
    pub moving_average_window: usize,
}

impl Default for StatisticalConfig {
    fn default() -> Self {
        Self {
            trend_threshold: 0.20,
            correlation_threshold: 0.6,
            significance_level: 0.05,
            z_threshold: 2.0,
            min_correlation_points: 3,
            moving_average_window: 3,
        }
    }
}

/// Hypothesis engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct HypothesisConfig {
    /// Share of large stories (inclusive) that signals a sizing issue
    #[validate(range(min = 0.0, max = 1.0))]
    pub large_story_share: f64,

    /// Smallest numeric story-point bucket counted as large
    #[validate(range(exclusive_min = 0.0))]
    pub large_story_points: f64,

    /// Share of bugs in the focus environment that must be exceeded for a defect pattern
    #[validate(range(min = 0.0, max = 1.0))]
    pub defect_environment_share: f64,

    /// Environment watched by the defect pattern template
    pub defect_focus_environment: BugEnvironment,

    /// Focus-environment bugs required in the latest sprint before a defect pattern is reported
    pub min_bug_count: u32,

    /// Hypotheses kept after ranking
    #[validate(range(min = 1))]
    pub max_hypotheses: usize,
}

impl Default for HypothesisConfig {
    fn default() -> Self {
        Self {
            large_story_share: 0.30,
            large_story_points: 8.0,
            defect_environment_share: 0.40,
            defect_focus_environment: BugEnvironment::Prod,
            min_bug_count: 3,
            max_hypotheses: 3,
        }
    }
}

/// Experiment engine settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Experiments kept across all hypotheses
    #[validate(range(min = 1))]
    pub max_experiments: usize,

    /// Trend magnitude that adds one sprint to an experiment
    #[validate(range(exclusive_min = 0.0))]
    pub duration_step: f64,

    /// Upper bound on experiment length
    #[validate(range(min = 1))]
    pub max_duration_sprints: u32,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            max_experiments: 3,
            duration_step: 0.5,
            max_duration_sprints: 3,
        }
    }
}

/// Complete pipeline configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(default)]
pub struct AnalysisConfig {
    #[validate(nested)]
    pub statistical: StatisticalConfig,

    #[validate(nested)]
    pub hypothesis: HypothesisConfig,

    #[validate(nested)]
    pub experiment: ExperimentConfig,

    /// Metrics to analyze; every series metric when unset
    pub focus_metrics: Option<Vec<Metric>>,

    /// Emit pipeline telemetry
    pub telemetry_enabled: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            statistical: StatisticalConfig::default(),
            hypothesis: HypothesisConfig::default(),
            experiment: ExperimentConfig::default(),
            focus_metrics: None,
            telemetry_enabled: true,
        }
    }
}

impl AnalysisConfig {
    /// Load defaults overridden by `RETRO_*` environment variables, then validate.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        override_from(&lookup, "RETRO_TREND_THRESHOLD", &mut config.statistical.trend_threshold)?;
        override_from(
            &lookup,
            "RETRO_CORRELATION_THRESHOLD",
            &mut config.statistical.correlation_threshold,
        )?;
        override_from(
            &lookup,
            "RETRO_SIGNIFICANCE_LEVEL",
            &mut config.statistical.significance_level,
        )?;
        override_from(&lookup, "RETRO_Z_THRESHOLD", &mut config.statistical.z_threshold)?;
        override_from(
            &lookup,
            "RETRO_LARGE_STORY_SHARE",
            &mut config.hypothesis.large_story_share,
        )?;
        override_from(
            &lookup,
            "RETRO_LARGE_STORY_POINTS",
            &mut config.hypothesis.large_story_points,
        )?;
        override_from(
            &lookup,
            "RETRO_DEFECT_ENVIRONMENT_SHARE",
            &mut config.hypothesis.defect_environment_share,
        )?;
        override_from(&lookup, "RETRO_MIN_BUG_COUNT", &mut config.hypothesis.min_bug_count)?;
        override_from(&lookup, "RETRO_MAX_HYPOTHESES", &mut config.hypothesis.max_hypotheses)?;
        override_from(&lookup, "RETRO_MAX_EXPERIMENTS", &mut config.experiment.max_experiments)?;
        override_from(
            &lookup,
            "RETRO_MAX_DURATION_SPRINTS",
            &mut config.experiment.max_duration_sprints,
        )?;
        override_from(&lookup, "RETRO_TELEMETRY", &mut config.telemetry_enabled)?;

        if let Some(raw) = lookup("RETRO_DEFECT_FOCUS_ENVIRONMENT") {
            config.hypothesis.defect_focus_environment = BugEnvironment::ALL
                .into_iter()
                .find(|env| env.label() == raw.trim())
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    name: "RETRO_DEFECT_FOCUS_ENVIRONMENT",
                    value: raw.clone(),
                    reason: "expected one of prod, acc, test, dev, other".to_string(),
                })?;
        }

        if let Some(raw) = lookup("RETRO_FOCUS_METRICS") {
            let metrics = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(Metric::from_str)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| ConfigurationError::InvalidValue {
                    name: "RETRO_FOCUS_METRICS",
                    value: raw.clone(),
                    reason: e.to_string(),
                })?;
            config.focus_metrics = Some(metrics);
        }

        config.validate_all()?;
        Ok(config)
    }

    /// Field ranges plus the checks a derive cannot express.
    pub fn validate_all(&self) -> Result<(), ConfigurationError> {
        self.validate()?;

        let ratios = [
            ("statistical.trend_threshold", self.statistical.trend_threshold),
            ("statistical.correlation_threshold", self.statistical.correlation_threshold),
            ("statistical.significance_level", self.statistical.significance_level),
            ("statistical.z_threshold", self.statistical.z_threshold),
            ("hypothesis.large_story_share", self.hypothesis.large_story_share),
            ("hypothesis.large_story_points", self.hypothesis.large_story_points),
            ("hypothesis.defect_environment_share", self.hypothesis.defect_environment_share),
            ("experiment.duration_step", self.experiment.duration_step),
        ];
        if let Some((name, value)) = ratios.iter().find(|(_, v)| !v.is_finite()) {
            return Err(ConfigurationError::Validation(format!(
                "{} must be a finite number, got {}",
                name, value
            )));
        }

        if let Some(metrics) = &self.focus_metrics {
            if metrics.is_empty() {
                return Err(ConfigurationError::Validation(
                    "focus_metrics must not be empty when set".to_string(),
                ));
            }
            if let Some(metric) = metrics.iter().find(|m| !m.is_series()) {
                return Err(ConfigurationError::Validation(format!(
                    "focus_metrics may only name per-sprint metrics, got {}",
                    metric
                )));
            }
        }

        Ok(())
    }

    /// Metrics analyzed for trends, correlations and anomalies.
    pub fn analyzed_metrics(&self) -> Vec<Metric> {
        match &self.focus_metrics {
            Some(metrics) => metrics.clone(),
            None => Metric::SERIES.to_vec(),
        }
    }
}

fn override_from<F, T>(lookup: &F, name: &'static str, target: &mut T) -> Result<(), ConfigurationError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: Display,
{
    if let Some(raw) = lookup(name) {
        *target = raw
            .trim()
            .parse()
            .map_err(|e: T::Err| ConfigurationError::InvalidValue {
                name,
                value: raw.clone(),
                reason: e.to_string(),
            })?;
    }
    Ok(())
}
