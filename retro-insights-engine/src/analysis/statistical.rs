//! Statistical Analyzer
//!
//! Turns an ordered sprint series into trend, correlation, anomaly and
//! distribution records.
//!
//! ## Guarantees
//! - Pure and deterministic: the same series in the same order always yields
//!   the same records, and the series is never re-sorted.
//! - Local failure: a metric or pair that cannot be computed (too few points,
//!   zero denominator, zero variance) is omitted and logged at debug level.
//!   NaN and infinity never reach a result.
//!
//! ## Conventions
//! - Trends compare the two most recent non-missing observations.
//! - Correlations use pairwise deletion and Student's t for the p-value.
//! - Anomalies use the sample standard deviation (N - 1).
//! - Moving averages are tail aligned: `len - window + 1` values.

use statrs::statistics::Statistics;
use thiserror::Error;
use tracing::{debug, instrument};

use crate::config::StatisticalConfig;
use crate::contracts::{
    AnomalyFlag, BucketShare, CorrelationResult, Direction, DistributionResult, EvidenceBase,
    Metric, Significance, SprintMetrics, TrendResult,
};

use super::distributions::pearson_p_value;

/// Why a statistic was not produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("insufficient data: required {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("zero denominator")]
    ZeroDenominator,

    #[error("zero variance")]
    ZeroVariance,

    #[error("non-finite result")]
    NonFinite,
}

/// A value flagged by [`detect_anomalies`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Outlier {
    /// Position in the input slice
    pub index: usize,
    pub value: f64,
    pub z_score: f64,
}

/// Computes statistics over a sprint series.
#[derive(Debug, Clone, Default)]
pub struct StatisticalAnalyzer {
    config: StatisticalConfig,
}

impl StatisticalAnalyzer {
    /// Create an analyzer with default thresholds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an analyzer with custom thresholds.
    pub fn with_config(config: StatisticalConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &StatisticalConfig {
        &self.config
    }

    /// Run every analysis over `metrics` and bundle the results.
    #[instrument(skip(self, series, metrics), fields(sprints = series.len(), metrics = metrics.len()))]
    pub fn analyze(&self, series: &[SprintMetrics], metrics: &[Metric]) -> EvidenceBase {
        let evidence = EvidenceBase {
            trends: self.analyze_trends(series, metrics),
            correlations: self.analyze_correlations(series, &all_pairs(metrics)),
            anomalies: self.detect_series_anomalies(series, metrics),
            distributions: self.profile_distributions(series),
        };

        debug!(
            trends = evidence.trends.len(),
            correlations = evidence.correlations.len(),
            anomalies = evidence.anomalies.len(),
            distributions = evidence.distributions.len(),
            "Statistical analysis complete"
        );

        evidence
    }

    /// Trend of each metric between its two most recent observations.
    ///
    /// Output follows the order of `metrics`; metrics without a computable
    /// trend are omitted.
    pub fn analyze_trends(&self, series: &[SprintMetrics], metrics: &[Metric]) -> Vec<TrendResult> {
        metrics
            .iter()
            .filter_map(|&metric| {
                let observations = observations(series, metric);
                match compute_trend(metric, &observations, self.config.trend_threshold) {
                    Ok(trend) => Some(trend),
                    Err(reason) => {
                        debug!(metric = %metric, reason = %reason, "Trend skipped");
                        None
                    }
                }
            })
            .collect()
    }

    /// Pearson correlation for each pair, in the order given.
    pub fn analyze_correlations(
        &self,
        series: &[SprintMetrics],
        pairs: &[(Metric, Metric)],
    ) -> Vec<CorrelationResult> {
        pairs
            .iter()
            .filter_map(|&(a, b)| match self.correlate(series, a, b) {
                Ok(result) => Some(result),
                Err(reason) => {
                    debug!(metric_a = %a, metric_b = %b, reason = %reason, "Correlation skipped");
                    None
                }
            })
            .collect()
    }

    fn correlate(
        &self,
        series: &[SprintMetrics],
        a: Metric,
        b: Metric,
    ) -> Result<CorrelationResult, SkipReason> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = series
            .iter()
            .filter_map(|sprint| Some((sprint.value(a)?, sprint.value(b)?)))
            .unzip();

        let required = self.config.min_correlation_points.max(3);
        if xs.len() < required {
            return Err(SkipReason::InsufficientData {
                required,
                actual: xs.len(),
            });
        }

        let r = pearson(&xs, &ys)?;
        let p_value = pearson_p_value(r, xs.len());

        Ok(CorrelationResult {
            metric_a: a,
            metric_b: b,
            coefficient: r,
            p_value,
            sample_size: xs.len(),
            is_strong: r.abs() >= self.config.correlation_threshold,
            is_significant: p_value < self.config.significance_level,
        })
    }

    /// Anomalies per metric, mapped back to positions in `series`.
    pub fn detect_series_anomalies(
        &self,
        series: &[SprintMetrics],
        metrics: &[Metric],
    ) -> Vec<AnomalyFlag> {
        let mut flags = Vec::new();

        for &metric in metrics {
            let observations = observations(series, metric);
            let values: Vec<f64> = observations.iter().map(|(_, v)| *v).collect();

            for outlier in detect_anomalies(&values, self.config.z_threshold) {
                let sprint_index = observations[outlier.index].0;
                flags.push(AnomalyFlag {
                    metric,
                    sprint_index,
                    sprint_id: series[sprint_index].sprint_id.clone(),
                    value: outlier.value,
                    z_score: outlier.z_score,
                });
            }
        }

        flags
    }

    /// Story-point and bug-environment shares of the latest sprint carrying each.
    pub fn profile_distributions(&self, series: &[SprintMetrics]) -> Vec<DistributionResult> {
        let mut profiles = Vec::new();

        let story_points = series.iter().enumerate().rev().find_map(|(index, sprint)| {
            let buckets = sprint.story_point_distribution.as_ref()?;
            let counts: Vec<(String, u32)> =
                buckets.iter().map(|(label, count)| (label.clone(), *count)).collect();
            build_profile(Metric::StoryPointDistribution, index, sprint, counts)
        });
        profiles.extend(story_points);

        let bugs = series.iter().enumerate().rev().find_map(|(index, sprint)| {
            let environments = sprint.bugs_by_environment.as_ref()?;
            let counts: Vec<(String, u32)> = environments
                .buckets()
                .map(|(env, count)| (env.label().to_string(), count))
                .collect();
            build_profile(Metric::BugsByEnvironment, index, sprint, counts)
        });
        profiles.extend(bugs);

        profiles
    }

    /// Tail-aligned moving average of one metric using the configured window.
    pub fn metric_moving_average(&self, series: &[SprintMetrics], metric: Metric) -> Vec<f64> {
        let values: Vec<f64> = observations(series, metric).into_iter().map(|(_, v)| v).collect();
        moving_average(&values, self.config.moving_average_window)
    }
}

/// Non-missing observations of `metric` as (series index, value).
pub fn observations(series: &[SprintMetrics], metric: Metric) -> Vec<(usize, f64)> {
    series
        .iter()
        .enumerate()
        .filter_map(|(index, sprint)| sprint.value(metric).map(|v| (index, v)))
        .collect()
}

/// Trend from (series index, value) observations in chronological order.
///
/// `change_percent` is rounded to two decimals before classification, so a
/// change that is exactly the threshold in decimal terms (0.10 to 0.12) is not
/// lost to binary rounding.
pub fn compute_trend(
    metric: Metric,
    observations: &[(usize, f64)],
    threshold: f64,
) -> Result<TrendResult, SkipReason> {
    let [.., (previous_index, previous), (current_index, current)] = observations else {
        return Err(SkipReason::InsufficientData {
            required: 2,
            actual: observations.len(),
        });
    };

    if *previous == 0.0 {
        return Err(SkipReason::ZeroDenominator);
    }

    let change_percent = round_to_hundredths((current - previous) / previous * 100.0);
    if !change_percent.is_finite() {
        return Err(SkipReason::NonFinite);
    }

    let relative = change_percent.abs() / 100.0;
    let direction = if relative < threshold {
        Direction::Stable
    } else if change_percent > 0.0 {
        Direction::Up
    } else {
        Direction::Down
    };

    Ok(TrendResult {
        metric,
        direction,
        magnitude: relative,
        significance: Significance::classify(relative, threshold),
        current_value: *current,
        previous_value: *previous,
        change_percent,
        current_sprint_index: *current_index,
        previous_sprint_index: *previous_index,
    })
}

/// Pearson coefficient of two equally long vectors, clamped to [-1, 1].
pub fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64, SkipReason> {
    if xs.len() != ys.len() || xs.len() < 2 {
        return Err(SkipReason::InsufficientData {
            required: 2,
            actual: xs.len().min(ys.len()),
        });
    }
    if is_constant(xs) || is_constant(ys) {
        return Err(SkipReason::ZeroVariance);
    }

    let mean_x = xs.mean();
    let mean_y = ys.mean();

    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx <= 0.0 || syy <= 0.0 {
        return Err(SkipReason::ZeroVariance);
    }

    let r = sxy / (sxx.sqrt() * syy.sqrt());
    if !r.is_finite() {
        return Err(SkipReason::NonFinite);
    }
    Ok(r.clamp(-1.0, 1.0))
}

/// Indices whose sample z-score magnitude exceeds `z_threshold`.
///
/// Fewer than three values or a constant series yield no flags.
pub fn detect_anomalies(values: &[f64], z_threshold: f64) -> Vec<Outlier> {
    if values.len() < 3 || is_constant(values) {
        return Vec::new();
    }

    let mean = values.mean();
    let std_dev = values.std_dev();
    if std_dev <= 0.0 || !std_dev.is_finite() {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter_map(|(index, &value)| {
            let z_score = (value - mean) / std_dev;
            (z_score.abs() > z_threshold).then_some(Outlier {
                index,
                value,
                z_score,
            })
        })
        .collect()
}

/// Trailing mean over `window` values, aligned to the tail.
///
/// The output has `values.len() - window + 1` entries; it is empty when
/// `window` is zero or larger than the input.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 || window > values.len() {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.mean())
        .collect()
}

/// Every unordered pair `(metrics[i], metrics[j])` with `i < j`.
pub fn all_pairs(metrics: &[Metric]) -> Vec<(Metric, Metric)> {
    metrics
        .iter()
        .enumerate()
        .flat_map(|(i, &a)| metrics[i + 1..].iter().map(move |&b| (a, b)))
        .filter(|(a, b)| a != b)
        .collect()
}

fn round_to_hundredths(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn is_constant(values: &[f64]) -> bool {
    values.windows(2).all(|w| w[0] == w[1])
}

fn build_profile(
    metric: Metric,
    index: usize,
    sprint: &SprintMetrics,
    counts: Vec<(String, u32)>,
) -> Option<DistributionResult> {
    let total: u64 = counts.iter().map(|(_, count)| u64::from(*count)).sum();
    if total == 0 {
        return None;
    }

    let buckets = counts
        .into_iter()
        .map(|(label, count)| BucketShare {
            label,
            count,
            share: f64::from(count) / total as f64,
        })
        .collect();

    Some(DistributionResult {
        metric,
        sprint_index: index,
        sprint_id: sprint.sprint_id.clone(),
        total,
        buckets,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::BugEnvironmentCounts;
    use std::collections::BTreeMap;

    fn series_with(f: impl Fn(&mut SprintMetrics, usize)) -> Vec<SprintMetrics> {
        (0..5)
            .map(|i| {
                let mut sprint = SprintMetrics::new(format!("s{}", i + 1), format!("Sprint {}", i + 1), i as u32 + 1);
                f(&mut sprint, i);
                sprint
            })
            .collect()
    }

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_review_time_trend_is_high_and_up() {
        let review = [20.0, 20.0, 20.0, 20.0, 30.0];
        let series = series_with(|s, i| s.review_time = Some(review[i]));

        let trends = StatisticalAnalyzer::new().analyze_trends(&series, &[Metric::ReviewTime]);
        assert_eq!(trends.len(), 1);
        let trend = &trends[0];
        assert_eq!(trend.direction, Direction::Up);
        assert!(approx(trend.change_percent, 50.0));
        assert_eq!(trend.significance, Significance::High);
        assert!(approx(trend.magnitude, 0.5));
        assert_eq!((trend.previous_sprint_index, trend.current_sprint_index), (3, 4));
    }

    #[test]
    fn test_constant_metric_is_stable() {
        let series = series_with(|s, _| s.team_happiness = Some(8.0));
        let trends = StatisticalAnalyzer::new().analyze_trends(&series, &[Metric::TeamHappiness]);
        assert_eq!(trends[0].direction, Direction::Stable);
        assert_eq!(trends[0].significance, Significance::Low);
    }

    #[test]
    fn test_stable_overrides_sign_below_threshold() {
        let trend = compute_trend(Metric::CodingTime, &[(0, 10.0), (1, 8.1)], 0.2).unwrap();
        assert_eq!(trend.direction, Direction::Stable);
        assert!(trend.change_percent < 0.0);

        // exactly at the threshold is a trend, not noise
        let trend = compute_trend(Metric::CodingTime, &[(0, 20.0), (1, 24.0)], 0.2).unwrap();
        assert_eq!(trend.direction, Direction::Up);
        assert_eq!(trend.significance, Significance::Medium);

        let trend = compute_trend(Metric::CodingTime, &[(0, 20.0), (1, 10.0)], 0.2).unwrap();
        assert_eq!(trend.direction, Direction::Down);
        assert_eq!(trend.significance, Significance::High);
    }

    #[test]
    fn test_trend_skips_zero_previous_and_missing_data() {
        assert_eq!(
            compute_trend(Metric::BugsProd, &[(0, 0.0), (1, 4.0)], 0.2),
            Err(SkipReason::ZeroDenominator)
        );
        assert_eq!(
            compute_trend(Metric::BugsProd, &[(0, 4.0)], 0.2),
            Err(SkipReason::InsufficientData { required: 2, actual: 1 })
        );

        let series = series_with(|s, i| {
            if i == 4 {
                s.bugs_prod = Some(3.0);
            }
        });
        assert!(StatisticalAnalyzer::new()
            .analyze_trends(&series, &[Metric::BugsProd])
            .is_empty());
    }

    #[test]
    fn test_trend_uses_most_recent_non_missing_values() {
        let values = [Some(10.0), Some(12.0), None, Some(18.0), None];
        let series = series_with(|s, i| s.testing_time = values[i]);

        let trend = &StatisticalAnalyzer::new().analyze_trends(&series, &[Metric::TestingTime])[0];
        assert!(approx(trend.previous_value, 12.0));
        assert!(approx(trend.current_value, 18.0));
        assert_eq!((trend.previous_sprint_index, trend.current_sprint_index), (1, 3));
    }

    #[test]
    fn test_trend_output_follows_requested_order() {
        let series = series_with(|s, i| {
            s.review_time = Some(10.0 + i as f64);
            s.coding_time = Some(5.0 + i as f64);
        });
        let trends = StatisticalAnalyzer::new()
            .analyze_trends(&series, &[Metric::ReviewTime, Metric::TeamHappiness, Metric::CodingTime]);
        let metrics: Vec<_> = trends.iter().map(|t| t.metric).collect();
        assert_eq!(metrics, vec![Metric::ReviewTime, Metric::CodingTime]);
    }

    #[test]
    fn test_correlation_scenario_is_strong_and_significant() {
        let review = [20.0, 20.0, 20.0, 20.0, 30.0];
        let defects = [0.10, 0.10, 0.10, 0.10, 0.20];
        let series = series_with(|s, i| {
            s.review_time = Some(review[i]);
            s.defect_rate_production = Some(defects[i]);
        });

        let results = StatisticalAnalyzer::new()
            .analyze_correlations(&series, &[(Metric::ReviewTime, Metric::DefectRateProduction)]);
        assert_eq!(results.len(), 1);
        let c = &results[0];
        assert!(c.coefficient > 0.999);
        assert!(c.coefficient <= 1.0);
        assert!(c.is_strong);
        assert!(c.is_significant);
        assert_eq!(c.sample_size, 5);
    }

    #[test]
    fn test_correlation_uses_pairwise_deletion() {
        let xs = [Some(1.0), Some(2.0), None, Some(4.0), Some(5.0)];
        let ys = [Some(2.0), None, Some(6.0), Some(8.0), Some(10.0)];
        let series = series_with(|s, i| {
            s.coding_time = xs[i];
            s.review_time = ys[i];
        });

        let results = StatisticalAnalyzer::new()
            .analyze_correlations(&series, &[(Metric::CodingTime, Metric::ReviewTime)]);
        assert_eq!(results[0].sample_size, 3);
        assert!(approx(results[0].coefficient, 1.0));
    }

    #[test]
    fn test_correlation_skips_short_and_constant_vectors() {
        let xs = [Some(1.0), Some(2.0), None, None, None];
        let series = series_with(|s, i| {
            s.coding_time = xs[i];
            s.review_time = Some(i as f64);
            s.team_happiness = Some(7.0);
        });

        let results = StatisticalAnalyzer::new().analyze_correlations(
            &series,
            &[
                (Metric::CodingTime, Metric::ReviewTime),
                (Metric::TeamHappiness, Metric::ReviewTime),
            ],
        );
        assert!(results.is_empty());
        assert_eq!(pearson(&[0.1, 0.1, 0.1], &[1.0, 2.0, 3.0]), Err(SkipReason::ZeroVariance));
    }

    #[test]
    fn test_detect_anomalies_uses_sample_stdev() {
        let values = [10.0, 10.0, 10.0, 10.0, 10.0, 10.0, 30.0];
        let flags = detect_anomalies(&values, 2.0);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].index, 6);
        // mean 12.857, sample stdev 7.559
        assert!((flags[0].z_score - 2.268).abs() < 1e-3);
    }

    #[test]
    fn test_detect_anomalies_degenerate_inputs() {
        assert!(detect_anomalies(&[5.0, 5.0, 5.0, 5.0], 2.0).is_empty());
        assert!(detect_anomalies(&[0.1, 0.1, 0.1], 0.5).is_empty());
        assert!(detect_anomalies(&[1.0, 100.0], 0.1).is_empty());
    }

    #[test]
    fn test_series_anomalies_map_back_to_sprints() {
        let values = [Some(2.0), None, Some(2.0), Some(2.0), Some(2.0)];
        let mut series = series_with(|s, i| s.open_bugs_count = values[i]);
        series.push(SprintMetrics {
            open_bugs_count: Some(2.0),
            ..SprintMetrics::new("s6", "Sprint 6", 6)
        });
        series.push(SprintMetrics {
            open_bugs_count: Some(12.0),
            ..SprintMetrics::new("s7", "Sprint 7", 7)
        });

        let flags = StatisticalAnalyzer::new().detect_series_anomalies(&series, &[Metric::OpenBugsCount]);
        assert_eq!(flags.len(), 1);
        assert_eq!(flags[0].sprint_index, 6);
        assert_eq!(flags[0].sprint_id, "s7");
    }

    #[test]
    fn test_moving_average_is_tail_aligned() {
        assert_eq!(moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3), vec![2.0, 3.0, 4.0]);
        assert_eq!(moving_average(&[1.0, 2.0], 1), vec![1.0, 2.0]);
        assert!(moving_average(&[1.0, 2.0], 3).is_empty());
        assert!(moving_average(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_decimal_boundary_change_is_not_stable() {
        let rising = compute_trend(Metric::DefectRateProduction, &[(0, 0.10), (1, 0.12)], 0.2).unwrap();
        assert_eq!(rising.change_percent, 20.0);
        assert_eq!(rising.direction, Direction::Up);
        assert_eq!(rising.significance, Significance::Medium);

        let falling = compute_trend(Metric::DefectRateProduction, &[(0, 0.10), (1, 0.08)], 0.2).unwrap();
        assert_eq!(falling.change_percent, -20.0);
        assert_eq!(falling.direction, Direction::Down);

        let just_below = compute_trend(Metric::DefectRateProduction, &[(0, 0.10), (1, 0.1199)], 0.2).unwrap();
        assert_eq!(just_below.direction, Direction::Stable);
    }

    #[test]
    fn test_all_pairs() {
        let pairs = all_pairs(&[Metric::ReviewTime, Metric::CodingTime, Metric::TestingTime]);
        assert_eq!(
            pairs,
            vec![
                (Metric::ReviewTime, Metric::CodingTime),
                (Metric::ReviewTime, Metric::TestingTime),
                (Metric::CodingTime, Metric::TestingTime),
            ]
        );
    }

    #[test]
    fn test_distribution_profiles_use_latest_sprint() {
        let series = series_with(|s, i| {
            if i < 4 {
                let mut buckets = BTreeMap::new();
                buckets.insert("1".to_string(), 5);
                buckets.insert("2".to_string(), 3);
                buckets.insert("8".to_string(), i as u32);
                s.story_point_distribution = Some(buckets);
            }
            if i == 2 {
                s.bugs_by_environment = Some(BugEnvironmentCounts {
                    prod: Some(3),
                    test: Some(1),
                    ..Default::default()
                });
            }
        });

        let profiles = StatisticalAnalyzer::new().profile_distributions(&series);
        assert_eq!(profiles.len(), 2);

        let stories = &profiles[0];
        assert_eq!(stories.metric, Metric::StoryPointDistribution);
        assert_eq!(stories.sprint_index, 3);
        assert_eq!(stories.total, 11);
        assert_eq!(stories.bucket("8").map(|b| b.count), Some(3));

        let bugs = &profiles[1];
        assert_eq!(bugs.metric, Metric::BugsByEnvironment);
        assert_eq!(bugs.sprint_id, "s3");
        assert!(approx(bugs.bucket("prod").map(|b| b.share).unwrap_or_default(), 0.75));
    }

    #[test]
    fn test_distribution_total_does_not_overflow_bucket_width() {
        let series = series_with(|s, i| {
            if i == 4 {
                let mut buckets = BTreeMap::new();
                buckets.insert("1".to_string(), u32::MAX);
                buckets.insert("8".to_string(), 5);
                s.story_point_distribution = Some(buckets);
                s.bugs_by_environment = Some(BugEnvironmentCounts {
                    prod: Some(u32::MAX),
                    test: Some(u32::MAX),
                    ..Default::default()
                });
            }
        });

        let profiles = StatisticalAnalyzer::new().profile_distributions(&series);
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].total, u64::from(u32::MAX) + 5);
        assert!(profiles[0].buckets.iter().all(|b| b.share.is_finite() && (0.0..=1.0).contains(&b.share)));
        assert_eq!(profiles[1].total, 2 * u64::from(u32::MAX));
        assert!(approx(profiles[1].bucket("prod").map(|b| b.share).unwrap_or_default(), 0.5));
    }
}
