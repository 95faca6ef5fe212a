//! Property-based tests for the statistical guards and ranking using proptest

use proptest::prelude::*;
use rust_decimal::Decimal;

use retro_insights::analysis::distributions::pearson_p_value;
use retro_insights::analysis::hypothesis::rank;
use retro_insights::analysis::statistical::{compute_trend, detect_anomalies, moving_average, pearson};
use retro_insights::contracts::{ConfidenceLevel, Direction, Hypothesis, HypothesisType, Metric, SprintMetrics};
use retro_insights::{AnalysisConfig, ReportAssembler, StatisticalAnalyzer};

fn finite_value() -> impl Strategy<Value = f64> {
    -1_000.0f64..1_000.0
}

fn sprint_strategy() -> impl Strategy<Value = SprintMetrics> {
    (
        proptest::option::of(0.0f64..10.0),
        proptest::option::of(0.0f64..60.0),
        proptest::option::of(0.0f64..1.0),
        proptest::option::of(0.0f64..40.0),
        proptest::option::of(0.0f64..40.0),
    )
        .prop_map(|(happiness, review, defects, planned, completed)| SprintMetrics {
            team_happiness: happiness,
            review_time: review,
            defect_rate_production: defects,
            story_points_planned: planned,
            story_points_completed: completed,
            ..SprintMetrics::new("s", "Sprint", 0)
        })
}

fn hypothesis(hypothesis_type: HypothesisType, score_hundredths: i64) -> Hypothesis {
    let score = Decimal::new(score_hundredths, 2);
    Hypothesis {
        hypothesis_type: Some(hypothesis_type),
        title: hypothesis_type.to_string(),
        description: String::new(),
        enhanced_description: None,
        confidence: ConfidenceLevel::from_score(score),
        confidence_score: score,
        potential_impact: String::new(),
        affected_metrics: Vec::new(),
        evidence: Vec::new(),
        trend_magnitude: 0.0,
    }
}

proptest! {
    #[test]
    fn trend_with_zero_previous_is_omitted(current in finite_value(), older in finite_value()) {
        let observations = [(0, older), (1, 0.0), (2, current)];
        prop_assert!(compute_trend(Metric::ReviewTime, &observations, 0.2).is_err());
        prop_assert!(compute_trend(Metric::ReviewTime, &observations[2..], 0.2).is_err());
    }

    #[test]
    fn trends_are_finite_and_classified(previous in 0.01f64..1_000.0, current in finite_value(), threshold in 0.01f64..1.0) {
        let trend = compute_trend(Metric::CodingTime, &[(0, previous), (1, current)], threshold).unwrap();
        prop_assert!(trend.change_percent.is_finite());
        prop_assert!(trend.magnitude >= 0.0);
        if trend.magnitude < threshold {
            prop_assert_eq!(trend.direction, Direction::Stable);
        } else if current > previous {
            prop_assert_eq!(trend.direction, Direction::Up);
        } else {
            prop_assert_eq!(trend.direction, Direction::Down);
        }
    }

    #[test]
    fn short_series_never_correlate(series in proptest::collection::vec(sprint_strategy(), 0..3)) {
        let pairs = [(Metric::ReviewTime, Metric::DefectRateProduction), (Metric::TeamHappiness, Metric::ReviewTime)];
        prop_assert!(StatisticalAnalyzer::new().analyze_correlations(&series, &pairs).is_empty());
    }

    #[test]
    fn correlation_is_bounded(pairs in proptest::collection::vec((finite_value(), finite_value()), 3..20)) {
        let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.into_iter().unzip();
        if let Ok(r) = pearson(&xs, &ys) {
            prop_assert!((-1.0..=1.0).contains(&r));
            let p = pearson_p_value(r, xs.len());
            prop_assert!((0.0..=1.0).contains(&p));
        }
    }

    #[test]
    fn constant_vectors_have_no_anomalies(value in finite_value(), len in 0usize..30, z in 0.1f64..4.0) {
        let values = vec![value; len];
        prop_assert!(detect_anomalies(&values, z).is_empty());
    }

    #[test]
    fn moving_average_is_tail_aligned(values in proptest::collection::vec(finite_value(), 0..20), window in 0usize..8) {
        let averages = moving_average(&values, window);
        if window == 0 || window > values.len() {
            prop_assert!(averages.is_empty());
        } else {
            prop_assert_eq!(averages.len(), values.len() - window + 1);
            let last: f64 = values[values.len() - window..].iter().sum::<f64>() / window as f64;
            prop_assert!((averages[averages.len() - 1] - last).abs() < 1e-6);
        }
    }

    #[test]
    fn ranking_is_stable_for_ties(scores in proptest::collection::vec(50i64..=100, 6)) {
        let hypotheses: Vec<Hypothesis> = HypothesisType::ALL
            .iter()
            .zip(&scores)
            .rev()
            .map(|(t, s)| hypothesis(*t, *s))
            .collect();

        let ranked = rank(hypotheses.clone(), 6);
        for pair in ranked.windows(2) {
            let (a, b) = (&pair[0], &pair[1]);
            prop_assert!(a.confidence_score >= b.confidence_score);
            if a.confidence_score == b.confidence_score {
                prop_assert!(a.hypothesis_type < b.hypothesis_type);
            }
        }
        prop_assert_eq!(rank(hypotheses, 6), ranked);
    }

    #[test]
    fn pipeline_output_is_finite_and_bounded(series in proptest::collection::vec(sprint_strategy(), 0..8)) {
        let config = AnalysisConfig::default();
        let report = ReportAssembler::new(config.clone()).unwrap().assemble(&series);

        prop_assert!(report.hypotheses.len() <= config.hypothesis.max_hypotheses);
        prop_assert!(report.suggested_experiments.len() <= config.experiment.max_experiments);
        prop_assert_eq!(report.hypotheses.is_empty(), report.suggested_experiments.is_empty());
        prop_assert!(report.trends.iter().all(|t| t.change_percent.is_finite() && t.magnitude.is_finite()));
        prop_assert!(report.correlations.iter().all(|c| c.coefficient.is_finite() && c.p_value.is_finite()));
        prop_assert!(report.anomalies.iter().all(|a| a.z_score.is_finite()));
        prop_assert!(report.hypotheses.iter().all(|h| h.confidence_score <= Decimal::ONE));

        let again = StatisticalAnalyzer::new().analyze(&series, &Metric::SERIES);
        prop_assert_eq!(again.trends, report.trends);
    }
}
