//! Pattern Template Catalogue
//!
//! Fixed-order registry of tagged pattern matchers. Each matcher is a pure
//! function of the evidence base and configuration; it returns the records
//! that satisfied its trigger (required clauses first, then corroborating
//! clauses, in evaluation order) or `None` when the pattern is absent.
//!
//! Catalogue order breaks ranking ties.

use crate::config::HypothesisConfig;
use crate::contracts::{
    AnomalyFlag, BugEnvironment, CorrelationResult, Direction, DistributionResult, Evidence,
    EvidenceBase, EvidenceSource, HypothesisType, Metric, Significance, TrendResult,
};

/// Signature shared by every pattern matcher.
pub type PatternMatcher = fn(&EvidenceBase, &HypothesisConfig) -> Option<PatternMatch>;

/// A fired pattern before scoring.
#[derive(Debug, Clone, PartialEq)]
pub struct PatternMatch {
    /// Description with the observed numbers filled in
    pub description: String,

    /// Records that satisfied the trigger, in evaluation order
    pub evidence: Vec<Evidence>,
}

/// A registered pattern template.
#[derive(Debug, Clone, Copy)]
pub struct PatternTemplate {
    pub hypothesis_type: HypothesisType,
    pub title: &'static str,
    pub potential_impact: &'static str,
    pub matcher: PatternMatcher,
}

/// The standard catalogue, in tie-break order.
pub static CATALOGUE: [PatternTemplate; 6] = [
    PatternTemplate {
        hypothesis_type: HypothesisType::ReviewBottleneck,
        title: "Review Process Bottleneck",
        potential_impact: "Longer cycle times, growing work in progress, and defects slipping \
            through rushed or stale reviews.",
        matcher: match_review_bottleneck,
    },
    PatternTemplate {
        hypothesis_type: HypothesisType::StorySizing,
        title: "Story Sizing and Slicing Issues",
        potential_impact: "Unpredictable sprint outcomes, recurring carryover, and large items \
            blocking sprint goals.",
        matcher: match_story_sizing,
    },
    PatternTemplate {
        hypothesis_type: HypothesisType::QualityDegradation,
        title: "Quality Assurance Process Degradation",
        potential_impact: "More production incidents, unplanned fix work displacing planned work, \
            and eroding customer trust.",
        matcher: match_quality_degradation,
    },
    PatternTemplate {
        hypothesis_type: HypothesisType::TeamMorale,
        title: "Team Morale and Engagement Concerns",
        potential_impact: "Lower productivity and collaboration, higher attrition risk, and \
            declining code quality.",
        matcher: match_team_morale,
    },
    PatternTemplate {
        hypothesis_type: HypothesisType::WorkflowEfficiency,
        title: "Workflow Efficiency Degradation",
        potential_impact: "Reduced throughput, missed commitments, and less capacity for new work.",
        matcher: match_workflow_efficiency,
    },
    PatternTemplate {
        hypothesis_type: HypothesisType::DefectPattern,
        title: "Testing Coverage Gaps",
        potential_impact: "Customer-facing defects, emergency fixes, and reputational damage.",
        matcher: match_defect_pattern,
    },
];

/// Look up the template registered for a hypothesis type.
pub fn template_for(hypothesis_type: HypothesisType) -> Option<&'static PatternTemplate> {
    CATALOGUE.iter().find(|t| t.hypothesis_type == hypothesis_type)
}

const DEFECT_RATES: [Metric; 2] = [Metric::DefectRateAll, Metric::DefectRateProduction];
const WORKFLOW_PHASES: [Metric; 3] = [Metric::CodingTime, Metric::ReviewTime, Metric::TestingTime];

// =============================================================================
// Matchers
// =============================================================================

fn match_review_bottleneck(base: &EvidenceBase, _config: &HypothesisConfig) -> Option<PatternMatch> {
    let review = moving(base, Metric::ReviewTime, Direction::Up)
        .filter(|t| t.significance >= Significance::Medium)?;

    let mut evidence = vec![trend_evidence(review)];
    evidence.extend(
        DEFECT_RATES
            .iter()
            .filter_map(|&m| moving(base, m, Direction::Up))
            .map(trend_evidence),
    );
    evidence.extend(
        DEFECT_RATES
            .iter()
            .filter_map(|&m| strong(base, Metric::ReviewTime, m))
            .map(|c| correlation_evidence(c, Metric::ReviewTime)),
    );

    if evidence.len() < 2 {
        return None;
    }

    Some(PatternMatch {
        description: format!(
            "Review time has risen {:.1}% ({}) while defect signals worsened. Reviews may be \
             queuing behind limited reviewer capacity or oversized changes, delaying feedback \
             and letting defects through.",
            review.change_percent.abs(),
            Metric::ReviewTime.format_change(review.previous_value, review.current_value),
        ),
        evidence,
    })
}

fn match_story_sizing(base: &EvidenceBase, config: &HypothesisConfig) -> Option<PatternMatch> {
    let carryover: Vec<&TrendResult> = [Metric::ItemsCarriedOver, Metric::ItemsOutOfSprintPercent]
        .iter()
        .filter_map(|&m| moving(base, m, Direction::Up))
        .collect();
    if carryover.is_empty() {
        return None;
    }

    let profile = base.distribution(Metric::StoryPointDistribution)?;
    let large_count: u64 = profile
        .buckets
        .iter()
        .filter(|b| is_large_bucket(&b.label, config.large_story_points))
        .map(|b| u64::from(b.count))
        .sum();
    let share = large_count as f64 / profile.total as f64;
    if share < config.large_story_share {
        return None;
    }

    let mut evidence: Vec<Evidence> = carryover.iter().map(|t| trend_evidence(t)).collect();
    evidence.push(distribution_evidence(
        profile,
        share,
        config.large_story_share,
        format!("{:.0}% large stories", share * 100.0),
        format!("{} of {} items sized large", large_count, profile.total),
    ));

    Some(PatternMatch {
        description: format!(
            "Carryover is growing ({}) and {:.0}% of the latest sprint's items are large stories. \
             Work is likely not being sliced small enough, which makes sprint plans unreliable.",
            carryover[0].descriptor(),
            share * 100.0,
        ),
        evidence,
    })
}

fn match_quality_degradation(base: &EvidenceBase, _config: &HypothesisConfig) -> Option<PatternMatch> {
    let rising: Vec<&TrendResult> = DEFECT_RATES
        .iter()
        .filter_map(|&m| moving(base, m, Direction::Up))
        .collect();
    let lead = *rising.first()?;

    let mut evidence: Vec<Evidence> = rising.iter().map(|t| trend_evidence(t)).collect();

    if let Some(testing) = moving(base, Metric::TestingTime, Direction::Down) {
        evidence.push(trend_evidence(testing));
    }
    for trend in &rising {
        if let Some(c) = strong(base, Metric::TestingTime, trend.metric).filter(|c| c.coefficient < 0.0) {
            evidence.push(correlation_evidence(c, Metric::TestingTime));
        }
    }
    for trend in &rising {
        let spike = base.anomalies.iter().find(|a| {
            a.metric == trend.metric && a.sprint_index == trend.current_sprint_index && a.z_score > 0.0
        });
        if let Some(anomaly) = spike {
            evidence.push(anomaly_evidence(anomaly));
        }
    }

    Some(PatternMatch {
        description: format!(
            "{} has increased by {:.1}% ({}). Testing may be under time pressure or coverage \
             has not kept pace with growing complexity.",
            lead.metric.title(),
            lead.change_percent.abs(),
            lead.metric.format_change(lead.previous_value, lead.current_value),
        ),
        evidence,
    })
}

fn match_team_morale(base: &EvidenceBase, _config: &HypothesisConfig) -> Option<PatternMatch> {
    let happiness = moving(base, Metric::TeamHappiness, Direction::Down)
        .filter(|t| t.significance >= Significance::Medium)?;

    let mut evidence = vec![trend_evidence(happiness)];
    evidence.extend(
        [Metric::ReviewTime, Metric::ItemsCarriedOver]
            .iter()
            .filter_map(|&m| moving(base, m, Direction::Up))
            .map(trend_evidence),
    );
    evidence.extend(
        [Metric::ReviewTime, Metric::ItemsCarriedOver, Metric::CodingTime]
            .iter()
            .filter_map(|&m| strong(base, Metric::TeamHappiness, m))
            .map(|c| correlation_evidence(c, Metric::TeamHappiness)),
    );

    Some(PatternMatch {
        description: format!(
            "Team happiness has declined by {:.1}% ({}). Workload, process friction or outside \
             pressure may be wearing the team down; left alone this tends to show up in quality \
             and retention.",
            happiness.change_percent.abs(),
            Metric::TeamHappiness.format_change(happiness.previous_value, happiness.current_value),
        ),
        evidence,
    })
}

fn match_workflow_efficiency(base: &EvidenceBase, _config: &HypothesisConfig) -> Option<PatternMatch> {
    let ratio = moving(base, Metric::CompletionRatio, Direction::Down)?;

    let slower: Vec<&TrendResult> = WORKFLOW_PHASES
        .iter()
        .filter_map(|&m| moving(base, m, Direction::Up))
        .collect();

    let mut evidence = vec![trend_evidence(ratio)];
    evidence.extend(slower.iter().map(|t| trend_evidence(t)));
    evidence.extend(
        WORKFLOW_PHASES
            .iter()
            .filter_map(|&m| strong(base, Metric::CompletionRatio, m))
            .map(|c| correlation_evidence(c, Metric::CompletionRatio)),
    );

    let phases = if slower.is_empty() {
        "no single phase stands out".to_string()
    } else {
        let names: Vec<String> = slower.iter().map(|t| t.metric.title()).collect();
        format!("slower phases: {}", names.join(", "))
    };

    Some(PatternMatch {
        description: format!(
            "The team completed {:.0}% of planned story points, down from {:.0}% ({}). \
             Complexity, tooling or accumulated technical debt may be eroding throughput.",
            ratio.current_value * 100.0,
            ratio.previous_value * 100.0,
            phases,
        ),
        evidence,
    })
}

fn match_defect_pattern(base: &EvidenceBase, config: &HypothesisConfig) -> Option<PatternMatch> {
    let profile = base.distribution(Metric::BugsByEnvironment)?;
    let environment = config.defect_focus_environment;
    let bucket = profile.bucket(environment.label())?;
    if bucket.count < config.min_bug_count {
        return None;
    }

    let share = f64::from(bucket.count) / profile.total as f64;
    if share <= config.defect_environment_share {
        return None;
    }

    let mut evidence = vec![distribution_evidence(
        profile,
        share,
        config.defect_environment_share,
        format!("{:.0}% of bugs found in {}", share * 100.0, environment.label()),
        format!("{}/{} bugs", bucket.count, profile.total),
    )];
    if environment == BugEnvironment::Prod {
        if let Some(trend) = moving(base, Metric::BugsProd, Direction::Up) {
            evidence.push(trend_evidence(trend));
        }
    }

    Some(PatternMatch {
        description: format!(
            "{:.0}% of the latest sprint's bugs ({} of {}) surfaced in {}. Defects are escaping \
             earlier stages, pointing at gaps in test coverage or test environments.",
            share * 100.0,
            bucket.count,
            profile.total,
            environment.label(),
        ),
        evidence,
    })
}

// =============================================================================
// Helpers
// =============================================================================

fn moving(base: &EvidenceBase, metric: Metric, direction: Direction) -> Option<&TrendResult> {
    base.trend(metric).filter(|t| t.direction == direction)
}

fn strong(base: &EvidenceBase, subject: Metric, other: Metric) -> Option<&CorrelationResult> {
    base.correlation(subject, other).filter(|c| c.is_strong)
}

/// Whether a story-point bucket label counts as a large story.
pub fn is_large_bucket(label: &str, large_story_points: f64) -> bool {
    let label = label.trim().to_ascii_lowercase();
    matches!(label.as_str(), "large" | "xl" | "xxl" | "extra_large")
        || label
            .parse::<f64>()
            .map(|points| points >= large_story_points)
            .unwrap_or(false)
}

fn trend_evidence(trend: &TrendResult) -> Evidence {
    Evidence {
        metric: trend.metric,
        source: EvidenceSource::Trend,
        trend: trend.descriptor(),
        value: trend.metric.format_change(trend.previous_value, trend.current_value),
        significance: trend.significance,
        magnitude: Some(trend.magnitude),
        strong_and_significant: false,
    }
}

/// Correlation evidence is filed under the partner of `subject`.
fn correlation_evidence(correlation: &CorrelationResult, subject: Metric) -> Evidence {
    let strong_and_significant = correlation.is_strong && correlation.is_significant;
    let significance = if strong_and_significant {
        Significance::High
    } else if correlation.is_strong {
        Significance::Medium
    } else {
        Significance::Low
    };

    Evidence {
        metric: correlation.partner_of(subject).unwrap_or(correlation.metric_b),
        source: EvidenceSource::Correlation,
        trend: format!("correlated with {}", subject),
        value: format!("r={:.2}, p={:.3}", correlation.coefficient, correlation.p_value),
        significance,
        magnitude: None,
        strong_and_significant,
    }
}

fn anomaly_evidence(anomaly: &AnomalyFlag) -> Evidence {
    Evidence {
        metric: anomaly.metric,
        source: EvidenceSource::Anomaly,
        trend: format!("spike in {} (z={:.2})", anomaly.sprint_id, anomaly.z_score),
        value: anomaly.metric.format_value(anomaly.value),
        significance: if anomaly.z_score.abs() >= 3.0 {
            Significance::High
        } else {
            Significance::Medium
        },
        magnitude: None,
        strong_and_significant: false,
    }
}

fn distribution_evidence(
    profile: &DistributionResult,
    share: f64,
    threshold: f64,
    trend: String,
    value: String,
) -> Evidence {
    Evidence {
        metric: profile.metric,
        source: EvidenceSource::Distribution,
        trend,
        value,
        significance: Significance::classify(share, threshold),
        magnitude: None,
        strong_and_significant: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::BucketShare;

    fn trend(metric: Metric, previous: f64, current: f64) -> TrendResult {
        let observations = [(0, previous), (1, current)];
        crate::analysis::statistical::compute_trend(metric, &observations, 0.2).expect("trend")
    }

    fn correlation(a: Metric, b: Metric, r: f64, p: f64) -> CorrelationResult {
        CorrelationResult {
            metric_a: a,
            metric_b: b,
            coefficient: r,
            p_value: p,
            sample_size: 5,
            is_strong: r.abs() >= 0.6,
            is_significant: p < 0.05,
        }
    }

    fn profile(metric: Metric, counts: &[(&str, u32)]) -> DistributionResult {
        let total: u64 = counts.iter().map(|(_, c)| u64::from(*c)).sum();
        DistributionResult {
            metric,
            sprint_index: 4,
            sprint_id: "s5".to_string(),
            total,
            buckets: counts
                .iter()
                .map(|(label, count)| BucketShare {
                    label: label.to_string(),
                    count: *count,
                    share: f64::from(*count) / total as f64,
                })
                .collect(),
        }
    }

    fn run(hypothesis_type: HypothesisType, base: &EvidenceBase, config: &HypothesisConfig) -> Option<PatternMatch> {
        let template = template_for(hypothesis_type).expect("registered");
        (template.matcher)(base, config)
    }

    #[test]
    fn test_catalogue_covers_every_type_once_in_order() {
        let types: Vec<_> = CATALOGUE.iter().map(|t| t.hypothesis_type).collect();
        assert_eq!(types, HypothesisType::ALL.to_vec());
    }

    #[test]
    fn test_review_bottleneck_requires_quality_signal() {
        let config = HypothesisConfig::default();
        let mut base = EvidenceBase {
            trends: vec![trend(Metric::ReviewTime, 20.0, 30.0)],
            ..Default::default()
        };
        assert!(run(HypothesisType::ReviewBottleneck, &base, &config).is_none());

        base.correlations
            .push(correlation(Metric::DefectRateAll, Metric::ReviewTime, 0.85, 0.02));
        let matched = run(HypothesisType::ReviewBottleneck, &base, &config).expect("fires");
        assert_eq!(matched.evidence.len(), 2);
        assert_eq!(matched.evidence[1].metric, Metric::DefectRateAll);
        assert_eq!(matched.evidence[1].source, EvidenceSource::Correlation);
        assert!(matched.evidence[1].strong_and_significant);
    }

    #[test]
    fn test_review_bottleneck_evidence_order() {
        let base = EvidenceBase {
            trends: vec![
                trend(Metric::DefectRateProduction, 0.1, 0.2),
                trend(Metric::ReviewTime, 20.0, 30.0),
            ],
            correlations: vec![correlation(
                Metric::ReviewTime,
                Metric::DefectRateProduction,
                0.99,
                0.001,
            )],
            ..Default::default()
        };
        let matched = run(HypothesisType::ReviewBottleneck, &base, &HypothesisConfig::default()).expect("fires");
        let sources: Vec<_> = matched.evidence.iter().map(|e| (e.metric, e.source)).collect();
        assert_eq!(
            sources,
            vec![
                (Metric::ReviewTime, EvidenceSource::Trend),
                (Metric::DefectRateProduction, EvidenceSource::Trend),
                (Metric::DefectRateProduction, EvidenceSource::Correlation),
            ]
        );
        assert_eq!(matched.evidence[0].value, "20.0 → 30.0 hours");
        assert_eq!(matched.evidence[0].trend, "up 50.0%");
    }

    #[test]
    fn test_story_sizing_share_boundary_is_inclusive() {
        let base = EvidenceBase {
            trends: vec![trend(Metric::ItemsCarriedOver, 2.0, 4.0)],
            distributions: vec![profile(
                Metric::StoryPointDistribution,
                &[("1", 5), ("2", 3), ("8", 2)],
            )],
            ..Default::default()
        };

        let at_threshold = HypothesisConfig {
            large_story_share: 0.2,
            ..Default::default()
        };
        assert!(run(HypothesisType::StorySizing, &base, &at_threshold).is_some());

        let above = HypothesisConfig {
            large_story_share: 0.21,
            ..Default::default()
        };
        assert!(run(HypothesisType::StorySizing, &base, &above).is_none());
    }

    #[test]
    fn test_story_sizing_needs_carryover_trend() {
        let base = EvidenceBase {
            distributions: vec![profile(Metric::StoryPointDistribution, &[("1", 5), ("2", 3), ("8", 1)])],
            ..Default::default()
        };
        let permissive = HypothesisConfig {
            large_story_share: 0.0,
            ..Default::default()
        };
        assert!(run(HypothesisType::StorySizing, &base, &permissive).is_none());
    }

    #[test]
    fn test_large_bucket_labels() {
        assert!(is_large_bucket("8", 8.0));
        assert!(is_large_bucket("13", 8.0));
        assert!(!is_large_bucket("5", 8.0));
        assert!(is_large_bucket(" Large ", 8.0));
        assert!(is_large_bucket("XL", 8.0));
        assert!(!is_large_bucket("medium", 8.0));
    }

    #[test]
    fn test_quality_degradation_collects_corroboration() {
        let base = EvidenceBase {
            trends: vec![
                trend(Metric::TestingTime, 10.0, 6.0),
                trend(Metric::DefectRateProduction, 0.1, 0.2),
            ],
            correlations: vec![correlation(
                Metric::TestingTime,
                Metric::DefectRateProduction,
                -0.9,
                0.01,
            )],
            anomalies: vec![AnomalyFlag {
                metric: Metric::DefectRateProduction,
                sprint_index: 1,
                sprint_id: "s2".to_string(),
                value: 0.2,
                z_score: 2.4,
            }],
            ..Default::default()
        };

        let matched = run(HypothesisType::QualityDegradation, &base, &HypothesisConfig::default()).expect("fires");
        let sources: Vec<_> = matched.evidence.iter().map(|e| e.source).collect();
        assert_eq!(
            sources,
            vec![
                EvidenceSource::Trend,
                EvidenceSource::Trend,
                EvidenceSource::Correlation,
                EvidenceSource::Anomaly,
            ]
        );
        assert_eq!(matched.evidence[1].metric, Metric::TestingTime);
    }

    #[test]
    fn test_team_morale_requires_decline() {
        let config = HypothesisConfig::default();
        let stable = EvidenceBase {
            trends: vec![trend(Metric::TeamHappiness, 8.0, 8.0)],
            ..Default::default()
        };
        assert!(run(HypothesisType::TeamMorale, &stable, &config).is_none());

        let declining = EvidenceBase {
            trends: vec![trend(Metric::TeamHappiness, 8.0, 6.0)],
            ..Default::default()
        };
        assert!(run(HypothesisType::TeamMorale, &declining, &config).is_some());
    }

    #[test]
    fn test_workflow_efficiency_on_falling_completion_ratio() {
        let base = EvidenceBase {
            trends: vec![
                trend(Metric::CodingTime, 4.0, 6.0),
                trend(Metric::CompletionRatio, 0.9, 0.6),
            ],
            ..Default::default()
        };
        let matched = run(HypothesisType::WorkflowEfficiency, &base, &HypothesisConfig::default()).expect("fires");
        assert_eq!(matched.evidence[0].metric, Metric::CompletionRatio);
        assert_eq!(matched.evidence[1].metric, Metric::CodingTime);
        assert!(matched.description.contains("Coding Time"));
    }

    #[test]
    fn test_defect_pattern_thresholds() {
        let config = HypothesisConfig::default();
        let concentrated = EvidenceBase {
            distributions: vec![profile(Metric::BugsByEnvironment, &[("prod", 3), ("test", 2)])],
            ..Default::default()
        };
        let matched = run(HypothesisType::DefectPattern, &concentrated, &config).expect("fires");
        assert_eq!(matched.evidence[0].value, "3/5 bugs");

        // 2 of 5 = 0.4, exactly the default share, and only 2 production bugs
        let at_share = EvidenceBase {
            distributions: vec![profile(Metric::BugsByEnvironment, &[("prod", 2), ("test", 3)])],
            ..Default::default()
        };
        assert!(run(HypothesisType::DefectPattern, &at_share, &config).is_none());

        // 4 of 10 = 0.4 with enough production bugs still sits on the boundary
        let boundary = EvidenceBase {
            distributions: vec![profile(Metric::BugsByEnvironment, &[("prod", 4), ("test", 6)])],
            ..Default::default()
        };
        assert!(run(HypothesisType::DefectPattern, &boundary, &config).is_none());

        // Enough bugs overall but too few in production
        let too_few = EvidenceBase {
            distributions: vec![profile(Metric::BugsByEnvironment, &[("prod", 2), ("dev", 1)])],
            ..Default::default()
        };
        assert!(run(HypothesisType::DefectPattern, &too_few, &config).is_none());

        let spread = EvidenceBase {
            distributions: vec![profile(Metric::BugsByEnvironment, &[("prod", 1), ("dev", 4)])],
            ..Default::default()
        };
        assert!(run(HypothesisType::DefectPattern, &spread, &config).is_none());
    }
}
