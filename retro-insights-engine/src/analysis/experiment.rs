//! Experiment Engine
//!
//! Maps ranked hypotheses to time-boxed experiments through an explicit
//! lookup table keyed by [`HypothesisType`].
//!
//! - Templates are taken round-robin: the first template of every hypothesis,
//!   then the second ones, until `max_experiments` is reached.
//! - `duration_sprints` grows by one per `duration_step` of trend magnitude and
//!   is capped at `max_duration_sprints`.
//! - Hypotheses without a type, or whose type has no template, are skipped.

use std::collections::BTreeMap;
use tracing::{debug, info, instrument};

use crate::config::ExperimentConfig;
use crate::contracts::{ExperimentSuggestion, Hypothesis, HypothesisType, Metric};

/// Static description of one experiment.
#[derive(Debug, Clone, PartialEq)]
pub struct ExperimentTemplate {
    pub title: &'static str,
    pub description: &'static str,

    /// Appended after "Addressing: <hypothesis title>."
    pub rationale: &'static str,

    /// Duration before magnitude scaling
    pub base_duration_sprints: u32,

    pub success_metrics: &'static [Metric],
    pub implementation_steps: &'static [&'static str],
    pub expected_outcome: &'static str,
}

/// Lookup table from hypothesis type to experiment templates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExperimentCatalogue {
    templates: BTreeMap<HypothesisType, Vec<ExperimentTemplate>>,
}

impl ExperimentCatalogue {
    /// An empty catalogue.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Register a template; templates for a type keep registration order.
    pub fn register(mut self, hypothesis_type: HypothesisType, template: ExperimentTemplate) -> Self {
        self.templates.entry(hypothesis_type).or_default().push(template);
        self
    }

    /// Templates for a type, empty when none are registered.
    pub fn templates_for(&self, hypothesis_type: HypothesisType) -> &[ExperimentTemplate] {
        self.templates
            .get(&hypothesis_type)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Types without any registered template.
    pub fn missing_types(&self) -> Vec<HypothesisType> {
        HypothesisType::ALL
            .into_iter()
            .filter(|t| self.templates_for(*t).is_empty())
            .collect()
    }

    /// The built-in table covering every hypothesis type.
    pub fn standard() -> Self {
        Self::empty()
            .register(
                HypothesisType::ReviewBottleneck,
                ExperimentTemplate {
                    title: "Cap Work in Progress in Code Review",
                    description: "Limit the review column to two or three items. Anyone about to \
                        start new work first picks up a waiting review.",
                    rationale: "A WIP limit turns review into a pull system, so the queue cannot \
                        grow faster than the team clears it.",
                    base_duration_sprints: 1,
                    success_metrics: &[Metric::ReviewTime, Metric::ItemsCarriedOver],
                    implementation_steps: &[
                        "Set a WIP limit of 2-3 items on the review column",
                        "Agree as a team: review before starting new work",
                        "Pair each author with a review buddy",
                        "Check review wait times daily during the first week",
                        "Hold a mid-sprint check-in on the limit",
                    ],
                    expected_outcome: "Review time drops by 20-30% and work flows more evenly",
                },
            )
            .register(
                HypothesisType::ReviewBottleneck,
                ExperimentTemplate {
                    title: "Keep Pull Requests Small",
                    description: "Aim for pull requests a reviewer can finish in under thirty \
                        minutes; split anything larger before asking for review.",
                    rationale: "Small changes are reviewed sooner and more thoroughly, which \
                        shortens the queue and catches more defects.",
                    base_duration_sprints: 1,
                    success_metrics: &[Metric::ReviewTime, Metric::DefectRateProduction],
                    implementation_steps: &[
                        "Agree on a soft size limit for pull requests",
                        "Split large changes behind feature flags",
                        "Flag oversized pull requests at stand-up",
                        "Compare review time for small and large changes at sprint end",
                    ],
                    expected_outcome: "Most pull requests reviewed within a day",
                },
            )
            .register(
                HypothesisType::StorySizing,
                ExperimentTemplate {
                    title: "Slice Large Stories Before Planning",
                    description: "Any story estimated above five points must be split into \
                        independently shippable slices with their own acceptance criteria.",
                    rationale: "Large stories carry the most uncertainty; smaller slices make \
                        sprint commitments predictable.",
                    base_duration_sprints: 1,
                    success_metrics: &[
                        Metric::ItemsOutOfSprintPercent,
                        Metric::ItemsCarriedOver,
                        Metric::StoryPointDistribution,
                    ],
                    implementation_steps: &[
                        "List backlog stories above five points",
                        "Run a slicing workshop on the top candidates",
                        "Adopt an INVEST checklist for refinement",
                        "Reject unsliced large stories at sprint planning",
                        "Track the share of stories at three points or less",
                    ],
                    expected_outcome: "Carryover falls by 10-15% and the sprint forecast holds",
                },
            )
            .register(
                HypothesisType::QualityDegradation,
                ExperimentTemplate {
                    title: "Testing Checklist Before Review",
                    description: "Authors complete a short testing checklist (unit, integration \
                        and a manual smoke test) before requesting review.",
                    rationale: "Defects slip through when testing is rushed; a checklist makes \
                        the minimum bar explicit and visible.",
                    base_duration_sprints: 1,
                    success_metrics: &[
                        Metric::DefectRateProduction,
                        Metric::DefectRateAll,
                        Metric::TestingTime,
                    ],
                    implementation_steps: &[
                        "Draft the checklist with the whole team",
                        "Add it to the pull request template",
                        "Extend the definition of ready for review",
                        "Review defect trends mid-sprint and at sprint end",
                    ],
                    expected_outcome: "Production defect rate falls by 20-30%",
                },
            )
            .register(
                HypothesisType::QualityDegradation,
                ExperimentTemplate {
                    title: "Root-Cause Review of Escaped Defects",
                    description: "Spend thirty minutes each week tracing the latest escaped \
                        defects back to the stage that should have caught them.",
                    rationale: "Knowing where defects slip through focuses testing effort where \
                        it pays off.",
                    base_duration_sprints: 1,
                    success_metrics: &[Metric::DefectRateProduction, Metric::BugsProd],
                    implementation_steps: &[
                        "Pick the three most recent production defects",
                        "Run a 5 Whys on each",
                        "Record the missed stage and a preventive action",
                        "Follow up on actions at the next retrospective",
                    ],
                    expected_outcome: "Fewer repeat defects of the same kind",
                },
            )
            .register(
                HypothesisType::TeamMorale,
                ExperimentTemplate {
                    title: "Weekly Team Health Check-in",
                    description: "A fifteen minute weekly check-in on workload, blockers and \
                        mood, with a safe space to raise concerns early.",
                    rationale: "Declining morale usually grows from frustrations nobody voiced; \
                        a regular slot surfaces them while they are still small.",
                    base_duration_sprints: 2,
                    success_metrics: &[Metric::TeamHappiness],
                    implementation_steps: &[
                        "Schedule a recurring 15 minute check-in",
                        "Use a fixed format: highs, lows, blockers, shout-outs",
                        "Rotate the facilitator every week",
                        "Track raised issues and their follow-up",
                        "Ask the team after two sprints whether to keep it",
                    ],
                    expected_outcome: "Happiness recovers by 10-15% and issues surface earlier",
                },
            )
            .register(
                HypothesisType::WorkflowEfficiency,
                ExperimentTemplate {
                    title: "Pair on Complex Work",
                    description: "Stories of five or more points, or touching critical systems, \
                        are built in pairs or as a mob.",
                    rationale: "Pairing cuts rework and spreads knowledge, which offsets slower \
                        individual phases.",
                    base_duration_sprints: 1,
                    success_metrics: &[
                        Metric::CompletionRatio,
                        Metric::CodingTime,
                        Metric::ReviewTime,
                    ],
                    implementation_steps: &[
                        "Pick three to five complex stories for pairing",
                        "Block two to four hour pairing sessions",
                        "Rotate pairs to spread knowledge",
                        "Compare elapsed time with solo work",
                        "Collect feedback on the sessions",
                    ],
                    expected_outcome: "Completion ratio recovers and cycle time drops by 15-20%",
                },
            )
            .register(
                HypothesisType::DefectPattern,
                ExperimentTemplate {
                    title: "Close Coverage Gaps Behind Escaped Bugs",
                    description: "For every bug found in the watched environment, add the \
                        missing automated test before closing the ticket.",
                    rationale: "Each escaped bug marks a hole in the test suite; closing holes \
                        one by one shifts detection to earlier stages.",
                    base_duration_sprints: 1,
                    success_metrics: &[Metric::BugsByEnvironment, Metric::BugsProd],
                    implementation_steps: &[
                        "Tag escaped bugs with the stage that should have caught them",
                        "Require a regression test in the fix",
                        "Review the environment split at sprint end",
                    ],
                    expected_outcome: "Share of bugs found late falls below the alert threshold",
                },
            )
    }
}

/// Derives experiments from ranked hypotheses.
#[derive(Debug, Clone)]
pub struct ExperimentEngine {
    config: ExperimentConfig,
    catalogue: ExperimentCatalogue,
}

impl Default for ExperimentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl ExperimentEngine {
    /// Create an engine over the standard catalogue with default settings.
    pub fn new() -> Self {
        Self::with_config(ExperimentConfig::default())
    }

    /// Create an engine over the standard catalogue.
    pub fn with_config(config: ExperimentConfig) -> Self {
        Self::with_catalogue(config, ExperimentCatalogue::standard())
    }

    /// Create an engine over a custom catalogue.
    pub fn with_catalogue(config: ExperimentConfig, catalogue: ExperimentCatalogue) -> Self {
        Self { config, catalogue }
    }

    pub fn catalogue(&self) -> &ExperimentCatalogue {
        &self.catalogue
    }

    /// Experiments for `hypotheses`, in rank order, at most `max_experiments`.
    #[instrument(skip(self, hypotheses), fields(hypotheses = hypotheses.len()))]
    pub fn suggest(&self, hypotheses: &[Hypothesis]) -> Vec<ExperimentSuggestion> {
        let plans: Vec<(usize, &Hypothesis, HypothesisType, &[ExperimentTemplate])> = hypotheses
            .iter()
            .enumerate()
            .filter_map(|(index, hypothesis)| {
                let Some(hypothesis_type) = hypothesis.hypothesis_type else {
                    debug!(title = %hypothesis.title, "Hypothesis without type skipped");
                    return None;
                };
                let templates = self.catalogue.templates_for(hypothesis_type);
                if templates.is_empty() {
                    debug!(hypothesis_type = %hypothesis_type, "No experiment template registered");
                    return None;
                }
                Some((index, hypothesis, hypothesis_type, templates))
            })
            .collect();

        let rounds = plans.iter().map(|(_, _, _, t)| t.len()).max().unwrap_or(0);
        let mut experiments = Vec::new();

        'rounds: for round in 0..rounds {
            for (index, hypothesis, hypothesis_type, templates) in &plans {
                if experiments.len() >= self.config.max_experiments {
                    break 'rounds;
                }
                if let Some(template) = templates.get(round) {
                    experiments.push(self.build(template, hypothesis, *hypothesis_type, *index));
                }
            }
        }

        info!(experiments = experiments.len(), "Experiments suggested");
        experiments
    }

    /// Sprints to run an experiment for, given the driving trend magnitude.
    pub fn scaled_duration(&self, base_duration_sprints: u32, trend_magnitude: f64) -> u32 {
        let extra = if trend_magnitude.is_finite() && trend_magnitude > 0.0 {
            (trend_magnitude / self.config.duration_step).floor() as u32
        } else {
            0
        };
        base_duration_sprints
            .saturating_add(extra)
            .min(self.config.max_duration_sprints)
            .max(1)
    }

    fn build(
        &self,
        template: &ExperimentTemplate,
        hypothesis: &Hypothesis,
        hypothesis_type: HypothesisType,
        index: usize,
    ) -> ExperimentSuggestion {
        let mut success_metrics = template.success_metrics.to_vec();
        for metric in &hypothesis.affected_metrics {
            if !success_metrics.contains(metric) {
                success_metrics.push(*metric);
            }
        }

        ExperimentSuggestion {
            title: template.title.to_string(),
            description: template.description.to_string(),
            rationale: format!("Addressing: {}. {}", hypothesis.title, template.rationale),
            duration_sprints: self.scaled_duration(template.base_duration_sprints, hypothesis.trend_magnitude),
            success_metrics,
            implementation_steps: template
                .implementation_steps
                .iter()
                .map(|s| s.to_string())
                .collect(),
            expected_outcome: template.expected_outcome.to_string(),
            hypothesis_type,
            related_hypothesis_index: index,
        }
    }
}
