//! Experiment Contracts

use serde::{Deserialize, Serialize};

use super::{HypothesisType, Metric};

/// A concrete, time-boxed intervention tied to a hypothesis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExperimentSuggestion {
    pub title: String,
    pub description: String,

    /// Why this experiment addresses the hypothesis
    pub rationale: String,

    /// Sprints to run the experiment for, at least 1
    pub duration_sprints: u32,

    /// Metrics to watch
    pub success_metrics: Vec<Metric>,

    /// Ordered steps
    pub implementation_steps: Vec<String>,

    pub expected_outcome: String,

    /// Template of the hypothesis this experiment derives from
    pub hypothesis_type: HypothesisType,

    /// Position of that hypothesis in the ranked list
    pub related_hypothesis_index: usize,
}
