//! Template narrative.
//!
//! Headline, summary and facilitation text built from the numeric results
//! alone. This is what a report carries when enrichment is skipped or fails.

use crate::contracts::{
    ConfidenceLevel, Direction, FacilitationGuide, Hypothesis, SprintMetrics, TrendResult,
};

/// Headline when nothing fired.
pub const NEUTRAL_HEADLINE: &str = "Sprint metrics analysis: Review key trends and patterns";

/// Steps of the 15 minute retrospective agenda.
pub const AGENDA_15MIN: [&str; 4] = [
    "0-2 min: Silent read of the headline and key metrics",
    "2-7 min: Discuss the top two hypotheses: do they ring true, what is missing?",
    "7-12 min: Walk through the suggested experiments and pick the most promising",
    "12-15 min: Commit to one experiment and name its owners",
];

/// Headline from the largest non-stable trend and the top hypothesis.
pub fn headline(trends: &[TrendResult], hypotheses: &[Hypothesis]) -> String {
    let Some(top) = hypotheses.first() else {
        return NEUTRAL_HEADLINE.to_string();
    };

    let largest = trends
        .iter()
        .filter(|t| t.direction != Direction::Stable)
        .fold(None::<&TrendResult>, |best, t| match best {
            Some(b) if b.change_percent.abs() >= t.change_percent.abs() => Some(b),
            _ => Some(t),
        });

    match largest {
        Some(trend) => format!(
            "{} {} {:.0}% - {}",
            trend.metric.title(),
            trend.direction,
            trend.change_percent.abs(),
            top.title
        ),
        None => format!("{} - Key insight from recent sprints", top.title),
    }
}

/// Three discussion questions.
pub fn retro_questions(hypotheses: &[Hypothesis]) -> Vec<String> {
    match hypotheses.first() {
        None => vec![
            "What went well in the last sprint?".to_string(),
            "What could we improve?".to_string(),
            "What will we try differently next sprint?".to_string(),
        ],
        Some(top) => vec![
            format!("What is contributing to {}?", top.title.to_lowercase()),
            "How is this pattern affecting the team's effectiveness and well-being?".to_string(),
            "Which single experiment could we run next sprint to address it?".to_string(),
        ],
    }
}

/// Facilitation guide around a set of retro questions.
pub fn facilitation_guide(hypotheses: &[Hypothesis], retro_questions: Vec<String>) -> FacilitationGuide {
    FacilitationGuide {
        retro_questions,
        agenda_15min: AGENDA_15MIN.iter().map(|s| s.to_string()).collect(),
        focus_areas: hypotheses.iter().map(|h| h.title.clone()).collect(),
    }
}

/// "<first> - <last>", the single name for one sprint, "No sprints" for none.
pub fn sprint_period(series: &[SprintMetrics]) -> String {
    match series {
        [] => "No sprints".to_string(),
        [only] => only.sprint_name.clone(),
        [first, .., last] => format!("{} - {}", first.sprint_name, last.sprint_name),
    }
}

pub fn summary(sprints_analyzed: usize, sprint_period: &str) -> String {
    format!("Analysis of {} sprints ({})", sprints_analyzed, sprint_period)
}

/// Confidence of the top hypothesis; Low when none fired.
pub fn overall_confidence(hypotheses: &[Hypothesis]) -> ConfidenceLevel {
    hypotheses
        .first()
        .map(|h| h.confidence)
        .unwrap_or(ConfidenceLevel::Low)
}
