//! Narrative Enrichment
//!
//! The optional collaborator that rewrites headline, hypothesis descriptions
//! and retro questions. Enrichment only ever replaces text: numbers, evidence
//! and ranking of a report are fixed before it runs.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::contracts::{Direction, Hypothesis, RetrospectiveReport, TrendResult};

/// Errors from an enrichment collaborator. All of them are recoverable.
#[derive(Debug, Error)]
pub enum EnrichmentError {
    #[error("Enrichment not configured: {0}")]
    NotConfigured(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Request error: {0}")]
    Request(String),

    #[error("Response error: status={status}, message={message}")]
    Response { status: u16, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timeout error")]
    Timeout,
}

impl From<reqwest::Error> for EnrichmentError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            EnrichmentError::Timeout
        } else if err.is_connect() {
            EnrichmentError::Connection(err.to_string())
        } else if err.is_decode() {
            EnrichmentError::Malformed(err.to_string())
        } else {
            EnrichmentError::Request(err.to_string())
        }
    }
}

impl From<serde_json::Error> for EnrichmentError {
    fn from(err: serde_json::Error) -> Self {
        EnrichmentError::Malformed(err.to_string())
    }
}

/// What the enricher gets to work with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentRequest {
    /// Template headline, for reference
    pub headline: String,

    /// Non-stable trends, largest change first, at most three
    pub key_trends: Vec<TrendResult>,

    /// Ranked hypotheses
    pub hypotheses: Vec<Hypothesis>,

    /// Free text about the team or project supplied by the caller
    pub custom_context: Option<String>,
}

impl EnrichmentRequest {
    /// Build a request from an assembled report.
    pub fn from_report(report: &RetrospectiveReport, custom_context: Option<String>) -> Self {
        let mut key_trends: Vec<TrendResult> = report
            .trends
            .iter()
            .filter(|t| t.direction != Direction::Stable)
            .cloned()
            .collect();
        key_trends.sort_by(|a, b| b.change_percent.abs().total_cmp(&a.change_percent.abs()));
        key_trends.truncate(3);

        Self {
            headline: report.headline.clone(),
            key_trends,
            hypotheses: report.hypotheses.clone(),
            custom_context: custom_context.filter(|c| !c.trim().is_empty()),
        }
    }
}

/// Text returned by an enricher. `None` keeps the template text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Enrichment {
    pub headline: Option<String>,

    /// Indexed like `EnrichmentRequest::hypotheses`
    pub hypothesis_descriptions: Vec<Option<String>>,

    /// Used only when it holds at least three questions
    pub retro_questions: Option<Vec<String>>,
}

impl Enrichment {
    pub fn is_empty(&self) -> bool {
        self.headline.is_none()
            && self.hypothesis_descriptions.iter().all(Option::is_none)
            && self.retro_questions.is_none()
    }
}

/// A source of narrative text.
#[async_trait]
pub trait NarrativeEnricher: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &str;

    async fn enrich(&self, request: &EnrichmentRequest) -> Result<Enrichment, EnrichmentError>;
}

/// Extract questions from numbered or bulleted lines.
pub fn parse_questions(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| {
            line.chars()
                .next()
                .is_some_and(|c| c.is_ascii_digit() || matches!(c, '-' | '*' | '•'))
        })
        .map(|line| {
            line.trim_start_matches(|c: char| {
                c.is_ascii_digit() || matches!(c, '.' | '-' | ')' | '*' | '•' | ' ')
            })
            .trim()
            .to_string()
        })
        .filter(|q| !q.is_empty())
        .collect()
}

/// Three questions parsed from `text`, or `None` when fewer are present.
pub fn three_questions(text: &str) -> Option<Vec<String>> {
    let mut questions = parse_questions(text);
    if questions.len() < 3 {
        return None;
    }
    questions.truncate(3);
    Some(questions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numbered_and_bulleted_lines() {
        let text = "Here are some questions:\n1. Why is review slow?\n2) What blocks us?\n- Which experiment first?\n\n";
        assert_eq!(
            parse_questions(text),
            vec!["Why is review slow?", "What blocks us?", "Which experiment first?"]
        );
    }

    #[test]
    fn test_three_questions_requires_three() {
        assert!(three_questions("1. Only one?").is_none());
        let four = "1. a?\n2. b?\n3. c?\n4. d?";
        assert_eq!(three_questions(four), Some(vec!["a?".into(), "b?".into(), "c?".into()]));
    }

    #[test]
    fn test_empty_enrichment() {
        assert!(Enrichment::default().is_empty());
        let e = Enrichment {
            hypothesis_descriptions: vec![None, Some("x".into())],
            ..Default::default()
        };
        assert!(!e.is_empty());
    }
}
