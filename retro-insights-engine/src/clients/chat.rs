//! Chat Completions Enricher
//!
//! Narrative enrichment through any OpenAI-compatible
//! `POST {base_url}/chat/completions` endpoint.
//!
//! # Environment
//!
//! - `RETRO_LLM_BASE_URL` (default `https://api.openai.com/v1/`)
//! - `RETRO_LLM_API_KEY` (required)
//! - `RETRO_LLM_MODEL` (default `gpt-4o-mini`)
//! - `RETRO_LLM_TIMEOUT_SECS` (default 30)

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};
use url::Url;

use super::enrichment::{three_questions, Enrichment, EnrichmentError, EnrichmentRequest, NarrativeEnricher};
use crate::contracts::Hypothesis;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1/";
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Chat client configuration.
#[derive(Debug, Clone)]
pub struct ChatConfig {
    /// Base URL; `chat/completions` is resolved against it
    pub base_url: Url,

    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            base_url: Url::parse(DEFAULT_BASE_URL).expect("Valid default URL"),
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 500,
            temperature: 0.7,
        }
    }
}

impl ChatConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Result<Self, EnrichmentError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Create config from any variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, EnrichmentError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup("RETRO_LLM_BASE_URL") {
            config.base_url =
                Url::parse(&raw).map_err(|e| EnrichmentError::Configuration(format!("RETRO_LLM_BASE_URL: {}", e)))?;
        }
        config.api_key = lookup("RETRO_LLM_API_KEY").filter(|k| !k.trim().is_empty());
        if let Some(model) = lookup("RETRO_LLM_MODEL") {
            config.model = model;
        }
        if let Some(raw) = lookup("RETRO_LLM_TIMEOUT_SECS") {
            let secs: u64 = raw
                .parse()
                .map_err(|_| EnrichmentError::Configuration(format!("RETRO_LLM_TIMEOUT_SECS: '{}' is not a number", raw)))?;
            config.timeout = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// HTTP enricher for chat-completions endpoints.
#[derive(Clone)]
pub struct ChatCompletionsEnricher {
    client: Client,
    config: ChatConfig,
    api_key: String,
    endpoint: Url,
}

impl ChatCompletionsEnricher {
    /// Create a new enricher. Fails without an API key.
    pub fn new(config: ChatConfig) -> Result<Self, EnrichmentError> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| EnrichmentError::NotConfigured("RETRO_LLM_API_KEY is not set".to_string()))?;

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EnrichmentError::Configuration(e.to_string()))?;

        let mut base = config.base_url.clone();
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        let endpoint = base
            .join("chat/completions")
            .map_err(|e| EnrichmentError::Configuration(e.to_string()))?;

        Ok(Self {
            client,
            config,
            api_key,
            endpoint,
        })
    }

    /// Create an enricher from environment variables.
    pub fn from_env() -> Result<Self, EnrichmentError> {
        Self::new(ChatConfig::from_env()?)
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    #[instrument(skip(self, system_prompt, user_prompt), fields(model = %self.config.model))]
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, EnrichmentError> {
        let body = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) {
                warn!(status = status.as_u16(), "Chat endpoint rejected credentials");
            }
            return Err(EnrichmentError::Response {
                status: status.as_u16(),
                message,
            });
        }

        let text = response.text().await?;
        debug!(bytes = text.len(), "Chat response received");
        let parsed: ChatResponse = serde_json::from_str(&text)?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| EnrichmentError::Malformed("response has no message content".to_string()))
    }
}

#[async_trait]
impl NarrativeEnricher for ChatCompletionsEnricher {
    fn name(&self) -> &str {
        "chat-completions"
    }

    /// Each field is requested separately. A failed call keeps the template
    /// text for that field only; the error is returned when nothing came back.
    #[instrument(skip(self, request), fields(hypotheses = request.hypotheses.len()))]
    async fn enrich(&self, request: &EnrichmentRequest) -> Result<Enrichment, EnrichmentError> {
        let mut last_error = None;

        let headline = self
            .complete(
                "You are an expert Agile coach analyzing team metrics.",
                &headline_prompt(request),
            )
            .await;
        let headline = field("headline", headline, &mut last_error)
            .map(|h| h.trim_matches('"').trim().to_string())
            .filter(|h| !h.is_empty());

        let mut hypothesis_descriptions = Vec::with_capacity(request.hypotheses.len());
        for hypothesis in &request.hypotheses {
            let description = self
                .complete(
                    "You are an expert Agile coach helping teams improve.",
                    &description_prompt(hypothesis, request.custom_context.as_deref()),
                )
                .await;
            hypothesis_descriptions.push(field(&hypothesis.title, description, &mut last_error));
        }

        let questions = self
            .complete(
                "You are an expert Scrum Master facilitating retrospectives.",
                &questions_prompt(request),
            )
            .await;
        let retro_questions = field("retro_questions", questions, &mut last_error).and_then(|text| {
            let questions = three_questions(&text);
            if questions.is_none() {
                debug!("Fewer than three questions in reply, keeping template questions");
            }
            questions
        });

        let enrichment = Enrichment {
            headline,
            hypothesis_descriptions,
            retro_questions,
        };

        if enrichment.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        info!(enricher = self.name(), "Narrative enriched");
        Ok(enrichment)
    }
}

/// Keep a successful reply, or log the failure and fall back for this field.
fn field(name: &str, result: Result<String, EnrichmentError>, last_error: &mut Option<EnrichmentError>) -> Option<String> {
    match result {
        Ok(text) => Some(text),
        Err(e) => {
            warn!(field = name, error = %e, "Enrichment call failed, keeping template text");
            *last_error = Some(e);
            None
        }
    }
}

fn headline_prompt(request: &EnrichmentRequest) -> String {
    let mut prompt = String::from("Key trends:\n");
    for trend in &request.key_trends {
        prompt.push_str(&format!(
            "- {}: {} {:.0}%\n",
            trend.metric.title(),
            trend.direction,
            trend.change_percent.abs()
        ));
    }
    if let Some(top) = request.hypotheses.first() {
        prompt.push_str(&format!("\nTop hypothesis: {}\n", top.title));
    }
    prompt.push_str(
        "\nWrite one concise headline (at most two lines) for a sprint retrospective report \
         that names the most important trend or issue. Reply with the headline only.",
    );
    prompt
}

fn description_prompt(hypothesis: &Hypothesis, custom_context: Option<&str>) -> String {
    let mut prompt = format!(
        "Hypothesis: {}\nCurrent description: {}\nEvidence:\n",
        hypothesis.title, hypothesis.description
    );
    for evidence in &hypothesis.evidence {
        prompt.push_str(&format!("- {}: {} ({})\n", evidence.metric.title(), evidence.trend, evidence.value));
    }
    if let Some(context) = custom_context {
        prompt.push_str(&format!("\nTeam context: {}\n", context));
    }
    prompt.push_str(
        "\nRewrite the description so a Scrum team can act on it in a retrospective. \
         Two or three sentences.",
    );
    prompt
}

fn questions_prompt(request: &EnrichmentRequest) -> String {
    let mut prompt = String::from("Hypotheses about the team's recent sprints:\n\n");
    for (i, hypothesis) in request.hypotheses.iter().enumerate() {
        prompt.push_str(&format!("{}. {}: {}\n", i + 1, hypothesis.title, hypothesis.description));
    }
    prompt.push_str(
        "\nWrite exactly three retrospective questions: one on root causes, one on concrete \
         improvements, one on committing to an experiment. Return them numbered, one per line.",
    );
    prompt
}
