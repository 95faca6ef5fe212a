//! Chat-completions enricher against a mock endpoint.

use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use retro_insights::{
    contracts::NarrativeSource, AnalysisConfig, ChatCompletionsEnricher, ChatConfig, EnrichmentError,
    EnrichmentRequest, NarrativeEnricher, ReportAssembler, SprintMetrics,
};

fn review_bottleneck_series() -> Vec<SprintMetrics> {
    let review = [20.0, 20.0, 20.0, 20.0, 30.0];
    let defects = [0.10, 0.10, 0.10, 0.10, 0.20];
    (0..5)
        .map(|i| SprintMetrics {
            review_time: Some(review[i]),
            defect_rate_production: Some(defects[i]),
            ..SprintMetrics::new(format!("s{}", i + 1), format!("Sprint {}", i + 1), i as u32 + 1)
        })
        .collect()
}

fn reply(content: &str) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

fn enricher(server: &MockServer) -> ChatCompletionsEnricher {
    ChatCompletionsEnricher::new(ChatConfig {
        base_url: Url::parse(&server.uri()).unwrap(),
        api_key: Some("sk-test".to_string()),
        timeout: Duration::from_secs(5),
        ..ChatConfig::default()
    })
    .unwrap()
}

#[tokio::test]
async fn enriched_report_takes_llm_text() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_string_contains("concise headline"))
        .respond_with(reply("\"Review time up 50% and defects follow\""))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Rewrite the description"))
        .respond_with(reply("Reviews queue up late in the sprint."))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("exactly three retrospective questions"))
        .respond_with(reply(
            "1. Where do reviews wait?\n2. What would shorten the queue?\n3. Which limit do we try first?",
        ))
        .mount(&server)
        .await;

    let assembler = ReportAssembler::new(AnalysisConfig::default()).unwrap();
    let series = review_bottleneck_series();
    let template = assembler.assemble(&series);
    let report = assembler
        .assemble_enriched(&series, &enricher(&server), Some("Team of five".to_string()))
        .await;

    assert_eq!(report.narrative_source, NarrativeSource::Enriched);
    assert_eq!(report.headline, "Review time up 50% and defects follow");
    assert_eq!(
        report.hypotheses[0].enhanced_description.as_deref(),
        Some("Reviews queue up late in the sprint.")
    );
    assert_eq!(report.hypotheses[0].description, template.hypotheses[0].description);
    assert_eq!(
        report.facilitation_guide.retro_questions,
        vec![
            "Where do reviews wait?",
            "What would shorten the queue?",
            "Which limit do we try first?",
        ]
    );
    assert_eq!(report.trends, template.trends);
    assert_eq!(report.suggested_experiments, template.suggested_experiments);
}

#[tokio::test]
async fn server_error_falls_back_to_template() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream down"))
        .mount(&server)
        .await;

    let assembler = ReportAssembler::new(AnalysisConfig::default()).unwrap();
    let series = review_bottleneck_series();
    let template = assembler.assemble(&series);
    let report = assembler.assemble_enriched(&series, &enricher(&server), None).await;

    assert_eq!(report.narrative_source, NarrativeSource::Template);
    assert_eq!(report.headline, template.headline);
    assert_eq!(report.trends, template.trends);
    assert_eq!(report.correlations, template.correlations);
    assert_eq!(report.hypotheses, template.hypotheses);
    assert_eq!(report.suggested_experiments, template.suggested_experiments);
    assert_eq!(report.facilitation_guide, template.facilitation_guide);
    assert_eq!(report.inputs_hash, template.inputs_hash);
}

#[tokio::test]
async fn failed_description_keeps_other_enriched_fields() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("concise headline"))
        .respond_with(reply("Reviews are holding the sprint back"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("Rewrite the description"))
        .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("exactly three retrospective questions"))
        .respond_with(reply("1. Why?\n2. What now?\n3. Who owns it?"))
        .mount(&server)
        .await;

    let assembler = ReportAssembler::new(AnalysisConfig::default()).unwrap();
    let series = review_bottleneck_series();
    let template = assembler.assemble(&series);
    let report = assembler.assemble_enriched(&series, &enricher(&server), None).await;

    assert_eq!(report.narrative_source, NarrativeSource::Enriched);
    assert_eq!(report.headline, "Reviews are holding the sprint back");
    assert!(report.hypotheses.iter().all(|h| h.enhanced_description.is_none()));
    assert_eq!(report.hypotheses, template.hypotheses);
    assert_eq!(
        report.facilitation_guide.retro_questions,
        vec!["Why?", "What now?", "Who owns it?"]
    );
}

#[tokio::test]
async fn server_error_surfaces_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
        .mount(&server)
        .await;

    let request = EnrichmentRequest {
        headline: "h".to_string(),
        key_trends: Vec::new(),
        hypotheses: Vec::new(),
        custom_context: None,
    };
    let err = enricher(&server).enrich(&request).await.unwrap_err();
    assert!(matches!(err, EnrichmentError::Response { status: 503, .. }));
}

#[tokio::test]
async fn reply_without_choices_is_malformed() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "choices": [] })))
        .mount(&server)
        .await;

    let request = EnrichmentRequest {
        headline: "h".to_string(),
        key_trends: Vec::new(),
        hypotheses: Vec::new(),
        custom_context: None,
    };
    let err = enricher(&server).enrich(&request).await.unwrap_err();
    assert!(matches!(err, EnrichmentError::Malformed(_)));
}

#[tokio::test]
async fn too_few_questions_keep_template_questions() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_string_contains("exactly three retrospective questions"))
        .respond_with(reply("1. Only one question?"))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(reply("Some text"))
        .mount(&server)
        .await;

    let assembler = ReportAssembler::new(AnalysisConfig::default()).unwrap();
    let series = review_bottleneck_series();
    let template = assembler.assemble(&series);
    let report = assembler.assemble_enriched(&series, &enricher(&server), None).await;

    assert_eq!(report.narrative_source, NarrativeSource::Enriched);
    assert_eq!(report.headline, "Some text");
    assert_eq!(report.facilitation_guide.retro_questions, template.facilitation_guide.retro_questions);
}
