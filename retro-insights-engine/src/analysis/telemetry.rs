//! Pipeline Telemetry
//!
//! Typed events for one report run, emitted through `tracing` spans plus
//! `metrics` counters and histograms so any installed recorder can collect them.
//!
//! | Metric                        | Kind      | Labels               |
//! |-------------------------------|-----------|----------------------|
//! | `retro_pipeline_events_total` | counter   | `event_type`, `stage`|
//! | `retro_stage_duration_ms`     | histogram | `stage`              |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, info, span, warn, Level};
use uuid::Uuid;

/// Pipeline stage an event belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Analysis,
    Hypotheses,
    Experiments,
    Narrative,
    Enrichment,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Analysis => write!(f, "analysis"),
            Self::Hypotheses => write!(f, "hypotheses"),
            Self::Experiments => write!(f, "experiments"),
            Self::Narrative => write!(f, "narrative"),
            Self::Enrichment => write!(f, "enrichment"),
        }
    }
}

/// Telemetry event types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelemetryEventType {
    StageStarted,
    StageCompleted,
    /// A statistic or pattern was omitted
    ItemSkipped,
    /// Enrichment failed and template text was kept
    EnrichmentFallback,
}

impl fmt::Display for TelemetryEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageStarted => write!(f, "stage_started"),
            Self::StageCompleted => write!(f, "stage_completed"),
            Self::ItemSkipped => write!(f, "item_skipped"),
            Self::EnrichmentFallback => write!(f, "enrichment_fallback"),
        }
    }
}

/// One telemetry record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelemetryEvent {
    pub event_type: TelemetryEventType,
    pub stage: PipelineStage,

    /// Correlates all events of one report run
    pub run_id: Uuid,

    pub timestamp: DateTime<Utc>,
    pub metadata: serde_json::Value,
}

/// Telemetry emitter scoped to one report run.
#[derive(Debug, Clone)]
pub struct PipelineTelemetry {
    run_id: Uuid,
    enabled: bool,
}

impl Default for PipelineTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl PipelineTelemetry {
    /// Create an enabled emitter with a fresh run id.
    pub fn new() -> Self {
        Self {
            run_id: Uuid::new_v4(),
            enabled: true,
        }
    }

    /// Create an emitter that drops every event.
    pub fn disabled() -> Self {
        Self {
            run_id: Uuid::nil(),
            enabled: false,
        }
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Emit a telemetry event.
    pub fn emit(&self, event: TelemetryEvent) {
        if !self.enabled {
            return;
        }

        let span = span!(
            Level::INFO,
            "retro_pipeline",
            run_id = %self.run_id,
            stage = %event.stage,
        );
        let _guard = span.enter();

        match event.event_type {
            TelemetryEventType::StageStarted => {
                debug!(event_type = %event.event_type, metadata = %event.metadata, "Stage started");
            }
            TelemetryEventType::StageCompleted => {
                info!(event_type = %event.event_type, metadata = %event.metadata, "Stage completed");
            }
            TelemetryEventType::ItemSkipped => {
                debug!(event_type = %event.event_type, metadata = %event.metadata, "Item skipped");
            }
            TelemetryEventType::EnrichmentFallback => {
                warn!(
                    event_type = %event.event_type,
                    metadata = %event.metadata,
                    "Enrichment unavailable, keeping template narrative"
                );
            }
        }

        self.record_metrics(&event);
    }

    fn record_metrics(&self, event: &TelemetryEvent) {
        let stage = event.stage.to_string();

        metrics::counter!(
            "retro_pipeline_events_total",
            "event_type" => event.event_type.to_string(),
            "stage" => stage.clone()
        )
        .increment(1);

        if let Some(duration_ms) = event.metadata.get("duration_ms").and_then(|v| v.as_u64()) {
            metrics::histogram!("retro_stage_duration_ms", "stage" => stage).record(duration_ms as f64);
        }
    }

    fn event(&self, event_type: TelemetryEventType, stage: PipelineStage, metadata: serde_json::Value) {
        self.emit(TelemetryEvent {
            event_type,
            stage,
            run_id: self.run_id,
            timestamp: Utc::now(),
            metadata,
        });
    }

    pub fn stage_started(&self, stage: PipelineStage) {
        self.event(TelemetryEventType::StageStarted, stage, serde_json::json!({}));
    }

    /// `items` is the number of records the stage produced.
    pub fn stage_completed(&self, stage: PipelineStage, duration_ms: u64, items: usize) {
        self.event(
            TelemetryEventType::StageCompleted,
            stage,
            serde_json::json!({
                "duration_ms": duration_ms,
                "items": items,
            }),
        );
    }

    pub fn item_skipped(&self, stage: PipelineStage, item: &str, reason: &str) {
        self.event(
            TelemetryEventType::ItemSkipped,
            stage,
            serde_json::json!({
                "item": item,
                "reason": reason,
            }),
        );
    }

    pub fn enrichment_fallback(&self, error: &str) {
        self.event(
            TelemetryEventType::EnrichmentFallback,
            PipelineStage::Enrichment,
            serde_json::json!({ "error": error }),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_type_display() {
        assert_eq!(TelemetryEventType::StageCompleted.to_string(), "stage_completed");
        assert_eq!(TelemetryEventType::EnrichmentFallback.to_string(), "enrichment_fallback");
        assert_eq!(PipelineStage::Hypotheses.to_string(), "hypotheses");
    }

    #[test]
    fn test_disabled_telemetry_is_silent() {
        let telemetry = PipelineTelemetry::disabled();
        assert!(!telemetry.is_enabled());
        assert!(telemetry.run_id().is_nil());
        telemetry.stage_completed(PipelineStage::Analysis, 3, 10);
    }

    #[test]
    fn test_runs_get_distinct_ids() {
        assert_ne!(PipelineTelemetry::new().run_id(), PipelineTelemetry::new().run_id());
    }

    #[test]
    fn test_event_serialization() {
        let event = TelemetryEvent {
            event_type: TelemetryEventType::ItemSkipped,
            stage: PipelineStage::Analysis,
            run_id: Uuid::nil(),
            timestamp: Utc::now(),
            metadata: serde_json::json!({ "item": "review_time", "reason": "zero variance" }),
        };
        let json = serde_json::to_string(&event).expect("serializes");
        assert!(json.contains("item_skipped"));
        assert!(json.contains("\"stage\":\"analysis\""));
    }
}
