//! Request/response JSON shapes (spec §6), field names matching the spec
//! exactly so the pipeline can be driven directly from the wire format the
//! (out-of-scope) HTTP surface would deserialize into.

use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use tools::{Itinerary, Place};
use uuid::Uuid;

#[derive(Debug, Clone, Deserialize)]
pub struct LocationInput {
    pub lat: f64,
    pub lon: f64,
}

/// Pipeline entry request (spec §6).
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineRequest {
    pub user_id: String,
    pub session_id: Uuid,
    pub query: String,
    pub language: String,
    pub location: Option<LocationInput>,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct ResponseMetadata {
    pub tool_calls: u32,
    pub reasoning_steps: u32,
    pub estimated_cost_usd: f64,
}

/// Pipeline entry response (spec §6). `detected_emotion`/`emotion_confidence`
/// are carried as optional metadata fields only (spec §9 open question:
/// emotion detection is not wired into routing or prompt construction by
/// this engine, so they are always `None` here; a future extractor can
/// populate them without changing this shape).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineResponse {
    pub response_text: String,
    pub places: Option<Vec<Place>>,
    pub itinerary: Option<Itinerary>,
    pub intention: String,
    pub confidence: f32,
    pub complexity: String,
    pub model_used: String,
    pub processing_time_ms: i64,
    pub detected_emotion: Option<String>,
    pub emotion_confidence: Option<f32>,
    pub metadata: ResponseMetadata,
}

/// User-visible failure shape (spec §7): `{ error, message }`, never
/// leaking internal identifiers or stack content.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineErrorResponse {
    pub error: &'static str,
    pub message: String,
}

/// The two ways a pipeline run can end: a rendered response, or a
/// structured error the caller can localize/display directly.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum PipelineOutcome {
    Success(PipelineResponse),
    Error(PipelineErrorResponse),
}

impl PipelineOutcome {
    pub fn as_json(&self) -> Json {
        serde_json::to_value(self).unwrap_or(Json::Null)
    }
}
