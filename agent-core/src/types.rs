//! Core domain types shared by every stage of the pipeline (spec §3).

use crate::error::ErrorKind;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::collections::HashMap;
use uuid::Uuid;

/// Languages the assistant is configured to understand (spec §6).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Es,
    En,
    Ca,
    Gl,
}

impl Language {
    pub fn as_code(&self) -> &'static str {
        match self {
            Language::Es => "es",
            Language::En => "en",
            Language::Ca => "ca",
            Language::Gl => "gl",
        }
    }

    pub fn parse(code: &str) -> Option<Self> {
        match code {
            "es" => Some(Language::Es),
            "en" => Some(Language::En),
            "ca" => Some(Language::Ca),
            "gl" => Some(Language::Gl),
            _ => None,
        }
    }
}

/// Geographic coordinates, validated at context-build time (lat/lon ranges).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// Per-user preferences, upserted (spec §3 `UserPreferences`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPreferences {
    pub user_id: String,
    pub preferred_language: Option<Language>,
    pub preferred_model: Option<String>,
    pub budget_mode: bool,
    pub favorites: HashMap<String, Json>,
}

impl UserPreferences {
    pub fn empty(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            preferred_language: None,
            preferred_model: None,
            budget_mode: false,
            favorites: HashMap::new(),
        }
    }
}

/// Immutable, validated request context produced once per request (spec §4.1).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedContext {
    pub user_id: String,
    pub session_id: Uuid,
    pub language: Language,
    pub location: Option<Coordinates>,
    pub preferences: UserPreferences,
}

/// Coarse intent category (spec GLOSSARY).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Intent {
    Search,
    Recommend,
    Plan,
    Chitchat,
}

impl Intent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Intent::Search => "SEARCH",
            Intent::Recommend => "RECOMMEND",
            Intent::Plan => "PLAN",
            Intent::Chitchat => "CHITCHAT",
        }
    }
}

/// Reasoning-effort rubric label (spec GLOSSARY).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Complexity {
    Low,
    Medium,
    High,
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Low => "low",
            Complexity::Medium => "medium",
            Complexity::High => "high",
        }
    }
}

/// An append-only conversation turn (spec §3 `ConversationTurn`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub session_id: Uuid,
    pub user_id: String,
    pub query: String,
    pub response: String,
    pub intent: Intent,
    pub model: String,
    pub duration_ms: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub created_at: DateTime<Utc>,
    pub extra_metadata: Json,
}

impl ConversationTurn {
    /// Extracts `extra_metadata.plan_params` as an object, or an empty one.
    pub fn plan_params(&self) -> serde_json::Map<String, Json> {
        self.extra_metadata
            .get("plan_params")
            .and_then(|v| v.as_object())
            .cloned()
            .unwrap_or_default()
    }
}

/// Output of the intent classifier (spec §3 `IntentDecision`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IntentDecision {
    pub intent: Intent,
    pub confidence: f32,
    pub complexity: Complexity,
    pub reasoning: String,
}

impl IntentDecision {
    /// The degraded default used on classifier failure or low confidence
    /// (spec §4.4, §7): chitchat, low complexity, zero confidence.
    pub fn fallback(reasoning: impl Into<String>) -> Self {
        Self {
            intent: Intent::Chitchat,
            confidence: 0.0,
            complexity: Complexity::Low,
            reasoning: reasoning.into(),
        }
    }
}

/// Output of the model router (spec §3 `ModelDecision`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelDecision {
    pub provider: String,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub input_cost_per_token: f64,
    pub output_cost_per_token: f64,
}

/// A single tool invocation within one reason-act execution (spec §3 `ToolCall`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub step_index: u32,
    pub tool_name: String,
    pub arguments: Json,
    pub duration_ms: u64,
    pub observation: ToolObservation,
}

/// Outcome of a single tool invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ToolObservation {
    Ok { result: Json },
    Error { message: String },
}

/// Per-query telemetry, created at request start and finalized at the end
/// (spec §3 `QueryMetrics`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryMetrics {
    pub request_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub intent: Option<Intent>,
    pub complexity: Option<Complexity>,
    pub model: Option<String>,
    pub tool_call_count: u32,
    pub reasoning_step_count: u32,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
}

impl QueryMetrics {
    pub fn start(request_id: Uuid) -> Self {
        Self {
            request_id,
            started_at: Utc::now(),
            finished_at: None,
            intent: None,
            complexity: None,
            model: None,
            tool_call_count: 0,
            reasoning_step_count: 0,
            input_tokens: 0,
            output_tokens: 0,
            cost_usd: 0.0,
            success: false,
            error_kind: None,
        }
    }

    pub fn duration_ms(&self) -> i64 {
        match self.finished_at {
            Some(end) => (end - self.started_at).num_milliseconds(),
            None => 0,
        }
    }
}
