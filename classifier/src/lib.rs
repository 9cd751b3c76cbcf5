//! # classifier
//!
//! The intent classifier (spec §2 item 5, §4.4): one structured-output model
//! call per query, parsed into an [`IntentDecision`] and cached by a hash of
//! its inputs. Grounded in the teacher's degrade-not-propagate error style
//! (`llm-client`'s provider errors never bubble past the call site that can
//! absorb them) and in `memory::strategies`' small-pure-function-per-concern
//! shape for the parsing/confidence-rubric logic.

use agent_core::{Complexity, Intent, IntentDecision, Language};
use llm::{ChatOutcome, ChatRequest, LlmClient};
use persistence::Cache;
use prompt::ChatMessage;
use serde::Deserialize;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};

const SYSTEM_PROMPT: &str = "You are an intent classifier for a place-discovery and \
itinerary-planning assistant. Given the user's latest query, its language, and an optional \
summary of the conversation so far, respond with ONLY a JSON object of the shape \
{\"intent\": \"SEARCH\"|\"RECOMMEND\"|\"PLAN\"|\"CHITCHAT\", \"confidence\": 0.0-1.0, \
\"complexity\": \"low\"|\"medium\"|\"high\", \"reasoning\": \"short explanation\"}. \
Use PLAN for multi-stop itinerary requests, SEARCH for single-location lookups, RECOMMEND for \
filtered suggestions, CHITCHAT for small talk. Use high complexity for multi-stop planning, \
temporal constraints, or group coordination; medium for filtered recommendations; low otherwise.";

#[derive(Debug, Deserialize)]
struct RawDecision {
    intent: String,
    confidence: f32,
    complexity: String,
    reasoning: String,
}

impl RawDecision {
    fn into_decision(self) -> Option<IntentDecision> {
        let intent = match self.intent.to_ascii_uppercase().as_str() {
            "SEARCH" => Intent::Search,
            "RECOMMEND" => Intent::Recommend,
            "PLAN" => Intent::Plan,
            "CHITCHAT" => Intent::Chitchat,
            _ => return None,
        };
        let complexity = match self.complexity.to_ascii_lowercase().as_str() {
            "low" => Complexity::Low,
            "medium" => Complexity::Medium,
            "high" => Complexity::High,
            _ => return None,
        };
        Some(IntentDecision {
            intent,
            confidence: self.confidence.clamp(0.0, 1.0),
            complexity,
            reasoning: self.reasoning,
        })
    }
}

/// Applies spec §4.4/§8's confidence rubric: below 0.5, the decision
/// degrades to chitchat/low regardless of what the model proposed, keeping
/// the reported confidence and reasoning for observability.
fn apply_confidence_rubric(mut decision: IntentDecision) -> IntentDecision {
    if decision.confidence < 0.5 {
        decision.intent = Intent::Chitchat;
        decision.complexity = Complexity::Low;
    }
    decision
}

/// Deterministic cache key input: normalized query, language, and a coarse
/// digest of the summary (spec §4.4: "hash(normalized query, language,
/// coarse summary hash)"). Stdlib `DefaultHasher` only — the teacher adds no
/// extra hashing crate for pure-logic cache keys (`DESIGN.md`).
fn cache_key(query: &str, language: Language, summary: Option<&str>) -> String {
    let normalized = query.trim().to_lowercase();
    let mut hasher = DefaultHasher::new();
    normalized.hash(&mut hasher);
    language.as_code().hash(&mut hasher);
    summary.unwrap_or("").hash(&mut hasher);
    format!("agent:intent:{:x}", hasher.finish())
}

pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    cache: Arc<dyn Cache>,
    model: String,
    cache_ttl: Duration,
}

impl IntentClassifier {
    pub fn new(llm: Arc<dyn LlmClient>, cache: Arc<dyn Cache>, model: impl Into<String>, cache_ttl: Duration) -> Self {
        Self {
            llm,
            cache,
            model: model.into(),
            cache_ttl,
        }
    }

    /// Classifies a query (spec §4.4). Cache hits return the stored decision
    /// verbatim (spec §8: "classifying the same input twice in one TTL
    /// window returns identical `IntentDecision`"). Model errors and
    /// unparseable responses degrade to [`IntentDecision::fallback`] rather
    /// than failing the request (spec §7 `CLASSIFICATION_FAILED` is soft).
    #[instrument(skip(self, query, summary))]
    pub async fn classify(
        &self,
        query: &str,
        language: Language,
        summary: Option<&str>,
    ) -> IntentDecision {
        let key = cache_key(query, language, summary);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                if let Ok(decision) = serde_json::from_str::<IntentDecision>(&cached) {
                    return decision;
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "intent cache read failed, classifying fresh"),
        }

        let decision = match self.call_model(query, language, summary).await {
            Some(decision) => apply_confidence_rubric(decision),
            None => IntentDecision::fallback("classification model unavailable or unparsable"),
        };

        if let Ok(serialized) = serde_json::to_string(&decision) {
            if let Err(err) = self.cache.set_with_ttl(&key, serialized, self.cache_ttl).await {
                warn!(error = %err, "intent cache write failed, continuing without cache");
            }
        }

        decision
    }

    async fn call_model(
        &self,
        query: &str,
        language: Language,
        summary: Option<&str>,
    ) -> Option<IntentDecision> {
        let mut user_content = format!("Language: {}\nQuery: {query}", language.as_code());
        if let Some(summary) = summary {
            user_content.push_str(&format!("\nConversation summary: {summary}"));
        }

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(user_content)],
            tools: Vec::new(),
            temperature: 0.0,
            max_tokens: 200,
        };

        let response = match self.llm.complete(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "intent classification call failed");
                return None;
            }
        };

        let text = match response.outcome {
            ChatOutcome::Final { text } => text,
            ChatOutcome::ToolCalls(_) => {
                warn!("intent classifier unexpectedly received tool calls");
                return None;
            }
        };

        match serde_json::from_str::<RawDecision>(text.trim()) {
            Ok(raw) => raw.into_decision(),
            Err(err) => {
                warn!(error = %err, "intent classifier response was not valid JSON");
                None
            }
        }
    }
}
