//! # Context Builder
//!
//! Pure transformer (spec §4.3): given a [`MemoryWindow`], a
//! `ValidatedContext`, and an optional system-prompt base, produces both a
//! model-facing message sequence (via the `prompt` crate's formatting
//! helpers, reused as-is) and an `AgentContext` record carrying token
//! accounting and the extracted plan-parameter map.

use crate::plan::{PlanContextExtractor, PlanParams};
use crate::types::MemoryWindow;
use agent_core::ValidatedContext;
use prompt::ChatMessage;

/// The non-message half of what the context builder produces: everything
/// downstream stages (classifier, router, reason-act executor) need beyond
/// the raw chat messages.
#[derive(Debug, Clone)]
pub struct AgentContext {
    pub window: MemoryWindow,
    pub estimated_tokens: usize,
    pub tokens_remaining: usize,
    pub plan_params: PlanParams,
}

pub struct ContextBuilder {
    plan_extractor: PlanContextExtractor,
    max_tokens: usize,
}

impl ContextBuilder {
    pub fn new(max_tokens: usize) -> Self {
        Self {
            plan_extractor: PlanContextExtractor::new(),
            max_tokens,
        }
    }

    pub fn with_cities(mut self, cities: Vec<String>) -> Self {
        self.plan_extractor = PlanContextExtractor::with_cities(cities);
        self
    }

    /// Builds both halves of the context for one query. `prior_plan_params`
    /// is the plan state recovered from the most recent turn's
    /// `extra_metadata.plan_params`, if any (spec §4.3/§8: incremental plan
    /// building merges across turns).
    pub fn build(
        &self,
        window: &MemoryWindow,
        validated: &ValidatedContext,
        current_query: &str,
        system_prompt_base: Option<&str>,
        prior_plan_params: &PlanParams,
    ) -> (Vec<ChatMessage>, AgentContext) {
        let system_message = build_system_message(system_prompt_base, validated, window);

        let mut messages = vec![ChatMessage::system(system_message)];
        for turn in &window.recent {
            messages.push(ChatMessage::user(turn.query.clone()));
            messages.push(ChatMessage::assistant(turn.response.clone()));
        }
        messages.push(ChatMessage::user(current_query));

        let extracted = self
            .plan_extractor
            .extract(current_query, validated.language);
        let plan_params = prior_plan_params.merge(&extracted);

        let estimated_tokens = window.estimated_tokens + crate::types::estimate_tokens(current_query);
        let tokens_remaining = self.max_tokens.saturating_sub(estimated_tokens);

        let agent_context = AgentContext {
            window: window.clone(),
            estimated_tokens,
            tokens_remaining,
            plan_params,
        };

        (messages, agent_context)
    }
}

/// Augments the base system prompt with language, session summary, and an
/// enumerated, user-referenceable list of previous places (spec §4.3:
/// `"#1: …"`).
fn build_system_message(
    base: Option<&str>,
    validated: &ValidatedContext,
    window: &MemoryWindow,
) -> String {
    let mut out = String::new();
    out.push_str(base.unwrap_or(prompt::DEFAULT_SYSTEM_MESSAGE));
    out.push_str(&format!("\n\nRespond in language: {}.", validated.language.as_code()));

    if let Some(summary) = &window.session_summary {
        out.push_str(&format!("\n\nConversation so far: {summary}"));
    }

    if !window.previous_places.is_empty() {
        out.push_str("\n\nPreviously mentioned places:");
        for (i, place) in window.previous_places.iter().enumerate() {
            out.push_str(&format!("\n#{}: {}", i + 1, place.name));
        }
    }

    out
}
