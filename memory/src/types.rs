//! # Memory types
//!
//! The data carried by a loaded conversation window and the pure helpers
//! that derive it from persisted turns.

use agent_core::{ConversationTurn, Intent};
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;

/// One verbatim exchange kept in the short-term window: a turn's query and
/// response, expanded into an alternating user/assistant message pair by
/// the context builder. Kept as a single entry per turn so `recent.len()`
/// is bounded by the number of turns kept, not by message count (spec §3
/// `len(recent) ≤ max_short_term_turns`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecentMessage {
    pub query: String,
    pub response: String,
    pub turn_index: i64,
}

/// A place reference recovered from a turn's metadata, deduplicated and
/// kept most-recent-first.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PreviousPlace {
    pub name: String,
    pub turn_index: i64,
}

/// A capped, token-bounded conversation window for one session (spec §3
/// `MemoryWindow`). Derived on demand by [`crate::buffer::ConversationMemoryBuffer`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MemoryWindow {
    pub recent: Vec<RecentMessage>,
    pub previous_places: Vec<PreviousPlace>,
    pub session_summary: Option<String>,
    pub total_turns: i64,
    pub estimated_tokens: usize,
}

impl MemoryWindow {
    pub fn empty() -> Self {
        Self {
            recent: Vec::new(),
            previous_places: Vec::new(),
            session_summary: None,
            total_turns: 0,
            estimated_tokens: 0,
        }
    }
}

/// Approximates tokens as `ceil(total_chars / 4)`.
pub fn estimate_tokens(text: &str) -> usize {
    ((text.len() as f64) / 4.0).ceil().max(1.0) as usize
}

/// Builds the deterministic `session_summary` for a block of turns being
/// folded out of the short-term window: total turn count, the most
/// frequent intent, and representative place names. Never invents content
/// beyond what is present in the turns passed in.
pub fn summarize_turns(turns: &[ConversationTurn], prior_summary: Option<&str>) -> String {
    use std::collections::HashMap;

    let mut intent_counts: HashMap<Intent, usize> = HashMap::new();
    for turn in turns {
        *intent_counts.entry(turn.intent).or_insert(0) += 1;
    }
    let dominant_intent = intent_counts
        .into_iter()
        .max_by_key(|(_, count)| *count)
        .map(|(intent, _)| intent.as_str())
        .unwrap_or("CHITCHAT");

    let places = extract_places(turns);
    let representative: Vec<&str> = places.iter().map(|p| p.name.as_str()).take(3).collect();

    let mut summary = String::new();
    if let Some(prior) = prior_summary {
        if !prior.is_empty() {
            summary.push_str(prior);
            summary.push(' ');
        }
    }
    summary.push_str(&format!(
        "{} earlier turn(s), mostly {}",
        turns.len(),
        dominant_intent
    ));
    if !representative.is_empty() {
        summary.push_str(&format!(", mentioning {}", representative.join(", ")));
    }
    summary.push('.');
    summary
}

/// Scans turn metadata (`extra_metadata.places`, an array of strings set by
/// tool invocations) for place references. Never guesses names out of free
/// text. Returns deduplicated, most-recent-first.
pub fn extract_places(turns: &[ConversationTurn]) -> Vec<PreviousPlace> {
    let mut seen = std::collections::HashSet::new();
    let mut places = Vec::new();

    for (turn_index, turn) in turns.iter().enumerate().rev() {
        let Some(names) = turn.extra_metadata.get("places").and_then(Json::as_array) else {
            continue;
        };
        for name in names {
            let Some(name) = name.as_str() else { continue };
            if seen.insert(name.to_string()) {
                places.push(PreviousPlace {
                    name: name.to_string(),
                    turn_index: turn_index as i64,
                });
            }
        }
    }

    places
}

pub fn turn_to_recent_message(turn: &ConversationTurn, turn_index: i64) -> RecentMessage {
    RecentMessage {
        query: turn.query.clone(),
        response: turn.response.clone(),
        turn_index,
    }
}
