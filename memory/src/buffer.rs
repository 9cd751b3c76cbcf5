//! # Conversation Memory Buffer
//!
//! `ConversationMemoryBuffer::load_window` implements spec §4.2's six-step
//! contract (cache lookup, durable read, window construction, previous-places
//! extraction, token estimation/compression, cache store), holding the
//! `ConversationStore`/`Cache` ports the same way the teacher's
//! `MemoryMiddleware` holds its `MemoryStore`: as injected `Arc<dyn _>`
//! trait objects, not concrete types.

use crate::types::{estimate_tokens, extract_places, summarize_turns, turn_to_recent_message};
use crate::MemoryWindow;
use agent_core::{ErrorKind, Language, Result};
use persistence::{Cache, ConversationStore};
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Sizing and cache knobs for the buffer, mirroring
/// `ContextBuilder`'s builder-style configuration in the teacher.
#[derive(Debug, Clone)]
pub struct MemoryConfig {
    pub max_short_term_turns: usize,
    pub max_long_term_turns: usize,
    pub max_tokens: usize,
    pub compression_threshold: f64,
    pub cache_ttl: Duration,
}

impl MemoryConfig {
    pub fn from_agent_config(config: &agent_config::AgentConfig) -> Self {
        Self {
            max_short_term_turns: config.max_short_term_turns,
            max_long_term_turns: config.max_long_term_turns,
            max_tokens: config.max_tokens,
            compression_threshold: config.compression_threshold,
            cache_ttl: Duration::from_secs(config.cache_ttl_memory_secs),
        }
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_short_term_turns: 10,
            max_long_term_turns: 50,
            max_tokens: 4000,
            compression_threshold: 0.8,
            cache_ttl: Duration::from_secs(300),
        }
    }
}

pub struct ConversationMemoryBuffer {
    store: Arc<dyn ConversationStore>,
    cache: Arc<dyn Cache>,
    config: MemoryConfig,
}

impl ConversationMemoryBuffer {
    pub fn new(
        store: Arc<dyn ConversationStore>,
        cache: Arc<dyn Cache>,
        config: MemoryConfig,
    ) -> Self {
        Self {
            store,
            cache,
            config,
        }
    }

    fn cache_key(session_id: Uuid) -> String {
        format!("agent:memory:{session_id}")
    }

    /// Loads a session's bounded window, honoring the cache-then-durable-
    /// read path from spec §4.2. `language` is currently unused by the
    /// window derivation itself (summaries are language-neutral) but is
    /// threaded through for callers that key on it in the cache path later.
    #[instrument(skip(self, current_query), fields(session_id = %session_id))]
    pub async fn load_window(
        &self,
        session_id: Uuid,
        current_query: &str,
        _language: Language,
    ) -> Result<MemoryWindow> {
        let key = Self::cache_key(session_id);

        match self.cache.get(&key).await {
            Ok(Some(cached)) => {
                if let Ok(window) = serde_json::from_str::<MemoryWindow>(&cached) {
                    return Ok(window);
                }
            }
            Ok(None) => {}
            Err(err) => warn!(error = %err, "memory cache read failed, falling back to durable store"),
        }

        let turns = self
            .store
            .recent_turns(session_id, self.config.max_long_term_turns as i64)
            .await
            .map_err(|_| ErrorKind::MemoryUnavailable)?;

        let total_turns = turns.len() as i64;
        let previous_places = extract_places(&turns);

        let split_at = turns.len().saturating_sub(self.config.max_short_term_turns);
        let (older, recent_turns) = turns.split_at(split_at);

        let session_summary = if older.is_empty() {
            None
        } else {
            Some(summarize_turns(older, None))
        };

        let recent: Vec<_> = recent_turns
            .iter()
            .enumerate()
            .map(|(i, turn)| turn_to_recent_message(turn, (split_at + i) as i64))
            .collect();

        let mut window = MemoryWindow {
            recent,
            previous_places,
            session_summary,
            total_turns,
            estimated_tokens: 0,
        };
        window.estimated_tokens = estimate_window_tokens(&window);

        let threshold = (self.config.compression_threshold * self.config.max_tokens as f64) as usize;
        if window.estimated_tokens >= threshold {
            compress(&mut window, recent_turns, self.config.max_tokens);
        }

        if let Ok(serialized) = serde_json::to_string(&window) {
            if let Err(err) = self.cache.set_with_ttl(&key, serialized, self.config.cache_ttl).await {
                warn!(error = %err, "memory cache write failed, continuing without cache");
            }
        }

        Ok(window)
    }

    /// Invalidates the cached window after a successful turn append (spec
    /// §4.2 cache coherence requirement).
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn invalidate(&self, session_id: Uuid) {
        let pattern = format!("{}*", Self::cache_key(session_id));
        if let Err(err) = self.cache.delete_pattern(&pattern).await {
            warn!(error = %err, "memory cache invalidation failed");
        }
    }
}

fn estimate_window_tokens(window: &MemoryWindow) -> usize {
    let mut chars = 0usize;
    if let Some(summary) = &window.session_summary {
        chars += summary.len();
    }
    for message in &window.recent {
        chars += message.query.len() + message.response.len();
    }
    estimate_tokens(&"x".repeat(chars))
}

/// Drops the oldest recent turns, one at a time, until the estimate is at
/// or below `0.9 * max_tokens`, folding dropped turns into the session
/// summary (spec §4.2 step 5).
fn compress(
    window: &mut MemoryWindow,
    recent_turns: &[agent_core::ConversationTurn],
    max_tokens: usize,
) {
    let target = (max_tokens as f64 * 0.9) as usize;
    let mut dropped_count = 0;

    while window.estimated_tokens > target && dropped_count < recent_turns.len() {
        dropped_count += 1;
        if !window.recent.is_empty() {
            window.recent.remove(0);
        }
        window.estimated_tokens = estimate_window_tokens(window);
    }

    if dropped_count > 0 {
        let dropped = &recent_turns[..dropped_count];
        window.session_summary = Some(summarize_turns(dropped, window.session_summary.as_deref()));
    }
}
