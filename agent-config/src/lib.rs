//! # agent-config
//!
//! Typed configuration loaded once from environment variables at process
//! start, mirroring the teacher's `llm-client::config::EnvLlmConfig` /
//! `dbot-cli::BotConfig::load` pattern: recognized options are enumerated
//! here (spec §6) as named fields with defaults, not a free-form dict
//! (spec §9).

pub mod model_table;

pub use model_table::{ModelEntry, ModelLabel, ModelTable};

use agent_core::Language;
use anyhow::{Context, Result};
use std::env;
use std::time::Duration;

/// Everything the pipeline needs, assembled once and shared read-only
/// (`Arc<AgentConfig>`) across requests.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Languages the validator accepts (spec §4.1, §6 `supported_languages`).
    pub supported_languages: Vec<Language>,
    /// Used when a request omits `language` and preferences have none.
    pub default_language: Language,
    /// Forces the router to the cheapest model regardless of complexity.
    pub budget_mode: bool,

    pub max_short_term_turns: usize,
    pub max_long_term_turns: usize,
    pub max_tokens: usize,
    pub compression_threshold: f64,

    pub cache_ttl_memory_secs: u64,
    pub cache_ttl_intent_secs: u64,
    pub cache_ttl_places_secs: u64,

    pub per_request_deadline: Duration,
    pub model_call_timeout: Duration,
    pub tool_call_timeout: Duration,
    pub max_reasoning_iterations: u32,

    pub places_api_base_url: String,
    pub places_api_timeout: Duration,

    pub max_concurrent_model_calls: usize,
    pub max_concurrent_tool_calls: usize,
    pub max_queue_len: usize,

    pub database_url: String,
    pub redis_url: Option<String>,

    pub openai_api_key: String,
    pub openai_base_url: Option<String>,

    pub models: ModelTable,
}

impl AgentConfig {
    /// Loads configuration from environment variables (`dotenvy::dotenv()`
    /// is the caller's responsibility, run once at process start, per the
    /// teacher's `dbot-cli::main`). Every field has a default; only
    /// `OPENAI_API_KEY` is required.
    pub fn from_env() -> Result<Self> {
        let openai_api_key =
            env::var("OPENAI_API_KEY").context("OPENAI_API_KEY not set")?;

        let default_language = env::var("DEFAULT_LANGUAGE")
            .ok()
            .and_then(|s| Language::parse(&s))
            .unwrap_or(Language::En);

        let supported_languages = env::var("SUPPORTED_LANGUAGES")
            .ok()
            .map(|s| {
                s.split(',')
                    .filter_map(|code| Language::parse(code.trim()))
                    .collect::<Vec<_>>()
            })
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| vec![Language::Es, Language::En, Language::Ca, Language::Gl]);

        Ok(Self {
            supported_languages,
            default_language,
            budget_mode: env_bool("BUDGET_MODE", false),

            max_short_term_turns: env_usize("MAX_SHORT_TERM_TURNS", 10),
            max_long_term_turns: env_usize("MAX_LONG_TERM_TURNS", 50),
            max_tokens: env_usize("MAX_TOKENS", 4000),
            compression_threshold: env_f64("COMPRESSION_THRESHOLD", 0.8),

            cache_ttl_memory_secs: env_u64("CACHE_TTL_MEMORY_SECS", 300),
            cache_ttl_intent_secs: env_u64("CACHE_TTL_INTENT_SECS", 3600),
            cache_ttl_places_secs: env_u64("CACHE_TTL_PLACES_SECS", 300),

            per_request_deadline: Duration::from_millis(env_u64(
                "PER_REQUEST_DEADLINE_MS",
                30_000,
            )),
            model_call_timeout: Duration::from_millis(env_u64("MODEL_CALL_TIMEOUT_MS", 15_000)),
            tool_call_timeout: Duration::from_millis(env_u64("TOOL_CALL_TIMEOUT_MS", 10_000)),
            max_reasoning_iterations: env_usize("MAX_REASONING_ITERATIONS", 6) as u32,

            places_api_base_url: env::var("PLACES_API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:8080".to_string()),
            places_api_timeout: Duration::from_millis(env_u64("PLACES_API_TIMEOUT_MS", 10_000)),

            max_concurrent_model_calls: env_usize("MAX_CONCURRENT_MODEL_CALLS", 32),
            max_concurrent_tool_calls: env_usize("MAX_CONCURRENT_TOOL_CALLS", 64),
            max_queue_len: env_usize("MAX_QUEUE_LEN", 128),

            database_url: env::var("DATABASE_URL").unwrap_or_else(|_| "agent.db".to_string()),
            redis_url: env::var("REDIS_URL").ok(),

            openai_api_key,
            openai_base_url: env::var("OPENAI_BASE_URL").ok(),

            models: ModelTable::with_defaults(),
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_usize(key: &str, default: usize) -> usize {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn from_env_fails_without_api_key() {
        env::remove_var("OPENAI_API_KEY");
        assert!(AgentConfig::from_env().is_err());
    }

    #[test]
    #[serial]
    fn from_env_applies_defaults() {
        env::set_var("OPENAI_API_KEY", "test-key");
        env::remove_var("SUPPORTED_LANGUAGES");
        env::remove_var("MAX_TOKENS");
        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.max_tokens, 4000);
        assert_eq!(config.supported_languages.len(), 4);
        env::remove_var("OPENAI_API_KEY");
    }

    #[test]
    #[serial]
    fn from_env_parses_overrides() {
        env::set_var("OPENAI_API_KEY", "test-key");
        env::set_var("MAX_TOKENS", "1234");
        env::set_var("SUPPORTED_LANGUAGES", "en,es");
        let config = AgentConfig::from_env().unwrap();
        assert_eq!(config.max_tokens, 1234);
        assert_eq!(config.supported_languages, vec![Language::En, Language::Es]);
        env::remove_var("OPENAI_API_KEY");
        env::remove_var("MAX_TOKENS");
        env::remove_var("SUPPORTED_LANGUAGES");
    }
}
