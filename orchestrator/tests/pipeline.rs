//! End-to-end pipeline tests: fake the edges (LLM, places HTTP), run the
//! real middle (validator, memory, context builder, classifier, router,
//! reason-act executor) against on-disk-equivalent in-memory SQLite stores.
//! Grounded in `agent-loop`'s own `ScriptedLlm` test double, extended to
//! also answer the classifier's structured-output call.

use agent_config::{AgentConfig, ModelTable};
use agent_core::Language;
use async_trait::async_trait;
use llm::{ChatOutcome, ChatRequest, ChatResponse, LlmClient, Usage};
use orchestrator::api::{LocationInput, PipelineRequest};
use orchestrator::{PipelineOrchestrator, PipelineOutcome};
use persistence::{InMemoryCache, SqliteConversationStore, SqliteMetricsStore, SqlitePreferencesStore};
use prompt::MessageRole;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool};
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tools::{PlacesClient, SearchPlacesTool, ToolRegistry};
use uuid::Uuid;

struct ScriptedLlm {
    classification: String,
    turn_responses: Mutex<VecDeque<ChatOutcome>>,
}

#[async_trait]
impl LlmClient for ScriptedLlm {
    async fn complete(&self, request: ChatRequest) -> llm::Result<ChatResponse> {
        let is_classification = request.messages.iter().any(|m| {
            matches!(m.role, MessageRole::System) && m.content.contains("intent classifier")
        });
        let outcome = if is_classification {
            ChatOutcome::Final { text: self.classification.clone() }
        } else {
            self.turn_responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(ChatOutcome::Final { text: "fallback".to_string() })
        };
        Ok(ChatResponse { outcome, usage: Some(Usage { prompt_tokens: 20, completion_tokens: 10 }) })
    }
}

async fn in_memory_pool() -> SqlitePool {
    let opts = SqliteConnectOptions::from_str("sqlite::memory:").unwrap().create_if_missing(true);
    SqlitePool::connect_with(opts).await.unwrap()
}

async fn test_config() -> AgentConfig {
    AgentConfig {
        supported_languages: vec![Language::Es, Language::En, Language::Ca, Language::Gl],
        default_language: Language::En,
        budget_mode: false,
        max_short_term_turns: 10,
        max_long_term_turns: 50,
        max_tokens: 4000,
        compression_threshold: 3000,
        cache_ttl_memory_secs: 300,
        cache_ttl_intent_secs: 300,
        cache_ttl_places_secs: 300,
        per_request_deadline: Duration::from_secs(5),
        model_call_timeout: Duration::from_secs(2),
        tool_call_timeout: Duration::from_secs(2),
        max_reasoning_iterations: 6,
        places_api_base_url: "http://127.0.0.1:0".to_string(),
        places_api_timeout: Duration::from_secs(2),
        max_concurrent_model_calls: 4,
        max_concurrent_tool_calls: 4,
        max_queue_len: 8,
        database_url: "sqlite::memory:".to_string(),
        redis_url: None,
        openai_api_key: "test-key".to_string(),
        openai_base_url: None,
        models: ModelTable::with_defaults(),
    }
}

async fn build_orchestrator(
    llm: Arc<dyn LlmClient>,
    pool: SqlitePool,
) -> (PipelineOrchestrator, Arc<SqliteConversationStore>) {
    let config = Arc::new(test_config().await);

    let conversation_store = Arc::new(SqliteConversationStore::new(pool.clone()));
    conversation_store.init().await.unwrap();

    let preferences_store = Arc::new(SqlitePreferencesStore::new(pool.clone()));
    preferences_store.init().await.unwrap();

    let metrics_store = Arc::new(SqliteMetricsStore::new(pool.clone()));
    metrics_store.init().await.unwrap();

    let cache = Arc::new(InMemoryCache::new());
    let places_client = Arc::new(PlacesClient::new(config.places_api_base_url.clone(), config.places_api_timeout));
    let tools = Arc::new(ToolRegistry::new().register(Arc::new(SearchPlacesTool::new(places_client))));
    let metrics_recorder = metrics::MetricsRecorder::new(metrics_store);

    let orchestrator = PipelineOrchestrator::new(
        config,
        conversation_store.clone(),
        preferences_store,
        cache,
        llm,
        tools,
        metrics_recorder,
    );
    (orchestrator, conversation_store)
}

fn search_request(session_id: Uuid) -> PipelineRequest {
    PipelineRequest {
        user_id: "user-1".to_string(),
        session_id,
        query: "bars near the old town".to_string(),
        language: "en".to_string(),
        location: Some(LocationInput { lat: 41.65, lon: -0.88 }),
    }
}

#[tokio::test]
async fn fresh_session_simple_search_persists_a_turn_and_returns_success() {
    let llm = Arc::new(ScriptedLlm {
        classification: r#"{"intent":"SEARCH","confidence":0.95,"complexity":"low","reasoning":"single lookup"}"#.to_string(),
        turn_responses: Mutex::new(VecDeque::from(vec![ChatOutcome::Final { text: "Here are a few bars nearby.".to_string() }])),
    });
    let pool = in_memory_pool().await;
    let (orchestrator, conversation_store) = build_orchestrator(llm, pool).await;

    let session_id = Uuid::new_v4();
    let outcome = orchestrator.handle(search_request(session_id)).await;

    match outcome {
        PipelineOutcome::Success(response) => {
            assert_eq!(response.intention, "SEARCH");
            assert_eq!(response.response_text, "Here are a few bars nearby.");
        }
        PipelineOutcome::Error(err) => panic!("expected success, got error: {}", err.message),
    }

    let persisted = conversation_store.recent_turns(session_id, 10).await.unwrap();
    assert_eq!(persisted.len(), 1);
    assert_eq!(persisted[0].query, "bars near the old town");
}

#[tokio::test]
async fn budget_mode_preference_routes_to_a_cheaper_model() {
    // PLAN/high would route to the top-tier model by default; budget mode
    // should force it down to the small-fast label regardless.
    let llm = Arc::new(ScriptedLlm {
        classification: r#"{"intent":"PLAN","confidence":0.9,"complexity":"high","reasoning":"multi-stop"}"#.to_string(),
        turn_responses: Mutex::new(VecDeque::from(vec![ChatOutcome::Final { text: "ok".to_string() }])),
    });
    let pool = in_memory_pool().await;
    let (orchestrator, _conversation_store) = build_orchestrator(llm, pool.clone()).await;

    let preferences_store = SqlitePreferencesStore::new(pool.clone());
    preferences_store.init().await.unwrap();
    let mut preferences = agent_core::UserPreferences::empty("user-1");
    preferences.budget_mode = true;
    preferences_store.upsert(&preferences).await.unwrap();

    let mut request = search_request(Uuid::new_v4());
    request.query = "plan a full day trip across three neighborhoods".to_string();
    let outcome = orchestrator.handle(request).await;

    let PipelineOutcome::Success(response) = outcome else { panic!("expected success") };
    let cheap_model = ModelTable::with_defaults()
        .get(agent_config::ModelLabel::SmallFast)
        .unwrap()
        .model
        .clone();
    let top_tier_model = ModelTable::with_defaults()
        .get(agent_config::ModelLabel::TopTier)
        .unwrap()
        .model
        .clone();
    assert_eq!(response.model_used, cheap_model);
    assert_ne!(response.model_used, top_tier_model);
}

#[tokio::test]
async fn cancelling_before_a_final_answer_leaves_no_persisted_turn() {
    let llm = Arc::new(ScriptedLlm {
        classification: r#"{"intent":"SEARCH","confidence":0.9,"complexity":"low","reasoning":"single lookup"}"#.to_string(),
        turn_responses: Mutex::new(VecDeque::from(vec![ChatOutcome::Final { text: "unused".to_string() }])),
    });
    let pool = in_memory_pool().await;
    let (orchestrator, conversation_store) = build_orchestrator(llm, pool).await;

    let token = CancellationToken::new();
    token.cancel();

    let session_id = Uuid::new_v4();
    let outcome = orchestrator.handle_with_cancellation(search_request(session_id), token).await;

    match outcome {
        PipelineOutcome::Error(err) => assert_eq!(err.error, "CANCELLED"),
        PipelineOutcome::Success(_) => panic!("expected a cancellation error"),
    }

    let persisted = conversation_store.recent_turns(session_id, 10).await.unwrap();
    assert!(persisted.is_empty());
}

#[tokio::test]
async fn invalid_session_id_never_reaches_the_model_or_the_store() {
    let llm = Arc::new(ScriptedLlm {
        classification: "unused".to_string(),
        turn_responses: Mutex::new(VecDeque::new()),
    });
    let pool = in_memory_pool().await;
    let (orchestrator, conversation_store) = build_orchestrator(llm, pool).await;

    let mut request = search_request(Uuid::new_v4());
    request.user_id = String::new();
    let outcome = orchestrator.handle(request).await;

    match outcome {
        PipelineOutcome::Error(err) => assert_eq!(err.error, "INVALID_SESSION"),
        PipelineOutcome::Success(_) => panic!("expected an invalid session error"),
    }

    let persisted = conversation_store.recent_turns(Uuid::new_v4(), 10).await.unwrap();
    assert!(persisted.is_empty());
}
