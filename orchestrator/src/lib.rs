//! # orchestrator
//!
//! The pipeline orchestrator (spec §2 item 9, §4.8): sequences the Context
//! Validator, Conversation Memory Buffer, Context Builder, Intent
//! Classifier, Model Router and Reason-Act Executor for one request, then
//! persists the turn, invalidates the cache, and records metrics. Grounded
//! in the teacher's `HandlerChain::handle` shape — run stages in order,
//! short-circuit on a hard error, instrument every stage — generalized from
//! a dynamically registered middleware/handler list to the fixed,
//! spec-defined pipeline stages (spec §9: the stage order is not
//! configurable).

pub mod api;
pub mod error;
pub mod validator;

pub use api::{PipelineErrorResponse, PipelineOutcome, PipelineRequest, PipelineResponse, ResponseMetadata};
pub use error::PipelineError;
pub use validator::Validator;

use agent_config::AgentConfig;
use agent_core::{ConversationTurn, ErrorKind, QueryMetrics};
use agent_loop::{ExecutorOutcome, ReasonActConfig, ReasonActExecutor};
use chrono::Utc;
use classifier::IntentClassifier;
use llm::{LlmClient, ModelCallLimiter};
use memory::{ConversationMemoryBuffer, ContextBuilder, PlanParams};
use metrics::MetricsRecorder;
use persistence::{Cache, ConversationStore, PreferencesStore};
use router::route;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tools::ToolCallLimiter;
use tracing::{instrument, warn};
use uuid::Uuid;

/// Bounds how many requests the orchestrator admits at once (spec §5
/// "excess requests queue up to a bounded length, beyond which the
/// orchestrator fails fast with `OVERLOADED`"). Shaped like
/// `tools::ToolCallLimiter` / `llm::ModelCallLimiter`: a semaphore plus a
/// queue timeout, so a request that cannot get a slot promptly fails fast
/// rather than piling up indefinitely. This is a pipeline-level admission
/// gate, distinct from (and in addition to) the per-call concurrency caps
/// already enforced inside `llm`/`tools`.
struct AdmissionLimiter {
    semaphore: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl AdmissionLimiter {
    fn new(max_queue_len: usize, queue_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_queue_len.max(1))),
            queue_timeout,
        }
    }

    async fn acquire(&self) -> Option<tokio::sync::OwnedSemaphorePermit> {
        tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned())
            .await
            .ok()
            .and_then(|r| r.ok())
    }
}

pub struct PipelineOrchestrator {
    config: Arc<AgentConfig>,
    validator: Validator,
    conversation_store: Arc<dyn ConversationStore>,
    memory: ConversationMemoryBuffer,
    context_builder: ContextBuilder,
    classifier: IntentClassifier,
    executor: ReasonActExecutor,
    metrics_recorder: MetricsRecorder,
    admission: AdmissionLimiter,
}

impl PipelineOrchestrator {
    /// Wires every stage from its port dependencies. Each argument mirrors
    /// one row of the spec §2 dependency-order table; construction order
    /// here follows that same leaves-first order.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: Arc<AgentConfig>,
        conversation_store: Arc<dyn ConversationStore>,
        preferences_store: Arc<dyn PreferencesStore>,
        cache: Arc<dyn Cache>,
        llm_client: Arc<dyn LlmClient>,
        tool_registry: Arc<tools::ToolRegistry>,
        metrics_recorder: MetricsRecorder,
    ) -> Self {
        let validator = Validator::new(config.supported_languages.clone(), preferences_store);

        let memory_config = memory::MemoryConfig::from_agent_config(&config);
        let memory = ConversationMemoryBuffer::new(conversation_store.clone(), cache.clone(), memory_config);

        let context_builder = ContextBuilder::new(config.max_tokens);

        let classifier = IntentClassifier::new(
            llm_client.clone(),
            cache.clone(),
            config.models.get(agent_config::ModelLabel::SmallFast).map(|e| e.model.clone()).unwrap_or_else(|| "gpt-4o-mini".to_string()),
            Duration::from_secs(config.cache_ttl_intent_secs),
        );

        let model_limiter = Arc::new(ModelCallLimiter::new(config.max_concurrent_model_calls, config.model_call_timeout));
        let tool_limiter = Arc::new(ToolCallLimiter::new(config.max_concurrent_tool_calls, config.tool_call_timeout));
        let executor = ReasonActExecutor::new(
            llm_client,
            tool_registry,
            model_limiter,
            tool_limiter,
            ReasonActConfig {
                max_iterations: config.max_reasoning_iterations,
                model_call_timeout: config.model_call_timeout,
                tool_call_timeout: config.tool_call_timeout,
            },
        );

        let admission = AdmissionLimiter::new(config.max_queue_len, Duration::from_millis(50));

        Self {
            config,
            validator,
            conversation_store,
            memory,
            context_builder,
            classifier,
            executor,
            metrics_recorder,
            admission,
        }
    }

    /// Runs one request through every pipeline stage (spec §4.8), with no
    /// external cancellation signal (always a fresh, uncancelled token).
    pub async fn handle(&self, request: PipelineRequest) -> PipelineOutcome {
        self.handle_with_cancellation(request, CancellationToken::new()).await
    }

    /// Same as [`Self::handle`] but lets the caller supply a cancellation
    /// token — the hook spec §5's cancellation semantics and spec §8's
    /// "cancelling a request before persistence leaves no new
    /// `ConversationTurn` row" property are tested against.
    #[instrument(skip(self, request, cancellation), fields(session_id = %request.session_id))]
    pub async fn handle_with_cancellation(
        &self,
        request: PipelineRequest,
        cancellation: CancellationToken,
    ) -> PipelineOutcome {
        // Step 1: start QueryMetrics (spec §4.8 step 1).
        let mut query_metrics = QueryMetrics::start(Uuid::new_v4());

        let Some(_admission_permit) = self.admission.acquire().await else {
            return self.fail(query_metrics, PipelineError::Overloaded, fallback_language(&request)).await;
        };

        // Step 2: validate context (spec §4.8 step 2, §4.1).
        let location = request.location.as_ref().map(|l| (l.lat, l.lon));
        let validated = match self
            .validator
            .validate(&request.user_id, &request.session_id.to_string(), &request.language, location)
            .await
        {
            Ok(validated) => validated,
            Err(err) => return self.fail(query_metrics, err, fallback_language(&request)).await,
        };

        // Step 3: load memory window (spec §4.8 step 3, §4.2).
        let window = match self.memory.load_window(validated.session_id, &request.query, validated.language).await {
            Ok(window) => window,
            Err(ErrorKind::MemoryUnavailable) => {
                return self.fail(query_metrics, PipelineError::MemoryUnavailable, validated.language).await
            }
            Err(_) => return self.fail(query_metrics, PipelineError::MemoryUnavailable, validated.language).await,
        };

        // Plan parameters are read fresh from the latest persisted turn on
        // every request (spec §5: "not held in process memory across
        // requests"), never carried in an in-process session object.
        let prior_plan_params = self.latest_plan_params(validated.session_id).await;

        // Step 4: build agent context (spec §4.8 step 4, §4.3).
        let (messages, agent_context) =
            self.context_builder
                .build(&window, &validated, &request.query, None, &prior_plan_params);

        // Step 5: classify intent, route model (spec §4.8 step 5, §4.4, §4.5).
        let decision = self
            .classifier
            .classify(&request.query, validated.language, window.session_summary.as_deref())
            .await;

        let budget_mode = self.config.budget_mode || validated.preferences.budget_mode;
        let Some(model) = route(
            decision.intent,
            decision.complexity,
            budget_mode,
            validated.preferences.preferred_model.as_deref(),
            &self.config.models,
        ) else {
            return self.fail(query_metrics, PipelineError::ModelError("no model configured for label".to_string()), validated.language).await;
        };

        query_metrics.intent = Some(decision.intent);
        query_metrics.complexity = Some(decision.complexity);
        query_metrics.model = Some(model.model.clone());

        // Step 6: execute the reason-act loop under an overall deadline
        // (spec §4.8 step 6, §4.7, §5).
        let deadline = Instant::now() + self.config.per_request_deadline;
        let result = self
            .executor
            .run(&model, messages, &validated.preferences, cancellation, deadline)
            .await;

        query_metrics.tool_call_count = result.trace.len() as u32;
        query_metrics.reasoning_step_count = result.reasoning_steps;
        query_metrics.input_tokens = result.usage.prompt_tokens as i64;
        query_metrics.output_tokens = result.usage.completion_tokens as i64;
        query_metrics.cost_usd = result.usage.prompt_tokens as f64 * model.input_cost_per_token
            + result.usage.completion_tokens as f64 * model.output_cost_per_token;

        let text = match result.outcome {
            ExecutorOutcome::Final { text, .. } => text,
            ExecutorOutcome::Timeout => return self.fail(query_metrics, PipelineError::Timeout, validated.language).await,
            ExecutorOutcome::Cancelled => return self.fail(query_metrics, PipelineError::Cancelled, validated.language).await,
            ExecutorOutcome::ModelError(message) => {
                return self.fail(query_metrics, PipelineError::ModelError(message), validated.language).await
            }
        };

        let places = extract_tool_places(&result.trace);
        let itinerary = extract_itinerary(&result.trace);
        let place_names: Vec<String> = places.iter().map(|p| p.name.clone()).collect();

        // Step 7: persist a new ConversationTurn (spec §4.8 step 7).
        query_metrics.finished_at = Some(Utc::now());
        let turn = ConversationTurn {
            id: query_metrics.request_id,
            session_id: validated.session_id,
            user_id: validated.user_id.clone(),
            query: request.query.clone(),
            response: text.clone(),
            intent: decision.intent,
            model: model.model.clone(),
            duration_ms: query_metrics.duration_ms(),
            input_tokens: query_metrics.input_tokens,
            output_tokens: query_metrics.output_tokens,
            cost_usd: query_metrics.cost_usd,
            created_at: Utc::now(),
            extra_metadata: serde_json::json!({
                "plan_params": agent_context.plan_params.to_json(),
                "places": place_names,
            }),
        };

        let persisted = self.conversation_store.append_turn(&turn).await;
        query_metrics.success = true; // a persistence failure doesn't fail the user-facing response (spec §7).
        if persisted.is_err() {
            query_metrics.error_kind = Some(ErrorKind::PersistenceFailed);
            warn!(session_id = %validated.session_id, "failed to persist conversation turn");
        } else {
            // Step 8: invalidate the session's cached memory window (spec §4.8 step 8, §4.2).
            self.memory.invalidate(validated.session_id).await;
        }

        // Step 9: finalize metrics and submit (spec §4.8 step 9).
        self.metrics_recorder.record(&query_metrics).await;

        // Step 10: return the response (spec §4.8 step 10).
        PipelineOutcome::Success(PipelineResponse {
            response_text: text,
            places: if places.is_empty() { None } else { Some(places) },
            itinerary,
            intention: decision.intent.as_str().to_string(),
            confidence: decision.confidence,
            complexity: decision.complexity.as_str().to_string(),
            model_used: model.model,
            processing_time_ms: query_metrics.duration_ms(),
            detected_emotion: None,
            emotion_confidence: None,
            metadata: ResponseMetadata {
                tool_calls: query_metrics.tool_call_count,
                reasoning_steps: query_metrics.reasoning_step_count,
                estimated_cost_usd: query_metrics.cost_usd,
            },
        })
    }

    /// Reads the most recently persisted turn's `plan_params` directly from
    /// the durable store (spec §5: read fresh on every request, never held
    /// in process memory). A read failure here degrades to an empty plan
    /// rather than failing the whole request — the memory window load
    /// already established durable-store health for this request.
    async fn latest_plan_params(&self, session_id: Uuid) -> PlanParams {
        match self.conversation_store.recent_turns(session_id, 1).await {
            Ok(turns) => turns
                .last()
                .map(|t| PlanParams::from_json(&serde_json::Value::Object(t.plan_params())))
                .unwrap_or_default(),
            Err(_) => PlanParams::default(),
        }
    }

    async fn fail(&self, mut query_metrics: QueryMetrics, err: PipelineError, language: agent_core::Language) -> PipelineOutcome {
        query_metrics.finished_at = Some(Utc::now());
        query_metrics.success = false;
        query_metrics.error_kind = Some(err.kind());
        self.metrics_recorder.record(&query_metrics).await;
        PipelineOutcome::Error(PipelineErrorResponse {
            error: err.kind().as_code(),
            message: err.message(language),
        })
    }
}

fn fallback_language(request: &PipelineRequest) -> agent_core::Language {
    agent_core::Language::parse(&request.language).unwrap_or(agent_core::Language::En)
}

fn extract_tool_places(trace: &[agent_core::ToolCall]) -> Vec<tools::Place> {
    let mut places = Vec::new();
    for call in trace {
        if call.tool_name != "search_places" {
            continue;
        }
        if let agent_core::ToolObservation::Ok { result } = &call.observation {
            if let Ok(found) = serde_json::from_value::<Vec<tools::Place>>(result.clone()) {
                places.extend(found);
            }
        }
    }
    places
}

fn extract_itinerary(trace: &[agent_core::ToolCall]) -> Option<tools::Itinerary> {
    trace.iter().rev().find(|c| c.tool_name == "create_itinerary").and_then(|call| {
        if let agent_core::ToolObservation::Ok { result } = &call.observation {
            serde_json::from_value(result.clone()).ok()
        } else {
            None
        }
    })
}
