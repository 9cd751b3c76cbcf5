//! # agent-loop
//!
//! The reason-act executor (spec §4.7, §2 item 8): a bounded
//! `[reason → maybe act → observe]*` loop over a routed model and the tool
//! registry, grounded in the `other_examples` agentic-loop corpus's
//! `AgentLoop::run_loop_inner` shape (turn counter, per-turn model call,
//! tool-call branch appended back into the message sequence, explicit
//! termination conditions) adapted to this workspace's `llm`/`tools`
//! abstractions and stripped of the source loop's checkpoint/transcript/
//! memory-backend/history-compressor extras, which have no counterpart here.

use std::sync::Arc;
use std::time::{Duration, Instant};

use agent_core::{ModelDecision, ToolCall, ToolObservation, UserPreferences};
use llm::{ChatOutcome, ChatRequest, ChatResponse, LlmClient, ModelCallLimiter, Usage};
use prompt::ChatMessage;
use tokio_util::sync::CancellationToken;
use tools::{ToolCallLimiter, ToolRegistry};
use tracing::{instrument, warn};

/// Tunables for a single reason-act run (spec §4.7).
#[derive(Debug, Clone)]
pub struct ReasonActConfig {
    pub max_iterations: u32,
    pub model_call_timeout: Duration,
    pub tool_call_timeout: Duration,
}

impl Default for ReasonActConfig {
    fn default() -> Self {
        Self {
            max_iterations: 6,
            model_call_timeout: Duration::from_secs(15),
            tool_call_timeout: Duration::from_secs(10),
        }
    }
}

/// How the loop ended (spec §4.7 termination conditions).
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutorOutcome {
    /// A final answer was produced. `truncated` is set when `max_iterations`
    /// was reached before the model emitted one, in which case `text` is the
    /// best interim answer available.
    Final { text: String, truncated: bool },
    /// The per-request deadline elapsed before a final answer.
    Timeout,
    /// The cancellation signal fired; no further tool calls were made.
    Cancelled,
    /// The model call itself failed (not a tool error, which is recorded in
    /// the trace as an observation instead of ending the loop).
    ModelError(String),
}

/// Everything the orchestrator needs to persist and record metrics for one
/// reason-act run.
#[derive(Debug, Clone)]
pub struct ExecutionResult {
    pub outcome: ExecutorOutcome,
    pub trace: Vec<ToolCall>,
    pub reasoning_steps: u32,
    pub usage: Usage,
}

pub struct ReasonActExecutor {
    llm: Arc<dyn LlmClient>,
    tools: Arc<ToolRegistry>,
    model_limiter: Arc<ModelCallLimiter>,
    tool_limiter: Arc<ToolCallLimiter>,
    config: ReasonActConfig,
}

impl ReasonActExecutor {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        tools: Arc<ToolRegistry>,
        model_limiter: Arc<ModelCallLimiter>,
        tool_limiter: Arc<ToolCallLimiter>,
        config: ReasonActConfig,
    ) -> Self {
        Self {
            llm,
            tools,
            model_limiter,
            tool_limiter,
            config,
        }
    }

    /// Runs the bounded loop to completion (spec §4.7).
    #[instrument(skip(self, messages, cancellation), fields(model = %model.model))]
    pub async fn run(
        &self,
        model: &ModelDecision,
        mut messages: Vec<ChatMessage>,
        preferences: &UserPreferences,
        cancellation: CancellationToken,
        deadline: Instant,
    ) -> ExecutionResult {
        let tool_defs = self.tools.definitions();
        let mut trace = Vec::new();
        let mut usage = Usage::default();
        let mut step = 0u32;

        loop {
            if cancellation.is_cancelled() {
                return ExecutionResult { outcome: ExecutorOutcome::Cancelled, trace, reasoning_steps: step, usage };
            }

            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return ExecutionResult { outcome: ExecutorOutcome::Timeout, trace, reasoning_steps: step, usage };
            }

            if step >= self.config.max_iterations {
                return ExecutionResult {
                    outcome: ExecutorOutcome::Final {
                        text: "Reached the maximum number of reasoning steps without a final answer.".to_string(),
                        truncated: true,
                    },
                    trace,
                    reasoning_steps: step,
                    usage,
                };
            }
            step += 1;

            let Some(_permit) = self.model_limiter.acquire().await else {
                return ExecutionResult { outcome: ExecutorOutcome::Timeout, trace, reasoning_steps: step, usage };
            };

            let request = ChatRequest {
                model: model.model.clone(),
                messages: messages.clone(),
                tools: tool_defs.clone(),
                temperature: model.temperature,
                max_tokens: model.max_tokens,
            };

            let call_budget = remaining.min(self.config.model_call_timeout);
            let response: ChatResponse = match tokio::time::timeout(call_budget, self.llm.complete(request)).await {
                Err(_) => return ExecutionResult { outcome: ExecutorOutcome::Timeout, trace, reasoning_steps: step, usage },
                Ok(Err(e)) => {
                    return ExecutionResult {
                        outcome: ExecutorOutcome::ModelError(e.to_string()),
                        trace,
                        reasoning_steps: step,
                        usage,
                    }
                }
                Ok(Ok(response)) => response,
            };

            if let Some(call_usage) = &response.usage {
                usage.prompt_tokens += call_usage.prompt_tokens;
                usage.completion_tokens += call_usage.completion_tokens;
            }

            match response.outcome {
                ChatOutcome::Final { text } => {
                    return ExecutionResult {
                        outcome: ExecutorOutcome::Final { text, truncated: false },
                        trace,
                        reasoning_steps: step,
                        usage,
                    };
                }
                ChatOutcome::ToolCalls(mut calls) => {
                    if calls.is_empty() {
                        return ExecutionResult {
                            outcome: ExecutorOutcome::Final {
                                text: String::new(),
                                truncated: false,
                            },
                            trace,
                            reasoning_steps: step,
                            usage,
                        };
                    }
                    if calls.len() > 1 {
                        warn!(extra = calls.len() - 1, "model requested multiple tool calls; only the first is executed");
                    }
                    let call = calls.remove(0);

                    if cancellation.is_cancelled() {
                        return ExecutionResult { outcome: ExecutorOutcome::Cancelled, trace, reasoning_steps: step, usage };
                    }

                    let started = Instant::now();
                    let observation = self.invoke_tool(&call.name, call.arguments.clone(), preferences).await;
                    let duration_ms = started.elapsed().as_millis() as u64;

                    let observation_text = match &observation {
                        ToolObservation::Ok { result } => format!("[tool:{}] {}", call.name, result),
                        ToolObservation::Error { message } => format!("[tool:{}] error: {}", call.name, message),
                    };

                    trace.push(ToolCall {
                        step_index: step,
                        tool_name: call.name,
                        arguments: call.arguments,
                        duration_ms,
                        observation,
                    });
                    messages.push(ChatMessage::user(observation_text));
                }
            }
        }
    }

    async fn invoke_tool(
        &self,
        name: &str,
        arguments: serde_json::Value,
        preferences: &UserPreferences,
    ) -> ToolObservation {
        let Some(tool) = self.tools.get(name) else {
            return ToolObservation::Error { message: format!("tool not found: {name}") };
        };

        let Some(_permit) = self.tool_limiter.acquire().await else {
            return ToolObservation::Error { message: "tool call queue timed out".to_string() };
        };

        match tokio::time::timeout(self.config.tool_call_timeout, tool.invoke(arguments, preferences)).await {
            Err(_) => ToolObservation::Error { message: "tool call timed out".to_string() },
            Ok(Err(e)) => ToolObservation::Error { message: e.to_string() },
            Ok(Ok(result)) => ToolObservation::Ok { result },
        }
    }
}
