//! # llm
//!
//! Transport-agnostic model-provider abstraction (spec §2 "LLM provider
//! adapters", §6 "Model providers"): a [`LlmClient`] trait extended, relative
//! to the teacher's `llm-client::LlmClient`, with tool-calling — a chat
//! completion may come back as either a final answer or a set of requested
//! tool calls, which the reason-act executor (`agent-loop`) drives.
//!
//! [`ModelCallLimiter`] implements the per-process concurrency cap from spec
//! §5 (default 32 active model calls; excess requests queue up to a bounded
//! length before the orchestrator fails fast with `OVERLOADED`).

use async_trait::async_trait;
use prompt::ChatMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value as Json;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// A tool the model may call, described the way OpenAI-style function
/// calling expects: a name, a human-readable description, and a JSON Schema
/// for its arguments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Json,
}

/// One chat-completion request: the routed model, the context-built message
/// sequence plus any observations appended so far, and the tool definitions
/// available this turn.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub tools: Vec<ToolDefinition>,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// A single tool invocation the model asked for.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    pub id: String,
    pub name: String,
    pub arguments: Json,
}

/// Provider-reported token usage, preferred over the config's static
/// per-token estimate when available (spec §9 open question on cost
/// accounting, resolved in `DESIGN.md`).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// What the model produced this turn (spec §4.7 step 2/3).
#[derive(Debug, Clone)]
pub enum ChatOutcome {
    Final { text: String },
    ToolCalls(Vec<ToolCallRequest>),
}

#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub outcome: ChatOutcome,
    pub usage: Option<Usage>,
}

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("provider error: {0}")]
    Provider(String),
    #[error("response parse error: {0}")]
    Parse(String),
    #[error("call timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, LlmError>;

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse>;
}

/// Bounds concurrent model calls across the process (spec §5). Acquiring a
/// permit blocks up to `queue_timeout`; a `None` return means the queue
/// bound was exceeded and the caller should surface `OVERLOADED`.
pub struct ModelCallLimiter {
    semaphore: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl ModelCallLimiter {
    pub fn new(max_concurrent: usize, queue_timeout: Duration) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
            queue_timeout,
        }
    }

    pub async fn acquire(&self) -> Option<OwnedSemaphorePermit> {
        tokio::time::timeout(self.queue_timeout, self.semaphore.clone().acquire_owned())
            .await
            .ok()
            .and_then(|r| r.ok())
    }
}
