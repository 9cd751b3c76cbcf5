//! # tools
//!
//! The tool registry and its two core tools (spec §2 item 7, §4.6):
//! `search_places` and `create_itinerary`. `Tool` models the capability set
//! `{describe, schema, invoke}` from spec §9's "polymorphic tool dispatch"
//! redesign note, grounded in the `other_examples` agentic-loop corpus's
//! `ToolRegistry`/tool-trait split (`AgentsMesh-AutoHands`'s
//! `autohands_core::registry::ToolRegistry`) combined with the teacher's
//! `async-trait` idiom for side-effecting capabilities.

pub mod itinerary;
pub mod places;
pub mod search_places;

pub use itinerary::CreateItineraryTool;
pub use places::{Place, PlacesClient, PlacesError};
pub use search_places::SearchPlacesTool;

use agent_core::UserPreferences;
use async_trait::async_trait;
use llm::ToolDefinition;
use serde_json::Value as Json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

#[derive(Error, Debug, Clone)]
pub enum ToolError {
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("upstream error: {0}")]
    Upstream(String),
    #[error("tool timed out")]
    Timeout,
}

pub type Result<T> = std::result::Result<T, ToolError>;

/// A named, side-effecting capability callable from the reason-act loop
/// (spec §4.6, GLOSSARY "Tool").
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    /// JSON Schema for the tool's arguments, used both to build the
    /// model-facing [`ToolDefinition`] and (optionally) for argument
    /// validation by callers.
    fn schema(&self) -> Json;
    /// `preferences` is the calling user's stored preferences (spec §4.6:
    /// `create_itinerary` "selects top-rated matches filtered by
    /// preferences"); tools that don't need it simply ignore the argument.
    async fn invoke(&self, arguments: Json, preferences: &UserPreferences) -> Result<Json>;
}

/// Name → tool mapping (spec §4.6).
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, tool: Arc<dyn Tool>) -> Self {
        self.tools.insert(tool.name().to_string(), tool);
        self
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).cloned()
    }

    /// The model-facing tool definitions for every registered tool, in
    /// registration order is not guaranteed (`HashMap`) but content is
    /// stable per tool.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .values()
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            })
            .collect()
    }
}

/// Bounds concurrent tool invocations across the process (spec §5: default
/// 64 active tool calls).
pub struct ToolCallLimiter {
    semaphore: Arc<Semaphore>,
    queue_timeout: Duration,
}

impl ToolCallLimiter {
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

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes its input"
        }
        fn schema(&self) -> Json {
            serde_json::json!({"type": "object"})
        }
        async fn invoke(&self, arguments: Json, _preferences: &UserPreferences) -> Result<Json> {
            Ok(arguments)
        }
    }

    #[tokio::test]
    async fn registry_looks_up_tool_by_name() {
        let registry = ToolRegistry::new().register(Arc::new(EchoTool));
        let tool = registry.get("echo").expect("tool registered");
        let out = tool
            .invoke(serde_json::json!({"a": 1}), &UserPreferences::empty("u1"))
            .await
            .unwrap();
        assert_eq!(out, serde_json::json!({"a": 1}));
    }

    #[tokio::test]
    async fn registry_returns_none_for_unknown_tool() {
        let registry = ToolRegistry::new();
        assert!(registry.get("nope").is_none());
    }

    #[test]
    fn definitions_include_every_registered_tool() {
        let registry = ToolRegistry::new().register(Arc::new(EchoTool));
        let defs = registry.definitions();
        assert_eq!(defs.len(), 1);
        assert_eq!(defs[0].name, "echo");
    }
}
