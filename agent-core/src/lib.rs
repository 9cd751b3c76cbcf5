//! # agent-core
//!
//! Shared domain types, the internal error taxonomy, and tracing
//! initialization used by every crate in the workspace. Transport- and
//! storage-agnostic; analogous in role to a conventional "core" crate that
//! every other crate depends on but that depends on nothing in-workspace
//! itself.

pub mod error;
pub mod logger;
pub mod types;

pub use error::{ErrorKind, Result};
pub use logger::init_tracing;
pub use types::{
    Complexity, ConversationTurn, Coordinates, Intent, IntentDecision, Language, ModelDecision,
    QueryMetrics, ToolCall, ToolObservation, UserPreferences, ValidatedContext,
};
