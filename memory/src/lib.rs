//! # memory
//!
//! The conversation memory buffer and context builder (spec §2 items 3-4):
//! loads a capped, token-bounded [`MemoryWindow`] from the durable store
//! with cache coherence, then transforms it plus a `ValidatedContext` into
//! a model-facing message sequence and an [`context::AgentContext`] record,
//! including rule-based itinerary-planning slot extraction.

pub mod buffer;
pub mod context;
pub mod plan;
pub mod types;

pub use buffer::{ConversationMemoryBuffer, MemoryConfig};
pub use context::{AgentContext, ContextBuilder};
pub use plan::{PlanContextExtractor, PlanParams};
pub use types::{MemoryWindow, PreviousPlace, RecentMessage};
