//! # persistence
//!
//! The durable and volatile storage ports (spec §2 items 1-2, §6): sqlx
//! SQLite-backed conversation history, user preferences, and hourly metrics
//! aggregates, plus a pluggable [`Cache`] port with in-process and Redis
//! implementations. Every port is a trait so the reason-act and
//! orchestration crates depend only on behavior, not on SQLite or Redis
//! specifically — the same split the teacher draws between `storage`'s
//! `Repository<T>` trait and its sqlx implementation.

pub mod cache;
pub mod conversation_store;
pub mod error;
pub mod metrics_store;
pub mod pool;
pub mod preferences_store;

pub use cache::{Cache, InMemoryCache, RedisCache};
pub use conversation_store::{ConversationStore, SqliteConversationStore};
pub use error::{PersistenceError, Result};
pub use metrics_store::{MetricsIncrement, SqliteMetricsStore};
pub use pool::connect;
pub use preferences_store::{PreferencesStore, SqlitePreferencesStore};
