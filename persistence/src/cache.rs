//! The volatile cache port (spec §2 item 2, §6 "Cache"): key/value with TTL
//! and pattern-delete, used for the memory-window shadow, the intent-decision
//! cache, and (by tools) the places-search cache.

use crate::error::{PersistenceError, Result};
use async_trait::async_trait;
use dashmap::DashMap;
use std::time::{Duration, Instant};

#[async_trait]
pub trait Cache: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<String>>;
    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()>;
    /// Deletes every key matching a `*`-suffixed prefix pattern, e.g.
    /// `agent:memory:{session_id}*`. Used for the explicit invalidation
    /// the orchestrator issues after every successful turn append (spec §4.2).
    async fn delete_pattern(&self, pattern: &str) -> Result<()>;
}

struct Entry {
    value: String,
    expires_at: Instant,
}

/// In-process TTL cache, grounded in the teacher's `memory_inmemory`
/// in-process store pattern, swapped from an `RwLock<HashMap>` to a
/// `DashMap` for lock-free concurrent reads across request tasks. Suitable
/// for tests and single-process deployments (spec §6: `RedisCache` is the
/// multi-worker-safe alternative).
#[derive(Default)]
pub struct InMemoryCache {
    entries: DashMap<String, Entry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let Some(entry) = self.entries.get(key) else {
            return Ok(None);
        };
        if entry.expires_at <= Instant::now() {
            drop(entry);
            self.entries.remove(key);
            return Ok(None);
        }
        Ok(Some(entry.value.clone()))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        self.entries.insert(
            key.to_string(),
            Entry {
                value,
                expires_at: Instant::now() + ttl,
            },
        );
        Ok(())
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        let prefix = pattern.trim_end_matches('*');
        self.entries.retain(|k, _| !k.starts_with(prefix));
        Ok(())
    }
}

/// Redis-backed implementation of [`Cache`], for multi-worker deployments
/// where cache coherence must be visible across processes (spec §5: "the
/// durable store and cache are shared across workers").
pub struct RedisCache {
    client: redis::Client,
}

impl RedisCache {
    pub fn new(redis_url: &str) -> Result<Self> {
        let client = redis::Client::open(redis_url)
            .map_err(|e| PersistenceError::Cache(e.to_string()))?;
        Ok(Self { client })
    }

    async fn connection(&self) -> Result<redis::aio::MultiplexedConnection> {
        self.client
            .get_multiplexed_async_connection()
            .await
            .map_err(|e| PersistenceError::Cache(e.to_string()))
    }
}

#[async_trait]
impl Cache for RedisCache {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        conn.get(key)
            .await
            .map_err(|e| PersistenceError::Cache(e.to_string()))
    }

    async fn set_with_ttl(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        conn.set_ex::<_, _, ()>(key, value, ttl.as_secs().max(1))
            .await
            .map_err(|e| PersistenceError::Cache(e.to_string()))
    }

    async fn delete_pattern(&self, pattern: &str) -> Result<()> {
        use redis::AsyncCommands;
        let mut conn = self.connection().await?;
        let glob = if pattern.ends_with('*') {
            pattern.to_string()
        } else {
            format!("{pattern}*")
        };
        let mut cursor: u64 = 0;
        loop {
            let (next_cursor, keys): (u64, Vec<String>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&glob)
                .arg("COUNT")
                .arg(200)
                .query_async(&mut conn)
                .await
                .map_err(|e| PersistenceError::Cache(e.to_string()))?;
            if !keys.is_empty() {
                let _: () = conn
                    .del(&keys)
                    .await
                    .map_err(|e| PersistenceError::Cache(e.to_string()))?;
            }
            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_cache_roundtrips_value() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("k1", "v1".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        assert_eq!(cache.get("k1").await.unwrap(), Some("v1".to_string()));
    }

    #[tokio::test]
    async fn in_memory_cache_expires_entries() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("k1", "v1".to_string(), Duration::from_millis(1))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(cache.get("k1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn in_memory_cache_delete_pattern_matches_prefix() {
        let cache = InMemoryCache::new();
        cache
            .set_with_ttl("agent:memory:s1", "a".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set_with_ttl("agent:memory:s2", "b".to_string(), Duration::from_secs(60))
            .await
            .unwrap();
        cache
            .set_with_ttl("agent:intent:x", "c".to_string(), Duration::from_secs(60))
            .await
            .unwrap();

        cache.delete_pattern("agent:memory:s1*").await.unwrap();

        assert_eq!(cache.get("agent:memory:s1").await.unwrap(), None);
        assert_eq!(cache.get("agent:memory:s2").await.unwrap(), Some("b".to_string()));
        assert_eq!(cache.get("agent:intent:x").await.unwrap(), Some("c".to_string()));
    }

    #[tokio::test]
    async fn in_memory_cache_miss_returns_none() {
        let cache = InMemoryCache::new();
        assert_eq!(cache.get("missing").await.unwrap(), None);
    }
}
