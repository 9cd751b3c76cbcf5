//! Durable aggregate metrics store (spec §5: "per-hour aggregates must use
//! upsert-with-increment to avoid lost updates under concurrent writers").
//! The `agent_metrics` table holds one row per `(hour_bucket, model, intent)`
//! and every write is a single atomic `INSERT ... ON CONFLICT DO UPDATE`
//! rather than a read-modify-write round trip.

use crate::error::Result;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

/// One increment to apply to an hourly aggregate row.
pub struct MetricsIncrement {
    pub hour_bucket: String,
    pub model: String,
    pub intent: String,
    pub query_count: i64,
    pub tool_call_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub cost_usd: f64,
    pub error_count: i64,
}

pub struct SqliteMetricsStore {
    pool: SqlitePool,
}

impl SqliteMetricsStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS agent_metrics (
                hour_bucket TEXT NOT NULL,
                model TEXT NOT NULL,
                intent TEXT NOT NULL,
                query_count INTEGER NOT NULL DEFAULT 0,
                tool_call_count INTEGER NOT NULL DEFAULT 0,
                input_tokens INTEGER NOT NULL DEFAULT 0,
                output_tokens INTEGER NOT NULL DEFAULT 0,
                cost_usd REAL NOT NULL DEFAULT 0,
                error_count INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (hour_bucket, model, intent)
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Applies one query's worth of metrics to its hourly bucket. Safe to
    /// call concurrently from many request tasks: the conflicting row is
    /// incremented in place, never overwritten.
    pub async fn apply_increment(&self, increment: &MetricsIncrement) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO agent_metrics
                (hour_bucket, model, intent, query_count, tool_call_count,
                 input_tokens, output_tokens, cost_usd, error_count)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(hour_bucket, model, intent) DO UPDATE SET
                query_count = query_count + excluded.query_count,
                tool_call_count = tool_call_count + excluded.tool_call_count,
                input_tokens = input_tokens + excluded.input_tokens,
                output_tokens = output_tokens + excluded.output_tokens,
                cost_usd = cost_usd + excluded.cost_usd,
                error_count = error_count + excluded.error_count
            "#,
        )
        .bind(&increment.hour_bucket)
        .bind(&increment.model)
        .bind(&increment.intent)
        .bind(increment.query_count)
        .bind(increment.tool_call_count)
        .bind(increment.input_tokens)
        .bind(increment.output_tokens)
        .bind(increment.cost_usd)
        .bind(increment.error_count)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Reads back one aggregate row, mainly for tests and diagnostics.
    pub async fn get_bucket(
        &self,
        hour_bucket: &str,
        model: &str,
        intent: &str,
    ) -> Result<Option<MetricsIncrement>> {
        let row = sqlx::query(
            "SELECT hour_bucket, model, intent, query_count, tool_call_count, \
             input_tokens, output_tokens, cost_usd, error_count \
             FROM agent_metrics WHERE hour_bucket = ? AND model = ? AND intent = ?",
        )
        .bind(hour_bucket)
        .bind(model)
        .bind(intent)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| MetricsIncrement {
            hour_bucket: row.get("hour_bucket"),
            model: row.get("model"),
            intent: row.get("intent"),
            query_count: row.get("query_count"),
            tool_call_count: row.get("tool_call_count"),
            input_tokens: row.get("input_tokens"),
            output_tokens: row.get("output_tokens"),
            cost_usd: row.get("cost_usd"),
            error_count: row.get("error_count"),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    async fn test_store() -> SqliteMetricsStore {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await.unwrap();
        let store = SqliteMetricsStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn increment(hour: &str, count: i64) -> MetricsIncrement {
        MetricsIncrement {
            hour_bucket: hour.into(),
            model: "gpt-4o-mini".into(),
            intent: "CHITCHAT".into(),
            query_count: count,
            tool_call_count: 0,
            input_tokens: 10 * count,
            output_tokens: 20 * count,
            cost_usd: 0.001 * count as f64,
            error_count: 0,
        }
    }

    #[tokio::test]
    async fn first_increment_creates_bucket() {
        let store = test_store().await;
        store.apply_increment(&increment("2026-07-28T10", 1)).await.unwrap();

        let bucket = store
            .get_bucket("2026-07-28T10", "gpt-4o-mini", "CHITCHAT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.query_count, 1);
        assert_eq!(bucket.input_tokens, 10);
    }

    #[tokio::test]
    async fn repeated_increments_accumulate_not_overwrite() {
        let store = test_store().await;
        for _ in 0..3 {
            store.apply_increment(&increment("2026-07-28T10", 1)).await.unwrap();
        }

        let bucket = store
            .get_bucket("2026-07-28T10", "gpt-4o-mini", "CHITCHAT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.query_count, 3);
        assert_eq!(bucket.input_tokens, 30);
        assert_eq!(bucket.output_tokens, 60);
    }

    #[tokio::test]
    async fn concurrent_increments_do_not_lose_updates() {
        use std::sync::Arc;
        let store = Arc::new(test_store().await);

        let mut handles = Vec::new();
        for _ in 0..20 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.apply_increment(&increment("2026-07-28T11", 1)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let bucket = store
            .get_bucket("2026-07-28T11", "gpt-4o-mini", "CHITCHAT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.query_count, 20);
    }

    #[tokio::test]
    async fn distinct_buckets_stay_independent() {
        let store = test_store().await;
        store.apply_increment(&increment("2026-07-28T10", 1)).await.unwrap();
        store.apply_increment(&increment("2026-07-28T11", 5)).await.unwrap();

        let first = store
            .get_bucket("2026-07-28T10", "gpt-4o-mini", "CHITCHAT")
            .await
            .unwrap()
            .unwrap();
        let second = store
            .get_bucket("2026-07-28T11", "gpt-4o-mini", "CHITCHAT")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.query_count, 1);
        assert_eq!(second.query_count, 5);
    }
}
