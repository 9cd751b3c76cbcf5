//! # metrics
//!
//! The metrics recorder (spec §2 item 10, §3 `QueryMetrics`, §4.8 step 9):
//! takes a finalized `QueryMetrics` and folds it into the hourly
//! `agent_metrics` aggregate via `persistence::SqliteMetricsStore`'s
//! atomic upsert-with-increment, matching spec §5's "must use
//! upsert-with-increment or equivalent to avoid lost updates" requirement.
//! Grounded in the teacher's "the repository owns the SQL, the caller owns
//! the domain type" split already drawn in `persistence::metrics_store`.

use agent_core::QueryMetrics;
use persistence::{MetricsIncrement, Result, SqliteMetricsStore};
use std::sync::Arc;
use tracing::{instrument, warn};

/// Finalizes and submits per-query telemetry. Holds the durable metrics
/// port, not the pool directly, so it depends only on behavior.
pub struct MetricsRecorder {
    store: Arc<SqliteMetricsStore>,
}

impl MetricsRecorder {
    pub fn new(store: Arc<SqliteMetricsStore>) -> Self {
        Self { store }
    }

    /// Submits one query's metrics to its hourly bucket (spec §4.8 step 9).
    /// Persistence failure here is logged and swallowed: a metrics write
    /// failure must never fail a request that otherwise succeeded (spec §7
    /// "best-effort durability" applies equally to telemetry).
    #[instrument(skip(self, metrics), fields(request_id = %metrics.request_id))]
    pub async fn record(&self, metrics: &QueryMetrics) {
        if let Err(err) = self.try_record(metrics).await {
            warn!(error = %err, "metrics recording failed, continuing");
        }
    }

    async fn try_record(&self, metrics: &QueryMetrics) -> Result<()> {
        let increment = MetricsIncrement {
            hour_bucket: hour_bucket(metrics),
            model: metrics.model.clone().unwrap_or_else(|| "unknown".to_string()),
            intent: metrics
                .intent
                .map(|i| i.as_str().to_string())
                .unwrap_or_else(|| "UNKNOWN".to_string()),
            query_count: 1,
            tool_call_count: metrics.tool_call_count as i64,
            input_tokens: metrics.input_tokens,
            output_tokens: metrics.output_tokens,
            cost_usd: metrics.cost_usd,
            error_count: if metrics.success { 0 } else { 1 },
        };
        self.store.apply_increment(&increment).await
    }
}

/// The hour-granularity bucket key (spec §3 `QueryMetrics`: "written to
/// aggregated metrics bucket (hour granularity)"), derived from the
/// request's start time so a long-running request still lands in the
/// bucket it began in.
fn hour_bucket(metrics: &QueryMetrics) -> String {
    metrics.started_at.format("%Y-%m-%dT%H").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::{Complexity, ErrorKind, Intent};
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;
    use uuid::Uuid;

    async fn recorder() -> (MetricsRecorder, Arc<SqliteMetricsStore>) {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        let pool = sqlx::sqlite::SqlitePool::connect_with(opts).await.unwrap();
        let store = Arc::new(SqliteMetricsStore::new(pool));
        store.init().await.unwrap();
        (MetricsRecorder::new(store.clone()), store)
    }

    fn successful_metrics() -> QueryMetrics {
        let mut metrics = QueryMetrics::start(Uuid::new_v4());
        metrics.finished_at = Some(metrics.started_at + chrono::Duration::milliseconds(120));
        metrics.intent = Some(Intent::Search);
        metrics.complexity = Some(Complexity::Low);
        metrics.model = Some("gpt-4o-mini".to_string());
        metrics.tool_call_count = 1;
        metrics.reasoning_step_count = 2;
        metrics.input_tokens = 100;
        metrics.output_tokens = 50;
        metrics.cost_usd = 0.002;
        metrics.success = true;
        metrics
    }

    #[tokio::test]
    async fn records_a_successful_query_into_its_hour_bucket() {
        let (recorder, store) = recorder().await;
        let metrics = successful_metrics();
        let bucket_key = hour_bucket(&metrics);
        recorder.record(&metrics).await;

        let bucket = store
            .get_bucket(&bucket_key, "gpt-4o-mini", "SEARCH")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.query_count, 1);
        assert_eq!(bucket.tool_call_count, 1);
        assert_eq!(bucket.input_tokens, 100);
        assert_eq!(bucket.error_count, 0);
    }

    #[tokio::test]
    async fn failed_query_increments_error_count() {
        let (recorder, store) = recorder().await;
        let mut metrics = successful_metrics();
        metrics.success = false;
        metrics.error_kind = Some(ErrorKind::ModelError);
        let bucket_key = hour_bucket(&metrics);
        recorder.record(&metrics).await;

        let bucket = store
            .get_bucket(&bucket_key, "gpt-4o-mini", "SEARCH")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.error_count, 1);
    }

    #[tokio::test]
    async fn repeated_records_in_the_same_bucket_accumulate() {
        let (recorder, store) = recorder().await;
        let metrics = successful_metrics();
        let bucket_key = hour_bucket(&metrics);
        recorder.record(&metrics).await;
        recorder.record(&metrics).await;

        let bucket = store
            .get_bucket(&bucket_key, "gpt-4o-mini", "SEARCH")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(bucket.query_count, 2);
        assert_eq!(bucket.input_tokens, 200);
    }

    #[tokio::test]
    async fn missing_model_and_intent_fall_back_to_placeholders() {
        let (recorder, store) = recorder().await;
        let metrics = QueryMetrics::start(Uuid::new_v4());
        let bucket_key = hour_bucket(&metrics);
        recorder.record(&metrics).await;

        let bucket = store.get_bucket(&bucket_key, "unknown", "UNKNOWN").await.unwrap().unwrap();
        assert_eq!(bucket.query_count, 1);
    }
}
