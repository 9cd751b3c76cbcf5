//! Durable append-only store for conversation turns (spec §3 `ConversationTurn`,
//! §6 schema), grounded in the teacher's `MessageRepository` (sqlx SQLite,
//! `init()` creates tables on first use, repository methods map rows back
//! to domain types).

use crate::error::Result;
use agent_core::{ConversationTurn, Intent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqlitePool;
use sqlx::Row;
use uuid::Uuid;

#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()>;
    /// Most recent turns for a session, oldest first, capped at `limit`.
    async fn recent_turns(&self, session_id: Uuid, limit: i64) -> Result<Vec<ConversationTurn>>;
}

pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Creates the `conversation_turns` table and its `(session_id, created_at)`
    /// index if they do not already exist (spec §6 schema).
    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS conversation_turns (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                query TEXT NOT NULL,
                response TEXT NOT NULL,
                intent TEXT NOT NULL,
                model TEXT NOT NULL,
                duration_ms INTEGER NOT NULL,
                input_tokens INTEGER NOT NULL,
                output_tokens INTEGER NOT NULL,
                cost_usd REAL NOT NULL,
                created_at TEXT NOT NULL,
                extra_metadata TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_conversation_turns_session_created \
             ON conversation_turns (session_id, created_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn intent_to_str(intent: Intent) -> &'static str {
    intent.as_str()
}

fn intent_from_str(s: &str) -> Intent {
    match s {
        "SEARCH" => Intent::Search,
        "RECOMMEND" => Intent::Recommend,
        "PLAN" => Intent::Plan,
        _ => Intent::Chitchat,
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append_turn(&self, turn: &ConversationTurn) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO conversation_turns
                (id, session_id, user_id, query, response, intent, model,
                 duration_ms, input_tokens, output_tokens, cost_usd, created_at, extra_metadata)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(turn.id.to_string())
        .bind(turn.session_id.to_string())
        .bind(&turn.user_id)
        .bind(&turn.query)
        .bind(&turn.response)
        .bind(intent_to_str(turn.intent))
        .bind(&turn.model)
        .bind(turn.duration_ms)
        .bind(turn.input_tokens)
        .bind(turn.output_tokens)
        .bind(turn.cost_usd)
        .bind(turn.created_at.to_rfc3339())
        .bind(turn.extra_metadata.to_string())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn recent_turns(&self, session_id: Uuid, limit: i64) -> Result<Vec<ConversationTurn>> {
        let rows = sqlx::query(
            r#"
            SELECT id, session_id, user_id, query, response, intent, model,
                   duration_ms, input_tokens, output_tokens, cost_usd, created_at, extra_metadata
            FROM conversation_turns
            WHERE session_id = ?
            ORDER BY created_at DESC
            LIMIT ?
            "#,
        )
        .bind(session_id.to_string())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        let mut turns: Vec<ConversationTurn> = rows
            .into_iter()
            .map(|row| {
                let created_at: String = row.get("created_at");
                let extra_metadata: String = row.get("extra_metadata");
                ConversationTurn {
                    id: Uuid::parse_str(&row.get::<String, _>("id")).unwrap_or_else(|_| Uuid::nil()),
                    session_id: Uuid::parse_str(&row.get::<String, _>("session_id"))
                        .unwrap_or_else(|_| Uuid::nil()),
                    user_id: row.get("user_id"),
                    query: row.get("query"),
                    response: row.get("response"),
                    intent: intent_from_str(&row.get::<String, _>("intent")),
                    model: row.get("model"),
                    duration_ms: row.get("duration_ms"),
                    input_tokens: row.get("input_tokens"),
                    output_tokens: row.get("output_tokens"),
                    cost_usd: row.get("cost_usd"),
                    created_at: DateTime::parse_from_rfc3339(&created_at)
                        .map(|dt| dt.with_timezone(&Utc))
                        .unwrap_or_else(|_| Utc::now()),
                    extra_metadata: serde_json::from_str(&extra_metadata)
                        .unwrap_or(serde_json::json!({})),
                }
            })
            .collect();

        // Query returns newest-first for the LIMIT to apply to the right
        // end of the window; callers want oldest-first for context building.
        turns.reverse();
        Ok(turns)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    async fn test_store() -> SqliteConversationStore {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await.unwrap();
        let store = SqliteConversationStore::new(pool);
        store.init().await.unwrap();
        store
    }

    fn sample_turn(session_id: Uuid, query: &str) -> ConversationTurn {
        ConversationTurn {
            id: Uuid::new_v4(),
            session_id,
            user_id: "u1".into(),
            query: query.into(),
            response: "ok".into(),
            intent: Intent::Chitchat,
            model: "gpt-4o-mini".into(),
            duration_ms: 10,
            input_tokens: 5,
            output_tokens: 7,
            cost_usd: 0.0001,
            created_at: Utc::now(),
            extra_metadata: serde_json::json!({}),
        }
    }

    #[tokio::test]
    async fn append_then_recent_turns_round_trips() {
        let store = test_store().await;
        let session_id = Uuid::new_v4();
        let turn = sample_turn(session_id, "hello");
        store.append_turn(&turn).await.unwrap();

        let turns = store.recent_turns(session_id, 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].query, "hello");
    }

    #[tokio::test]
    async fn recent_turns_respects_limit_and_order() {
        let store = test_store().await;
        let session_id = Uuid::new_v4();
        for i in 0..5 {
            let mut turn = sample_turn(session_id, &format!("q{i}"));
            turn.created_at = Utc::now() + chrono::Duration::seconds(i);
            store.append_turn(&turn).await.unwrap();
        }

        let turns = store.recent_turns(session_id, 3).await.unwrap();
        assert_eq!(turns.len(), 3);
        assert_eq!(turns[0].query, "q2");
        assert_eq!(turns[2].query, "q4");
    }

    #[tokio::test]
    async fn recent_turns_scoped_to_session() {
        let store = test_store().await;
        let session_a = Uuid::new_v4();
        let session_b = Uuid::new_v4();
        store.append_turn(&sample_turn(session_a, "a")).await.unwrap();
        store.append_turn(&sample_turn(session_b, "b")).await.unwrap();

        let turns = store.recent_turns(session_a, 10).await.unwrap();
        assert_eq!(turns.len(), 1);
        assert_eq!(turns[0].query, "a");
    }
}
