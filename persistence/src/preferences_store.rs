//! Durable store for per-user preferences (spec §3 `UserPreferences`),
//! upserted on every update, grounded in the teacher's repository pattern
//! of "create table if not exists, then plain CRUD over it".

use crate::error::Result;
use agent_core::{Language, UserPreferences};
use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use sqlx::Row;

#[async_trait]
pub trait PreferencesStore: Send + Sync {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>>;
    async fn upsert(&self, preferences: &UserPreferences) -> Result<()>;
}

pub struct SqlitePreferencesStore {
    pool: SqlitePool,
}

impl SqlitePreferencesStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn init(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS user_preferences (
                user_id TEXT PRIMARY KEY,
                preferred_language TEXT,
                preferred_model TEXT,
                budget_mode INTEGER NOT NULL,
                favorites TEXT NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[async_trait]
impl PreferencesStore for SqlitePreferencesStore {
    async fn get(&self, user_id: &str) -> Result<Option<UserPreferences>> {
        let row = sqlx::query(
            "SELECT user_id, preferred_language, preferred_model, budget_mode, favorites \
             FROM user_preferences WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let preferred_language: Option<String> = row.get("preferred_language");
        let favorites: String = row.get("favorites");

        Ok(Some(UserPreferences {
            user_id: row.get("user_id"),
            preferred_language: preferred_language.and_then(|c| Language::parse(&c)),
            preferred_model: row.get("preferred_model"),
            budget_mode: row.get::<i64, _>("budget_mode") != 0,
            favorites: serde_json::from_str(&favorites).unwrap_or_default(),
        }))
    }

    async fn upsert(&self, preferences: &UserPreferences) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO user_preferences
                (user_id, preferred_language, preferred_model, budget_mode, favorites)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(user_id) DO UPDATE SET
                preferred_language = excluded.preferred_language,
                preferred_model = excluded.preferred_model,
                budget_mode = excluded.budget_mode,
                favorites = excluded.favorites
            "#,
        )
        .bind(&preferences.user_id)
        .bind(preferences.preferred_language.map(|l| l.as_code()))
        .bind(&preferences.preferred_model)
        .bind(preferences.budget_mode as i64)
        .bind(serde_json::to_string(&preferences.favorites).unwrap_or_default())
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqliteConnectOptions;
    use std::str::FromStr;

    async fn test_store() -> SqlitePreferencesStore {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")
            .unwrap()
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(opts).await.unwrap();
        let store = SqlitePreferencesStore::new(pool);
        store.init().await.unwrap();
        store
    }

    #[tokio::test]
    async fn get_missing_user_returns_none() {
        let store = test_store().await;
        assert!(store.get("nobody").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn upsert_then_get_round_trips() {
        let store = test_store().await;
        let mut prefs = UserPreferences::empty("u1");
        prefs.preferred_language = Some(Language::Es);
        prefs.budget_mode = true;

        store.upsert(&prefs).await.unwrap();
        let fetched = store.get("u1").await.unwrap().unwrap();

        assert_eq!(fetched.preferred_language, Some(Language::Es));
        assert!(fetched.budget_mode);
    }

    #[tokio::test]
    async fn upsert_twice_replaces_previous_values() {
        let store = test_store().await;
        let mut prefs = UserPreferences::empty("u1");
        prefs.budget_mode = true;
        store.upsert(&prefs).await.unwrap();

        prefs.budget_mode = false;
        prefs.preferred_model = Some("gpt-4o".into());
        store.upsert(&prefs).await.unwrap();

        let fetched = store.get("u1").await.unwrap().unwrap();
        assert!(!fetched.budget_mode);
        assert_eq!(fetched.preferred_model, Some("gpt-4o".to_string()));
    }
}
