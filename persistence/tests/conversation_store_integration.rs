use agent_core::{ConversationTurn, Intent};
use persistence::{connect, ConversationStore, SqliteConversationStore};
use uuid::Uuid;

#[tokio::test]
async fn turns_survive_across_pool_reconnects_on_disk() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("agent.db");
    let database_url = format!("sqlite://{}", db_path.display());

    let session_id = Uuid::new_v4();
    {
        let pool = connect(&database_url).await.unwrap();
        let store = SqliteConversationStore::new(pool);
        store.init().await.unwrap();

        let turn = ConversationTurn {
            id: Uuid::new_v4(),
            session_id,
            user_id: "u1".into(),
            query: "what's open near me".into(),
            response: "here are a few options".into(),
            intent: Intent::Search,
            model: "gpt-4o-mini".into(),
            duration_ms: 120,
            input_tokens: 40,
            output_tokens: 80,
            cost_usd: 0.0005,
            created_at: chrono::Utc::now(),
            extra_metadata: serde_json::json!({}),
        };
        store.append_turn(&turn).await.unwrap();
    }

    // Reopen against the same file to prove durability, not just pool caching.
    let pool = connect(&database_url).await.unwrap();
    let store = SqliteConversationStore::new(pool);
    store.init().await.unwrap();
    let turns = store.recent_turns(session_id, 10).await.unwrap();

    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].query, "what's open near me");
}
