//! agent-cli: drives the pipeline orchestrator from the command line, in
//! place of the (out-of-scope) HTTP surface. Config from env, optional
//! `.env` file — grounded in `dbot-cli/src/main.rs`'s
//! `dotenvy::dotenv().ok()` + `tracing_subscriber::fmt()` + clap
//! `Parser`/`Subcommand` shape.

use agent_config::AgentConfig;
use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use orchestrator::api::{LocationInput, PipelineRequest};
use orchestrator::{PipelineOrchestrator, PipelineOutcome};
use llm::LlmClient;
use persistence::{
    connect, Cache, InMemoryCache, RedisCache, SqliteConversationStore, SqliteMetricsStore,
    SqlitePreferencesStore,
};
use std::sync::Arc;
use tools::{CreateItineraryTool, PlacesClient, SearchPlacesTool, ToolRegistry};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "agent-cli")]
#[command(about = "Place-discovery and itinerary-planning pipeline CLI: ask, migrate", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the SQLite tables the pipeline depends on (config from env).
    Migrate,
    /// Run a single query through the pipeline and print the JSON response.
    Ask {
        #[arg(long)]
        user_id: String,
        /// Reuses an existing conversation if provided; otherwise starts a fresh one.
        #[arg(long)]
        session_id: Option<Uuid>,
        #[arg(long, default_value = "en")]
        language: String,
        #[arg(long)]
        lat: Option<f64>,
        #[arg(long)]
        lon: Option<f64>,
        query: String,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()))
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Migrate => handle_migrate().await,
        Commands::Ask { user_id, session_id, language, lat, lon, query } => {
            handle_ask(user_id, session_id, language, lat, lon, query).await
        }
    }
}

async fn handle_migrate() -> Result<()> {
    let config = AgentConfig::from_env().context("load AgentConfig from environment")?;
    let pool = connect(&config.database_url).await.context("connect to DATABASE_URL")?;

    SqliteConversationStore::new(pool.clone()).init().await.context("init conversation turns table")?;
    SqlitePreferencesStore::new(pool.clone()).init().await.context("init user preferences table")?;
    SqliteMetricsStore::new(pool.clone()).init().await.context("init metrics buckets table")?;

    println!("Migrated tables at {}", config.database_url);
    Ok(())
}

async fn handle_ask(
    user_id: String,
    session_id: Option<Uuid>,
    language: String,
    lat: Option<f64>,
    lon: Option<f64>,
    query: String,
) -> Result<()> {
    let config = Arc::new(AgentConfig::from_env().context("load AgentConfig from environment")?);

    let pool = connect(&config.database_url).await.context("connect to DATABASE_URL")?;
    let conversation_store = Arc::new(SqliteConversationStore::new(pool.clone()));
    conversation_store.init().await.context("init conversation turns table")?;
    let preferences_store = Arc::new(SqlitePreferencesStore::new(pool.clone()));
    preferences_store.init().await.context("init user preferences table")?;
    let metrics_store = Arc::new(SqliteMetricsStore::new(pool.clone()));
    metrics_store.init().await.context("init metrics buckets table")?;

    let cache: Arc<dyn Cache> = match &config.redis_url {
        Some(url) => Arc::new(RedisCache::new(url).context("connect to REDIS_URL")?),
        None => Arc::new(InMemoryCache::new()),
    };

    let llm_client: Arc<dyn LlmClient> = match &config.openai_base_url {
        Some(base_url) => Arc::new(llm_openai::OpenAiLlmClient::with_base_url(
            config.openai_api_key.clone(),
            base_url.clone(),
        )),
        None => Arc::new(llm_openai::OpenAiLlmClient::new(config.openai_api_key.clone())),
    };

    let places_client = Arc::new(PlacesClient::new(config.places_api_base_url.clone(), config.places_api_timeout));
    let tool_registry = Arc::new(
        ToolRegistry::new()
            .register(Arc::new(SearchPlacesTool::new(places_client.clone())))
            .register(Arc::new(CreateItineraryTool::new(places_client))),
    );

    let metrics_recorder = metrics::MetricsRecorder::new(metrics_store);

    let orchestrator = PipelineOrchestrator::new(
        config,
        conversation_store,
        preferences_store,
        cache,
        llm_client,
        tool_registry,
        metrics_recorder,
    );

    let request = PipelineRequest {
        user_id,
        session_id: session_id.unwrap_or_else(Uuid::new_v4),
        query,
        language,
        location: match (lat, lon) {
            (Some(lat), Some(lon)) => Some(LocationInput { lat, lon }),
            _ => None,
        },
    };

    let outcome = orchestrator.handle(request).await;
    let json = match &outcome {
        PipelineOutcome::Success(response) => serde_json::to_value(response)?,
        PipelineOutcome::Error(err) => serde_json::to_value(err)?,
    };
    println!("{}", serde_json::to_string_pretty(&json)?);

    if matches!(outcome, PipelineOutcome::Error(_)) {
        anyhow::bail!("pipeline returned an error response");
    }
    Ok(())
}
