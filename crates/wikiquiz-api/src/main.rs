//! wikiquiz API server - Wikipedia articles in, structured quizzes out.
//!
//! Startup resolves all configuration from the environment, initializes the
//! persistence store, and serves the HTTP surface. The generation credential
//! is intentionally not required at boot: read-only endpoints keep working
//! without it, and generation requests fail with a clear backend-unavailable
//! error instead.

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use wikiquiz_core::{ArticleExtractor, Config, QuizStore};

mod routes;

use routes::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load a local .env when present; real environment wins.
    dotenvy::dotenv().ok();
    initialize_logging()?;

    let config = Config::from_env()?;
    if config.api_key.is_none() {
        tracing::warn!(
            "GROQ_API_KEY is not set; /generate_quiz will fail until it is configured"
        );
    }

    let store = QuizStore::connect(&config.database_url).await?;
    let extractor = std::sync::Arc::new(ArticleExtractor::new()?);

    let state = AppState {
        store,
        extractor,
        config: config.clone(),
    };
    let app = routes::router(state);

    let listener = tokio::net::TcpListener::bind(&config.addr).await?;
    info!(addr = %config.addr, "wikiquiz API listening");
    axum::serve(listener, app).await?;

    Ok(())
}

fn initialize_logging() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
    Ok(())
}
