use axum::routing::{get, post};
use axum::Router;
use tracing_subscriber::EnvFilter;

use repo_chat::api;
use repo_chat::config::Config;
use repo_chat::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Config::from_env();
    tracing::info!("Data directory: {}", config.data_dir.display());
    tracing::info!("LLM provider: {} ({})", config.llm.provider, config.llm.base_url);

    let state = AppState::new(config.clone())?;
    match state.vectors.vintage() {
        Some(vintage) => tracing::info!("Data last updated: {vintage}"),
        None => tracing::warn!("Serving an empty or unnamed collection"),
    }

    let app = Router::new()
        .route("/api/chat", post(api::chat::chat))
        .route("/api/export", get(api::export::export_tsv))
        .route("/api/reset", post(api::export::reset_session))
        .route("/api/meta", get(api::export::meta))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("Server listening on {}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}
