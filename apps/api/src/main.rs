mod config;
mod errors;
mod interview;
mod llm_client;
mod routes;
mod session;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::Config;
use crate::llm_client::{HttpCompletionBackend, LlmClient};
use crate::routes::build_router;
use crate::session::orchestrator::Orchestrator;
use crate::session::store::SessionStore;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails fast on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Interview API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM client
    let backend = Arc::new(HttpCompletionBackend::new(
        config.openai_api_key.clone(),
        config.llm_api_base_url.clone(),
        config.llm_model.clone(),
    ));
    let llm = LlmClient::new(backend, config.invoke_options());
    info!("LLM client initialized (model: {})", config.llm_model);

    // Session store + orchestrator (one store for the process lifetime;
    // sessions are in-memory only)
    let orchestrator = Orchestrator::new(SessionStore::new(), llm.clone());

    let state = AppState { orchestrator, llm };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
