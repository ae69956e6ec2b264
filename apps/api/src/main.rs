mod config;
mod documents;
mod errors;
mod llm_client;
mod optimizer;
mod render;
mod routes;
mod similarity;
mod state;

use anyhow::{Context, Result};
use std::net::SocketAddr;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use std::sync::Arc;

use crate::config::Config;
use crate::llm_client::ProviderRouter;
use crate::optimizer::{Optimizer, ResumeStore};
use crate::render::StyleRules;
use crate::routes::build_router;
use crate::similarity::Embedder;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Tailor API v{}", env!("CARGO_PKG_VERSION"));
    info!(secrets = ?config.secrets, "Provider secrets loaded");

    // Load the embedding model once; it is shared read-only by all requests.
    let model_dir = config.embedding_model_dir.clone();
    let model_id = config.embedding_model.clone();
    let embedder = tokio::task::spawn_blocking(move || match model_dir {
        Some(dir) => Embedder::from_path(&dir),
        None => Embedder::from_hf(&model_id),
    })
    .await
    .context("Embedding model loader panicked")??;

    // Initialize the provider router
    let mut router = ProviderRouter::with_limits(
        config.secrets.clone(),
        config.llm_timeout_secs,
        config.llm_max_attempts,
    );
    if let Some(url) = &config.llm_base_url {
        info!("Routing LLM requests through {url}");
        router = router.with_base_url(url.clone());
    }
    info!(
        "Provider router initialized (default: {} / {})",
        config.default_provider, config.default_model
    );

    tokio::fs::create_dir_all(&config.upload_dir)
        .await
        .with_context(|| format!("Failed to create {}", config.upload_dir.display()))?;
    info!("Storing uploads under {}", config.upload_dir.display());

    // Build app state
    let state = AppState {
        optimizer: Optimizer::new(Arc::new(router), Arc::new(embedder)),
        store: ResumeStore::new(config.upload_dir.clone()),
        style_rules: Arc::new(StyleRules::default()),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
