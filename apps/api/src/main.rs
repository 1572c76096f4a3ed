use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cvmatch::config::Config;
use cvmatch::embedding::{gemini, openai, GeminiProvider, OpenAiProvider};
use cvmatch::routes::build_router;
use cvmatch::state::AppState;
use cvmatch::CoreContext;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_directive(&config.rust_log))),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting cvmatch API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize embedding providers
    let primary = GeminiProvider::new(config.gemini_api_key.clone(), &config.core)
        .context("Failed to build Gemini client")?;
    let secondary = OpenAiProvider::new(config.openai_api_key.clone(), &config.core)
        .context("Failed to build OpenAI client")?;
    info!(
        "Embedding providers initialized (primary: {}, secondary: {})",
        gemini::GEMINI_MODEL,
        openai::OPENAI_MODEL
    );

    // Build scoring core (connects Redis L2 when REDIS_URL is set)
    let core =
        CoreContext::connect(config.core.clone(), Arc::new(primary), Arc::new(secondary)).await;
    let state = AppState::new(core);

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

/// Filter used when `RUST_LOG` is unset: covers the library and this binary.
fn default_log_directive(level: &str) -> String {
    format!(
        "{}={level},{}={level}",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_CRATE_NAME")
    )
}
