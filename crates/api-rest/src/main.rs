//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the consultation REST API on its own, with OpenAPI/Swagger UI. The workspace's
//! `consult-run` binary starts the same router.

use api_rest::{router, AppState};
use api_shared::ApiToken;
use consult_core::{constants::DEFAULT_DATA_DIR, CoreConfig};
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the consultation REST API server
///
/// # Environment Variables
/// - `CONSULT_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CONSULT_DATA_DIR`: Data directory (default: "consult_data"); created if missing
/// - `API_TOKEN`: Bearer token required on every route except `/health`
///
/// # Errors
/// Returns an error if:
/// - `API_TOKEN` is unset or blank,
/// - the data directory cannot be created,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?)
                .add_directive("consult_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CONSULT_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = std::env::var("CONSULT_DATA_DIR").unwrap_or_else(|_| DEFAULT_DATA_DIR.into());

    let Some(token) = std::env::var("API_TOKEN").ok().and_then(ApiToken::new) else {
        anyhow::bail!("API_TOKEN must be set to a non-empty value");
    };

    let cfg = Arc::new(CoreConfig::with_data_dir(PathBuf::from(data_dir)));
    cfg.ensure_data_dir()?;
    let state = AppState::new(cfg.clone(), token)?;

    tracing::info!(
        "-- Starting consultation REST API on {} (data: {})",
        addr,
        cfg.data_dir().display()
    );

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, router(state)).await?;

    Ok(())
}
