use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use api_rest::{AppState, router};
use api_shared::ApiToken;
use consult_core::{CoreConfig, constants::DEFAULT_DATA_DIR};

/// Runtime settings read from the environment.
#[derive(Debug)]
struct Settings {
    rest_addr: String,
    data_dir: PathBuf,
    token: ApiToken,
}

impl Settings {
    /// # Errors
    /// Returns an error if `API_TOKEN` is unset or blank.
    fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let Some(token) = lookup("API_TOKEN").and_then(ApiToken::new) else {
            anyhow::bail!("API_TOKEN must be set to a non-empty value");
        };
        Ok(Self {
            rest_addr: lookup("CONSULT_REST_ADDR").unwrap_or_else(|| "0.0.0.0:3000".into()),
            data_dir: lookup("CONSULT_DATA_DIR")
                .unwrap_or_else(|| DEFAULT_DATA_DIR.into())
                .into(),
            token,
        })
    }
}

/// Main entry point for the consultation service
///
/// Serves the REST API until interrupted with Ctrl-C.
///
/// # Environment Variables
/// - `CONSULT_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CONSULT_DATA_DIR`: Data directory (default: "consult_data"); created if missing
/// - `API_TOKEN`: Bearer token required on every route except `/health`
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("consult_run=info".parse()?)
                .add_directive("api_rest=info".parse()?)
                .add_directive("consult_core=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let settings = Settings::from_env()?;
    let cfg = Arc::new(CoreConfig::with_data_dir(settings.data_dir));
    cfg.ensure_data_dir()?;
    let state = AppState::new(cfg.clone(), settings.token)?;

    tracing::info!("++ Starting consultation REST on {}", settings.rest_addr);
    tracing::info!("++ Data directory {}", cfg.data_dir().display());

    let listener = tokio::net::TcpListener::bind(&settings.rest_addr).await?;
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            tracing::info!("-- Shutting down");
        })
        .await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| vars.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let settings = Settings::from_lookup(lookup(&[("API_TOKEN", "t")])).unwrap();
        assert_eq!(settings.rest_addr, "0.0.0.0:3000");
        assert_eq!(settings.data_dir, PathBuf::from(DEFAULT_DATA_DIR));
    }

    #[test]
    fn test_blank_token_is_refused() {
        assert!(Settings::from_lookup(lookup(&[])).is_err());
        assert!(Settings::from_lookup(lookup(&[("API_TOKEN", "  ")])).is_err());
    }

    #[test]
    fn test_overrides() {
        let settings = Settings::from_lookup(lookup(&[
            ("API_TOKEN", "t"),
            ("CONSULT_REST_ADDR", "127.0.0.1:8080"),
            ("CONSULT_DATA_DIR", "/srv/consult"),
        ]))
        .unwrap();
        assert_eq!(settings.rest_addr, "127.0.0.1:8080");
        assert_eq!(settings.data_dir, PathBuf::from("/srv/consult"));
    }
}
