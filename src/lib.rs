pub mod config;
pub mod errors;
pub mod guidance;
pub mod instructions;
pub mod reasoning;
pub mod server;

use crate::config::AppConfig;
use crate::errors::HandrailResult;
use crate::server::state::AppState;

pub async fn run() -> HandrailResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
        )
        .init();

    // Load .env file if present (ignore error if not found)
    let _ = dotenvy::dotenv();

    // Boot with built-in defaults when no config.toml is around; every
    // setting has a workable default for local use.
    let config = match config::load_config() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load config, using built-in defaults");
            AppConfig::default()
        }
    };

    let host = config.server.host.clone();
    let port = config.server.resolve_port();

    let state = AppState::from_config(config);
    let router = server::build_router(state);

    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "handrail listening");
    axum::serve(listener, router).await?;

    Ok(())
}
