use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use stockroom_api::app::{self, services::AppServices};
use stockroom_infra::config::{AppConfig, LOG_FORMAT_VAR};
use stockroom_observability::LogFormat;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logging comes up first so configuration warnings are visible; a bad
    // value is still reported by `AppConfig::from_env` below.
    let log_format = std::env::var(LOG_FORMAT_VAR)
        .ok()
        .and_then(|v| v.parse::<LogFormat>().ok())
        .unwrap_or_default();
    stockroom_observability::init(log_format);

    let config = AppConfig::from_env().context("invalid configuration")?;

    let services = AppServices::from_config(&config)
        .await
        .with_context(|| format!("failed to open catalog store at {}", config.database_url))?;
    let app = app::build_app(Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
