use anyhow::Context;

use longhorn_api::app::{build_app, services};
use longhorn_infra::AppConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine; the process environment still applies.
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env().context("invalid configuration")?;
    longhorn_observability::init_with(&config.log_filter, config.log_format);

    let services = services::build_services(&config)
        .await
        .context("failed to initialize storage")?;

    let app = build_app(std::sync::Arc::new(services));

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", config.bind_addr))?;

    tracing::info!("listening on {}", listener.local_addr()?);

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
