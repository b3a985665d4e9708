use std::sync::Arc;

use anyhow::Context;

use stockline_api::app::{self, AppServices};
use stockline_infra::ServiceConfig;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    stockline_observability::init();

    let config = ServiceConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(AppServices::from_config(&config).context("failed to build services")?);

    // Fail fast on an unreachable store instead of serving 503s.
    let report = services.health().await;
    if !report.ok {
        anyhow::bail!(
            "inventory store ({}) unavailable at startup: {}",
            report.backend,
            report.error.unwrap_or_default()
        );
    }

    let app = app::router(services.clone());

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(backend = report.backend, "listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    services.shutdown().await;
    tracing::info!("shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
