use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use autocat_api::app::{AppOptions, AppServices, build_app};
use autocat_infra::config::AppConfig;

/// Directory served at `/` when `ENABLE_UI` is set.
const STATIC_DIR: &str = "public";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    autocat_observability::init();

    let config = AppConfig::from_env().context("invalid configuration")?;
    let services = Arc::new(AppServices::build(&config)?);

    let options = AppOptions {
        static_dir: config.enable_ui.then(|| PathBuf::from(STATIC_DIR)),
    };
    let app = build_app(services.clone(), options);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;

    tracing::info!(
        addr = %listener.local_addr()?,
        ui = config.enable_ui,
        timeout = ?config.job_timeout,
        "listening"
    );

    let closing = services.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            tracing::info!("shutting down");
            // Open SSE responses would otherwise keep the server alive.
            closing.events().close_all();
        })
        .await?;

    services.queue().shutdown().await;
    tracing::info!("stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
