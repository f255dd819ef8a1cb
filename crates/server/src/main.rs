mod bootstrap;
mod cart;
mod catalog;
mod checkout;
mod health;
mod routes;
mod sessions;
mod state;
#[cfg(test)]
mod testing;

use std::future::IntoFuture;

use anyhow::Result;
use shopfront_core::config::{AppConfig, LoadOptions};

fn init_logging(config: &AppConfig) {
    use shopfront_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);

    match config.logging.format {
        Compact => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).compact().init();
        }
        Pretty => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).pretty().init();
        }
        Json => {
            tracing_subscriber::fmt().with_target(false).with_max_level(log_level).json().init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

pub async fn run() -> Result<()> {
    // Load config and initialize logging before any other operations
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;

    tracing::info!(
        event_name = "system.server.started",
        correlation_id = "bootstrap",
        bind_address = %address,
        store = %app.config.store.name,
        "shopfront-server listening"
    );

    let router = routes::router(app.state.clone(), app.db_pool.clone());

    let grace = std::time::Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        let _ = shutdown_tx.send(true);
    });

    let mut signal_rx = shutdown_rx.clone();
    let server = axum::serve(listener, router).with_graceful_shutdown(async move {
        let _ = signal_rx.changed().await;
    });
    serve_with_drain_limit(server.into_future(), shutdown_rx, grace).await?;

    tracing::info!(
        event_name = "system.server.stopping",
        correlation_id = "shutdown",
        "shopfront-server stopping"
    );

    Ok(())
}

/// Wait for the server to drain, but no longer than the configured grace
/// period after the shutdown signal fired.
async fn serve_with_drain_limit<S>(
    server: S,
    mut shutdown: tokio::sync::watch::Receiver<bool>,
    grace: std::time::Duration,
) -> std::io::Result<()>
where
    S: std::future::Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        result = server => result,
        _ = async {
            let _ = shutdown.changed().await;
            tokio::time::sleep(grace).await;
        } => {
            tracing::warn!(
                event_name = "system.server.drain_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "open connections outlived the shutdown grace period"
            );
            Ok(())
        }
    }
}
