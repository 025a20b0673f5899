use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chiplabel_api::config::ServerConfig;
use chiplabel_api::router::build_app_router;
use chiplabel_api::state::AppState;
use chiplabel_events::{EventBus, EventLogger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "chiplabel_api=debug,chiplabel_queue=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env().context("Invalid configuration")?;
    tracing::info!(
        host = %config.host,
        data_dir = %config.queue.data_dir.display(),
        port = %config.port,
        tracker = %config.queue.tracker_path().display(),
        outputs = %config.queue.outputs_path().display(),
        storage_epsg = config.queue.storage_crs.epsg(),
        display_epsg = config.queue.display_crs.epsg(),
        "Loaded server configuration"
    );

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let logger_handle = tokio::spawn(EventLogger::run(event_bus.subscribe()));
    tracing::info!("Event bus and event logger started");

    // --- App state ---
    let addr = SocketAddr::new(
        config.host.parse().context("Invalid HOST address")?,
        config.port,
    );
    let state = AppState::new(config, Arc::clone(&event_bus));

    // --- Session ---
    let first_chip = state
        .run_queue(|queue| Ok(queue.start()?.chip().map(|chip| chip.id.clone())))
        .await
        .context("Failed to start labeling session")?;
    match first_chip {
        Some(chip_id) => tracing::info!(chip_id = %chip_id, "First chip ready"),
        None => tracing::info!("Queue is empty, nothing to label"),
    }

    // --- Router ---
    let app = build_app_router(state.clone()).context("Invalid CORS configuration")?;

    // --- Start server ---
    tracing::info!(%addr, "Starting server");
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    // Return the active chip to the pool so the next run picks it up.
    match state.run_queue(|queue| Ok(queue.exit()?)).await {
        Ok(Some(chip_id)) => tracing::info!(chip_id = %chip_id, "Released active chip"),
        Ok(None) => {}
        Err(e) => tracing::error!(error = %e, "Failed to release active chip on shutdown"),
    }

    // Drop every bus handle to close the broadcast channel; the logger then
    // drains and exits.
    drop(state);
    drop(event_bus);
    let _ = tokio::time::timeout(Duration::from_secs(5), logger_handle).await;
    tracing::info!("Event logger shut down");

    tracing::info!("Graceful shutdown complete");
    Ok(())
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl-C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
