use std::sync::Arc;

use anyhow::Result;
use tokio::net::TcpListener;
use tokio::signal;
use tokio::sync::broadcast;

use transition_notifier::config::Settings;
use transition_notifier::server::{create_app, AppState};
use transition_notifier::telemetry::init_telemetry;
use transition_notifier::triggers::ChangeFeedSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let settings = Settings::new()?;

    // Initialize tracing
    let _telemetry = init_telemetry(&settings.otel, &settings.logging)?;
    tracing::info!(
        store = %settings.store.backend,
        push = %settings.push.backend,
        "Configuration loaded"
    );

    // Create application state
    let state = AppState::from_settings(settings.clone()).await;
    tracing::info!("Application state initialized");

    let (shutdown_tx, _) = broadcast::channel::<()>(1);

    // Start Redis change feed subscriber in background
    let redis_handle = if settings.redis.enabled {
        let subscriber = Arc::new(ChangeFeedSubscriber::new(
            settings.redis.clone(),
            state.notifier.clone(),
        ));
        let subscriber_shutdown = subscriber.shutdown_signal();
        let mut shutdown_rx = shutdown_tx.subscribe();
        tokio::spawn(async move {
            let _ = shutdown_rx.recv().await;
            let _ = subscriber_shutdown.send(());
        });

        Some(tokio::spawn(async move {
            if let Err(e) = subscriber.start().await {
                tracing::error!(error = %e, "Redis change feed subscriber failed");
            }
        }))
    } else {
        tracing::info!("Redis change feed disabled, only the HTTP webhook is active");
        None
    };

    let postgres_pool = state.postgres_pool.clone();

    // Create Axum app
    let app = create_app(state);

    // Start server
    let addr = settings.server_addr();
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal_handler(shutdown_tx))
        .await?;

    // Wait for background tasks to finish
    tracing::info!("Waiting for background tasks to finish...");
    if let Some(handle) = redis_handle {
        let _ = handle.await;
    }
    if let Some(pool) = postgres_pool {
        pool.close().await;
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal_handler(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }

    // Send shutdown signal to the change feed subscriber
    let _ = shutdown_tx.send(());
}
