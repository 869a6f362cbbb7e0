//! HTTP server for the Guardian agent.
//!
//! Routes are assembled in [`router`]; handlers live in [`handlers`].

pub mod handlers;
pub mod router;

// Re-export commonly used items
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{AgentError, Result};
use tracing::{info, warn};

/// Bind the configured address and serve until SIGINT or SIGTERM.
pub async fn start_web_server(state: AppState) -> Result<()> {
    let addr = state.config.bind_address();
    let app = create_app(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| AgentError::web_server_error(format!("Failed to bind to {}: {}", addr, e)))?;

    info!("Starting Guardian agent on http://{}", addr);
    info!("Health endpoint: http://{}/health", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AgentError::web_server_error(format!("Server error: {}", e)))?;

    info!("Guardian agent stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
