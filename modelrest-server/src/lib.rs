//! HTTP layer for modelrest: every registered model becomes a REST resource.
//!
//! | Method | Path | Outcome |
//! |--------|------|---------|
//! | GET | `/{resource}/` | filtered, sorted, paginated array of records |
//! | GET | `/{resource}/{id}` | one record |
//! | POST | `/{resource}/` | `201 {"result": id}` |
//! | PUT | `/{resource}/`, `/{resource}/{id}` | full replacement, `{"result": id}` |
//! | PATCH | `/{resource}/{id}` | partial update, `{"result": id}` |
//! | DELETE | `/{resource}/{id}` | `{"result": <deleted count>}` |
//!
//! Failures are `{"type": "ErrorMessage", "code": ..., "message": ...}` bodies.
//!
//! ```ignore
//! let config = ServerConfig::load()?;
//! telemetry::init_tracing(&config)?;
//!
//! let registry = ModelRegistry::builder().register::<User>().build();
//! let store = DocumentStore::new(InMemoryStore::new()).into_dyn();
//!
//! modelrest_server::serve(&config, AppState::new(registry, store)).await?;
//! ```

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod telemetry;

use tokio::{net::TcpListener, signal};

pub use config::ServerConfig;
pub use error::{ApiError, ErrorMessage, ResultMessage, ServerError};
pub use router::create_router;
pub use state::AppState;

/// Binds the configured address and serves until SIGINT or SIGTERM.
pub async fn serve(config: &ServerConfig, state: AppState) -> Result<(), ServerError> {
    let addr = config.resolve_addr().await?;
    let state = state.with_default_page_size(config.default_page_size);
    let resources = state.registry.resources().join(", ");
    let app = create_router(state);

    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, %resources, "server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::warn!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received SIGINT, shutting down"),
        _ = terminate => tracing::info!("received SIGTERM, shutting down"),
    }
}
