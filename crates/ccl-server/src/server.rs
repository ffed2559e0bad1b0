use std::future::Future;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::AppState;
use crate::router::{build_router, build_router_with_cors};

/// Carbon credit ledger HTTP server.
pub struct CclServer {
    config: ServerConfig,
    state: AppState,
}

impl CclServer {
    pub fn new(config: ServerConfig, state: AppState) -> Self {
        Self { config, state }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        if self.config.enable_cors {
            build_router_with_cors(self.state.clone())
        } else {
            build_router(self.state.clone())
        }
    }

    /// Serve on the configured address until Ctrl-C.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Serve on `listener` until `shutdown` resolves, then checkpoint the
    /// ledger so the next start loads from a fresh snapshot.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        info!("CCL server listening on {}", listener.local_addr()?);
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await?;

        info!("shutting down; writing checkpoint");
        let ledger = self.state.ledger.clone();
        tokio::task::spawn_blocking(move || ledger.checkpoint())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for Ctrl-C; shutting down");
    }
}
