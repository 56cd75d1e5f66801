use std::future::{Future, IntoFuture};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::router::build_router;
use crate::state::AppState;

/// The shadow HTTP service.
pub struct ShadowServer {
    config: ServerConfig,
}

impl ShadowServer {
    pub fn new(config: ServerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address and serve until SIGINT or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown_signal()).await
    }

    /// Load entries, serve on `listener` until `shutdown` resolves, then
    /// close the store.
    ///
    /// After `shutdown`, in-flight requests get `shutdown_timeout` to finish.
    pub async fn serve_on<F>(self, listener: TcpListener, shutdown: F) -> ServerResult<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let config = self.config;
        let state = {
            let config = config.clone();
            tokio::task::spawn_blocking(move || AppState::open(&config))
                .await
                .map_err(|e| ServerError::Internal(e.to_string()))??
        };
        let app = build_router(state.clone(), config.compression);

        info!(addr = %listener.local_addr()?, "shadow server listening");

        let draining = Arc::new(Notify::new());
        let notify = Arc::clone(&draining);
        let serve = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                shutdown.await;
                notify.notify_one();
            })
            .into_future();
        let timeout = config.shutdown_timeout();

        tokio::select! {
            result = serve => result?,
            _ = async {
                draining.notified().await;
                tokio::time::sleep(timeout).await;
            } => {
                warn!(timeout_secs = timeout.as_secs(), "graceful shutdown timed out");
            }
        }

        let entries = Arc::clone(&state.entries);
        tokio::task::spawn_blocking(move || entries.close())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))??;
        info!("shadow server stopped");
        Ok(())
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "failed to listen for ctrl-c");
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
                error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("shutdown signal received");
}
