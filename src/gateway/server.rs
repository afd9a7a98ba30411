//! Gateway server

use std::future::IntoFuture;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::signal;
use tracing::{info, warn};

use super::endpoint::ENDPOINTS;
use super::router::{AppState, create_router};
use crate::config::Config;
use crate::psn::{HttpPsnClient, PsnApi};
use crate::{Error, Result};

/// PSN gateway server
pub struct Gateway {
    /// Configuration
    config: Config,
    /// Upstream client shared by all requests
    psn: Arc<dyn PsnApi>,
}

impl Gateway {
    /// Create a gateway talking to the configured PSN endpoints
    pub fn new(config: Config) -> Result<Self> {
        let psn = Arc::new(HttpPsnClient::new(&config.upstream)?);
        Ok(Self::with_client(config, psn))
    }

    /// Create a gateway over an arbitrary upstream client
    pub fn with_client(config: Config, psn: Arc<dyn PsnApi>) -> Self {
        Self { config, psn }
    }

    /// Run the gateway until Ctrl+C or SIGTERM
    pub async fn run(self) -> Result<()> {
        let addr = SocketAddr::new(
            self.config
                .server
                .host
                .parse()
                .map_err(|e| Error::Config(format!("Invalid host: {e}")))?,
            self.config.server.port,
        );

        let state = Arc::new(AppState {
            psn: Arc::clone(&self.psn),
            max_body_size: self.config.server.max_body_size,
        });
        let app = create_router(state);

        let listener = TcpListener::bind(addr).await?;

        info!("============================================================");
        info!("PSN GATEWAY v{}", env!("CARGO_PKG_VERSION"));
        info!("============================================================");
        info!(host = %self.config.server.host, port = %self.config.server.port, "Listening");
        info!(
            upstream = %self.config.upstream.api_url,
            timeout = ?self.config.upstream.timeout,
            "Upstream"
        );
        for endpoint in ENDPOINTS {
            info!("  POST {}", endpoint.path);
        }
        info!("============================================================");

        let shutdown_timeout = self.config.server.shutdown_timeout;
        let server = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .into_future();

        // In-flight requests get `shutdown_timeout` to finish once the signal arrives
        tokio::select! {
            result = server => result.map_err(|e| Error::Internal(e.to_string()))?,
            () = async {
                shutdown_signal().await;
                tokio::time::sleep(shutdown_timeout).await;
            } => {
                warn!(timeout = ?shutdown_timeout, "Graceful shutdown timed out");
            }
        }

        Ok(())
    }
}

/// Shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
}
