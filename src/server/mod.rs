//! HTTP surface of session-gate
//!
//! [`router`] maps the session protocol onto routes and [`middleware`]
//! guards them. [`Server`] owns the listener lifecycle: bind first, so the
//! caller learns the real address (port 0 included), then serve until the
//! shutdown future resolves.

pub mod middleware;
pub mod router;

pub use middleware::{AuthResponse, AuthenticatedUser};
pub use router::{build_router, AppState, HealthResponse};

use std::future::Future;
use std::net::{IpAddr, SocketAddr};

use axum::Router;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::database::Database;

/// Server lifecycle errors
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Invalid listen host: {0}")]
    InvalidHost(String),

    #[error("Failed to bind to address: {0}")]
    Bind(String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// HTTP server for session-gate, not yet listening
pub struct Server<D: Database + 'static> {
    config: ServerConfig,
    state: AppState<D>,
}

impl<D: Database + 'static> Server<D> {
    pub fn new(config: ServerConfig, state: AppState<D>) -> Self {
        Self { config, state }
    }

    /// Address from the configuration; the host must be an IP literal
    pub fn bind_addr(&self) -> Result<SocketAddr, ServerError> {
        let ip: IpAddr = self
            .config
            .host
            .parse()
            .map_err(|_| ServerError::InvalidHost(self.config.host.clone()))?;
        Ok(SocketAddr::new(ip, self.config.port))
    }

    /// Open the listener and assemble the application
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr = self.bind_addr()?;
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Bind(format!("{}: {}", addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| ServerError::Bind(e.to_string()))?;

        let app = build_router(self.state).layer(TraceLayer::new_for_http());

        Ok(BoundServer {
            listener,
            local_addr,
            app,
        })
    }

    /// Bind, then serve until `shutdown` resolves
    pub async fn run(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        self.bind().await?.serve(shutdown).await
    }
}

/// Server with an open listener
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    app: Router,
}

impl BoundServer {
    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until `shutdown` resolves, then drain in-flight requests
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        tracing::info!(addr = %self.local_addr, "Server listening");

        axum::serve(self.listener, self.app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()))?;

        tracing::info!("Server stopped");
        Ok(())
    }
}
