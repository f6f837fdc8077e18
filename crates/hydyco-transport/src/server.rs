//! HTTP listener using Axum.
//!
//! Binds a TCP port and serves a [`Pipeline`] on it until stopped.

use std::net::SocketAddr;

use axum::Router;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::pipeline::Pipeline;

/// Listener configuration.
#[derive(Debug, Clone)]
pub struct ListenConfig {
    /// Port to listen on (0 for OS-assigned)
    pub port: u16,
    /// Hostname to bind to
    pub hostname: String,
}

impl Default for ListenConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            hostname: "0.0.0.0".into(),
        }
    }
}

impl ListenConfig {
    pub fn new(port: u16) -> Self {
        Self {
            port,
            ..Self::default()
        }
    }

    pub fn with_hostname(mut self, hostname: impl Into<String>) -> Self {
        self.hostname = hostname.into();
        self
    }
}

#[derive(Debug, Error)]
pub enum ListenError {
    #[error("invalid listen address {addr}: {source}")]
    InvalidAddress {
        addr: String,
        source: std::net::AddrParseError,
    },

    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

/// A running HTTP server.
pub struct HttpServer {
    /// Shutdown signal
    shutdown_tx: Option<mpsc::Sender<()>>,
    /// Server task handle
    handle: Option<tokio::task::JoinHandle<()>>,
    /// Actual bound address
    local_addr: SocketAddr,
}

impl HttpServer {
    /// Bind the listener and start serving the pipeline in a background task.
    pub async fn start(config: &ListenConfig, pipeline: Pipeline) -> Result<Self, ListenError> {
        let addr_str = format!("{}:{}", config.hostname, config.port);
        let addr: SocketAddr = addr_str
            .parse()
            .map_err(|source| ListenError::InvalidAddress {
                addr: addr_str.clone(),
                source,
            })?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|source| ListenError::Bind { addr, source })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| ListenError::Bind { addr, source })?;

        info!("Hydyco listening on http://{local_addr}");

        let app = Router::new().fallback_service(pipeline);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    if shutdown_rx.recv().await.is_none() {
                        debug!("Shutdown sender dropped; stopping server");
                    }
                })
                .await
            {
                error!("Server error: {e}");
            }
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
            local_addr,
        })
    }

    /// Get the actual bound port.
    pub fn port(&self) -> u16 {
        self.local_addr.port()
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Gracefully stop the server.
    pub async fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(()).await;
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
        info!("Hydyco server stopped");
    }
}
