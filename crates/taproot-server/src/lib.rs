//! HTTP query service over the published graph snapshot

pub mod error;
pub mod handlers;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use anyhow::{Context, Result};
use taproot_core::SnapshotCell;
use taproot_rebuild::RebuildHandle;

pub use error::ApiError;
pub use router::create_router;
pub use service::{NodeRef, QueryService};

/// Shared state behind every handler
pub struct ServerState {
    pub query: QueryService,
    pub rebuild: RebuildHandle,
}

impl ServerState {
    pub fn new(cell: Arc<SnapshotCell>, rebuild: RebuildHandle, max_depth_cap: u32) -> Self {
        Self {
            query: QueryService::new(cell).with_depth_cap(max_depth_cap),
            rebuild,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { host: "127.0.0.1".into(), port: 7890 }
    }
}

pub struct TaprootServer {
    state: Arc<ServerState>,
    config: ServerConfig,
}

impl TaprootServer {
    pub fn new(state: ServerState, config: ServerConfig) -> Self {
        Self { state: Arc::new(state), config }
    }

    pub fn state(&self) -> Arc<ServerState> {
        Arc::clone(&self.state)
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<()> {
        let ServerConfig { host, port } = &self.config;
        let listener = tokio::net::TcpListener::bind((host.as_str(), *port))
            .await
            .with_context(|| format!("failed to bind {host}:{port}"))?;
        tracing::info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, create_router(self.state))
            .with_graceful_shutdown(shutdown_signal())
            .await
            .context("server error")
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
