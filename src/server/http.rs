//! HTTP server with bounded graceful shutdown

use crate::server::shutdown::{shutdown_channel, ShutdownController};
use axum::Router;
use std::net::SocketAddr;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("Unable to listen on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP server failed: {0}")]
    Serve(#[source] std::io::Error),

    #[error("HTTP server task failed: {0}")]
    Join(#[from] tokio::task::JoinError),

    #[error("Server shutdown did not finish before the deadline")]
    ShutdownTimeout,
}

/// Bind the listening socket on all interfaces
///
/// Done before anything else so a taken port fails startup.
pub async fn bind(port: u16) -> Result<TcpListener, ServerError> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// A running HTTP server
///
/// Serves on its own task from `start` until `shutdown`.
pub struct HttpServer {
    local_addr: SocketAddr,
    stop: ShutdownController,
    task: JoinHandle<std::io::Result<()>>,
}

impl HttpServer {
    /// Start serving `router` on an already bound listener
    pub fn start(listener: TcpListener, router: Router) -> Result<Self, ServerError> {
        let local_addr = listener.local_addr().map_err(ServerError::Serve)?;
        let (stop, mut stopped) = shutdown_channel();

        let task = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async move { stopped.wait().await })
                .await
        });

        info!(addr = %local_addr, "HTTP server listening");

        Ok(Self {
            local_addr,
            stop,
            task,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting connections and drain in-flight requests
    ///
    /// After `timeout` the serving task is aborted and remaining requests
    /// are dropped.
    pub async fn shutdown(self, timeout: Duration) -> Result<(), ServerError> {
        self.shutdown_by(Instant::now() + timeout).await
    }

    /// Same as `shutdown`, against an absolute deadline shared with other
    /// shutdown steps
    pub async fn shutdown_by(self, deadline: Instant) -> Result<(), ServerError> {
        self.stop.shutdown();

        let mut task = self.task;
        match tokio::time::timeout_at(deadline, &mut task).await {
            Ok(Ok(Ok(()))) => {
                info!("HTTP server stopped");
                Ok(())
            }
            Ok(Ok(Err(e))) => Err(ServerError::Serve(e)),
            Ok(Err(e)) => Err(ServerError::Join(e)),
            Err(_) => {
                warn!("HTTP server did not drain in time, aborting");
                task.abort();
                Err(ServerError::ShutdownTimeout)
            }
        }
    }
}
