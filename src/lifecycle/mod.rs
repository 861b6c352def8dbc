//! Lifecycle orchestration
//!
//! Startup order is fixed: the HTTP server is accepting before the first
//! database connection attempt, so load balancers see `503 down` instead of
//! connection refusals while the database is unavailable.
//!
//! ```text
//! Init -> ServerStarting -> Connecting -> Ready -> ShuttingDown -> Stopped
//!                               |                      ^
//!                               +---- (shutdown) ------+
//! ```

pub mod clock;
pub mod retry;

pub use clock::{Clock, SystemClock};
pub use retry::{ConnectOutcome, Reconnector};

use crate::config::ProbeOptions;
use crate::database::{Connector, DatabaseLink};
use crate::server::{
    bind, build_router, create_metrics, HttpServer, ServerError, SharedMetrics, ShutdownSignal,
};
use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error(transparent)]
    Server(#[from] ServerError),

    #[error("Failed to create metrics registry: {0}")]
    Metrics(#[from] prometheus::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Init,
    ServerStarting,
    Connecting,
    Ready,
    ShuttingDown,
    Stopped,
}

/// Drives one probe run from startup to shutdown
pub struct Orchestrator {
    options: ProbeOptions,
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    link: DatabaseLink,
    metrics: SharedMetrics,
    state: watch::Sender<LifecycleState>,
}

impl Orchestrator {
    pub fn new(
        options: ProbeOptions,
        connector: Arc<dyn Connector>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, LifecycleError> {
        let (state, _) = watch::channel(LifecycleState::Init);
        Ok(Self {
            options,
            connector,
            clock,
            link: DatabaseLink::new(),
            metrics: create_metrics()?,
            state,
        })
    }

    /// The link handlers read from; empty until the first connection
    pub fn link(&self) -> DatabaseLink {
        self.link.clone()
    }

    pub fn metrics(&self) -> SharedMetrics {
        self.metrics.clone()
    }

    /// Follow state transitions
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.state.subscribe()
    }

    /// Bind the fixed port and run until shutdown
    ///
    /// A bind failure is returned before any connection attempt is made.
    pub async fn run(self, url: &str, shutdown: ShutdownSignal) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::ServerStarting);
        let listener = bind(self.options.port).await?;
        self.drive(listener, url, shutdown).await
    }

    /// Same as `run`, serving on a listener the caller already bound
    pub async fn run_with_listener(
        self,
        listener: TcpListener,
        url: &str,
        shutdown: ShutdownSignal,
    ) -> Result<(), LifecycleError> {
        self.transition(LifecycleState::ServerStarting);
        self.drive(listener, url, shutdown).await
    }

    async fn drive(
        self,
        listener: TcpListener,
        url: &str,
        mut shutdown: ShutdownSignal,
    ) -> Result<(), LifecycleError> {
        let router = build_router(self.link.clone(), self.metrics.clone());
        let server = HttpServer::start(listener, router)?;

        self.transition(LifecycleState::Connecting);
        let reconnector = Reconnector::new(
            self.connector.clone(),
            self.clock.clone(),
            self.options.retry_interval,
        )
        .with_metrics(self.metrics.clone());

        match reconnector.connect(url, &mut shutdown).await {
            ConnectOutcome::Connected { session, .. } => {
                // `link()` hands out clones, so a caller may have published first
                if let Err(e) = self.link.publish(session.clone()) {
                    warn!(error = %e, "Discarding extra database connection");
                    if let Err(e) = session.close().await {
                        warn!(error = %e, "Extra database connection did not close cleanly");
                    }
                }
                self.metrics.set_connected(true);
                self.transition(LifecycleState::Ready);

                shutdown.wait().await;
            }
            ConnectOutcome::Cancelled { attempts } => {
                info!(
                    attempts = attempts,
                    "Shutdown requested before the database connection was established"
                );
            }
        }

        self.transition(LifecycleState::ShuttingDown);
        info!("Stopping server");

        // One deadline covers both the drain and the close
        let deadline = Instant::now() + self.options.shutdown_timeout;

        if let Err(e) = server.shutdown_by(deadline).await {
            error!(error = %e, "Server shutdown failed");
        }

        // An abandoned request can still hold the connection mid-query
        if tokio::time::timeout_at(deadline, self.link.close())
            .await
            .is_err()
        {
            warn!("Database connection did not close in time, dropping it");
        }
        self.metrics.set_connected(false);

        self.transition(LifecycleState::Stopped);
        info!("Server stopped");
        Ok(())
    }

    fn transition(&self, next: LifecycleState) {
        let previous = self.state.send_replace(next);
        debug!(from = ?previous, to = ?next, "Lifecycle transition");
    }
}

#[cfg(test)]
#[path = "retry_test.rs"]
mod retry_tests;

#[cfg(test)]
#[path = "lifecycle_test.rs"]
mod lifecycle_tests;
