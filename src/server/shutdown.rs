//! Graceful shutdown handling for the probe
//!
//! A SIGTERM flips a shared one-shot signal:
//! - the orchestrator stops waiting (or stops retrying the database)
//! - the HTTP server drains in-flight requests
//! - the database connection is released

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Receiving side of the shutdown signal
///
/// Clones observe the same trigger.
#[derive(Clone)]
pub struct ShutdownSignal {
    receiver: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve once shutdown is triggered or the controller is gone
    pub async fn wait(&mut self) {
        // A dropped controller can never fire, so it counts as shutdown too
        if self.receiver.wait_for(|stopped| *stopped).await.is_err() {
            debug!("Shutdown controller dropped");
        }
    }

    pub fn is_shutdown(&self) -> bool {
        *self.receiver.borrow()
    }
}

/// Sole writer of the shutdown signal
pub struct ShutdownController {
    sender: watch::Sender<bool>,
}

impl ShutdownController {
    /// Trigger shutdown. Repeated calls have no further effect.
    pub fn shutdown(&self) {
        if !self.sender.send_replace(true) {
            info!("Shutdown signal sent");
        }
    }
}

/// Create a new shutdown signal pair
///
/// Returns (controller, signal) where:
/// - controller: Used to trigger shutdown
/// - signal: Cloned and passed to components that need to listen
pub fn shutdown_channel() -> (ShutdownController, ShutdownSignal) {
    let (sender, receiver) = watch::channel(false);
    (ShutdownController { sender }, ShutdownSignal { receiver })
}

/// Spawn the task that turns SIGTERM into a shutdown
///
/// The handler is registered before this returns, so a registration failure
/// surfaces as a startup error. Only SIGTERM is handled.
#[cfg(unix)]
pub fn listen_for_termination(controller: ShutdownController) -> std::io::Result<JoinHandle<()>> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut sigterm = signal(SignalKind::terminate())?;

    Ok(tokio::spawn(async move {
        if sigterm.recv().await.is_some() {
            info!("Received SIGTERM");
            controller.shutdown();
        }
    }))
}

/// Spawn the task that turns Ctrl+C into a shutdown (Windows has no SIGTERM)
#[cfg(not(unix))]
pub fn listen_for_termination(controller: ShutdownController) -> std::io::Result<JoinHandle<()>> {
    use tracing::error;

    Ok(tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received Ctrl+C");
                controller.shutdown();
            }
            Err(e) => error!(error = %e, "Failed to wait for Ctrl+C"),
        }
    }))
}
