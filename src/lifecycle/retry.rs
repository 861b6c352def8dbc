//! Connect-retry loop
//!
//! Tries the connector until it succeeds, sleeping a fixed interval between
//! failures. There is no attempt limit; only a shutdown stops the loop early.

use crate::database::{Connector, Session};
use crate::lifecycle::clock::Clock;
use crate::server::{SharedMetrics, ShutdownSignal};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// How the loop ended
pub enum ConnectOutcome {
    Connected {
        session: Arc<dyn Session>,
        attempts: u64,
    },
    /// Shutdown arrived before any attempt succeeded
    Cancelled { attempts: u64 },
}

pub struct Reconnector {
    connector: Arc<dyn Connector>,
    clock: Arc<dyn Clock>,
    interval: Duration,
    metrics: Option<SharedMetrics>,
}

impl Reconnector {
    pub fn new(connector: Arc<dyn Connector>, clock: Arc<dyn Clock>, interval: Duration) -> Self {
        Self {
            connector,
            clock,
            interval,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: SharedMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Connect to `url`, retrying until success or shutdown
    ///
    /// Failed attempts change nothing except logs and metrics.
    pub async fn connect(&self, url: &str, shutdown: &mut ShutdownSignal) -> ConnectOutcome {
        let started = self.clock.now();
        let mut attempts: u64 = 0;

        loop {
            if shutdown.is_shutdown() {
                return ConnectOutcome::Cancelled { attempts };
            }

            attempts += 1;
            let result = tokio::select! {
                result = self.connector.connect(url) => result,
                _ = shutdown.wait() => return ConnectOutcome::Cancelled { attempts },
            };

            match result {
                Ok(session) => {
                    self.record_attempt(true);
                    let waited = self.clock.now().signed_duration_since(started);
                    info!(
                        attempts = attempts,
                        waited_secs = waited.num_seconds(),
                        "Database connection established"
                    );
                    return ConnectOutcome::Connected { session, attempts };
                }
                Err(e) => {
                    self.record_attempt(false);
                    error!(
                        attempt = attempts,
                        retry_in = ?self.interval,
                        error = %e,
                        "Unable to connect to database"
                    );
                }
            }

            tokio::select! {
                _ = self.clock.sleep(self.interval) => {}
                _ = shutdown.wait() => return ConnectOutcome::Cancelled { attempts },
            }
        }
    }

    fn record_attempt(&self, success: bool) {
        if let Some(ref metrics) = self.metrics {
            metrics.record_connect_attempt(success);
        }
    }
}
