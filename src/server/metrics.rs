//! Prometheus metrics for the probe
//!
//! Exposed on `/metrics` next to the role and health endpoints.

use crate::database::NodeRole;
use prometheus::{Encoder, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

pub type SharedMetrics = Arc<ProbeMetrics>;

/// Counters and gauges for classification and connection state
pub struct ProbeMetrics {
    registry: Registry,
    classifications: IntCounterVec,
    connect_attempts: IntCounterVec,
    connected: IntGauge,
}

impl ProbeMetrics {
    pub fn new() -> Result<Self, prometheus::Error> {
        let registry = Registry::new();

        let classifications = IntCounterVec::new(
            Opts::new(
                "pg_role_probe_classifications_total",
                "Role classifications served, by result",
            ),
            &["role"],
        )?;
        let connect_attempts = IntCounterVec::new(
            Opts::new(
                "pg_role_probe_connect_attempts_total",
                "Database connection attempts, by outcome",
            ),
            &["outcome"],
        )?;
        let connected = IntGauge::new(
            "pg_role_probe_database_connected",
            "1 while the database connection is established",
        )?;

        registry.register(Box::new(classifications.clone()))?;
        registry.register(Box::new(connect_attempts.clone()))?;
        registry.register(Box::new(connected.clone()))?;

        Ok(Self {
            registry,
            classifications,
            connect_attempts,
            connected,
        })
    }

    pub fn record_classification(&self, role: NodeRole) {
        self.classifications
            .with_label_values(&[role.as_str()])
            .inc();
    }

    pub fn record_connect_attempt(&self, success: bool) {
        let outcome = if success { "success" } else { "failure" };
        self.connect_attempts.with_label_values(&[outcome]).inc();
    }

    pub fn set_connected(&self, connected: bool) {
        self.connected.set(i64::from(connected));
    }

    /// Render all metrics in the Prometheus text format
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&self.registry.gather(), &mut buffer)?;
        String::from_utf8(buffer).map_err(|e| prometheus::Error::Msg(e.to_string()))
    }
}

/// Create the shared metrics registry
pub fn create_metrics() -> Result<SharedMetrics, prometheus::Error> {
    Ok(Arc::new(ProbeMetrics::new()?))
}
