//! Process configuration
//!
//! The only external setting is the database connection URI. Everything else
//! (port, retry interval, shutdown deadline) is fixed.

use envconfig::Envconfig;
use std::time::Duration;
use thiserror::Error;

/// Fixed port the probe listens on
pub const PROBE_PORT: u16 = 9201;

/// Delay between failed connection attempts
pub const RETRY_INTERVAL: Duration = Duration::from_secs(2);

/// Upper bound on graceful HTTP shutdown
pub const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("env var DATABASE_URL is not set: {0}")]
    MissingDatabaseUrl(#[from] envconfig::Error),
}

#[derive(Envconfig)]
pub struct Config {
    #[envconfig(from = "DATABASE_URL")]
    pub database_url: String,
}

impl Config {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::init_from_env()?)
    }
}

// Credentials live in the URI, so never print it.
impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("database_url", &"<redacted>")
            .finish()
    }
}

/// Timing and binding knobs for a probe run
///
/// `Default` yields the production values; tests shorten the durations.
#[derive(Debug, Clone)]
pub struct ProbeOptions {
    pub port: u16,
    pub retry_interval: Duration,
    pub shutdown_timeout: Duration,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            port: PROBE_PORT,
            retry_interval: RETRY_INTERVAL,
            shutdown_timeout: SHUTDOWN_TIMEOUT,
        }
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
