//! HTTP server for the role, health, and metrics endpoints
//!
//! - `/` - Role of the database node (load balancer check)
//! - `/health` - Liveness probe (process is running)
//! - `/metrics` - Prometheus metrics
//!
//! Also provides graceful shutdown handling for SIGTERM.

mod health;
mod http;
pub mod metrics;
pub mod shutdown;

pub use health::{build_router, role_response, ServerState};
pub use http::{bind, HttpServer, ServerError};
pub use metrics::{create_metrics, ProbeMetrics, SharedMetrics};
pub use shutdown::{
    listen_for_termination, shutdown_channel, ShutdownController, ShutdownSignal,
};

#[cfg(test)]
#[path = "health_test.rs"]
mod health_tests;

#[cfg(test)]
#[path = "http_test.rs"]
mod http_tests;

#[cfg(test)]
#[path = "shutdown_test.rs"]
mod shutdown_tests;
