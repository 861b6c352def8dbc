//! PostgreSQL role probe
//!
//! Sidecar that reports whether the PostgreSQL node it is attached to is a
//! primary, a replica, or unreachable, for load balancer health checks.

pub mod config;
pub mod database;
pub mod lifecycle;
pub mod server;
