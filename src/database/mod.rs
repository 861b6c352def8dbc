//! Database link: the single PostgreSQL session and its role query
//!
//! - `Connector` makes exactly one connection attempt, never retrying
//! - `Session` answers "is this node in recovery?" and can be closed
//! - `DatabaseLink` publishes the session once and lets handlers classify

mod link;
mod postgres;

pub use link::DatabaseLink;
pub use postgres::{PgConnector, PgSession};

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("Unable to connect to database: {0}")]
    Connect(#[source] sqlx::Error),

    #[error("Failed to query recovery state: {0}")]
    Query(#[source] sqlx::Error),

    #[error("Failed to close database connection: {0}")]
    Close(#[source] sqlx::Error),

    #[error("Database connection is closed")]
    Closed,

    #[error("Database link already holds a connection")]
    AlreadyConnected,
}

/// Role of the database node, derived fresh from every recovery query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    /// Not in recovery, accepts writes
    Primary,
    /// In recovery, replaying a primary's WAL
    Replica,
    /// No connection yet, or the query failed
    Unreachable,
}

impl NodeRole {
    /// Map the result of `pg_is_in_recovery()` to a role
    pub fn from_recovery(in_recovery: bool) -> Self {
        if in_recovery {
            NodeRole::Replica
        } else {
            NodeRole::Primary
        }
    }

    /// Label used in logs and metrics
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeRole::Primary => "primary",
            NodeRole::Replica => "replica",
            NodeRole::Unreachable => "unreachable",
        }
    }
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A live database session
#[async_trait]
pub trait Session: Send + Sync {
    /// Run the recovery query once
    async fn is_in_recovery(&self) -> Result<bool, DatabaseError>;

    /// Release the connection. Further queries fail with `DatabaseError::Closed`;
    /// closing again is a no-op.
    async fn close(&self) -> Result<(), DatabaseError>;
}

/// Opens sessions; one call is one attempt
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> Result<Arc<dyn Session>, DatabaseError>;
}

#[cfg(test)]
pub(crate) mod testing;

#[cfg(test)]
#[path = "link_test.rs"]
mod link_tests;

#[cfg(test)]
#[path = "postgres_test.rs"]
mod postgres_tests;
