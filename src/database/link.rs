use super::{DatabaseError, NodeRole, Session};
use std::sync::{Arc, OnceLock};
use tracing::{error, info, warn};

/// Shared slot for the single database session
///
/// Written once by the connect loop, read by every classification request.
/// Absence means "not connected yet", not an error.
#[derive(Clone, Default)]
pub struct DatabaseLink {
    session: Arc<OnceLock<Arc<dyn Session>>>,
}

impl DatabaseLink {
    /// Create an empty link (no session yet)
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish the session. Only the first call succeeds.
    pub fn publish(&self, session: Arc<dyn Session>) -> Result<(), DatabaseError> {
        self.session
            .set(session)
            .map_err(|_| DatabaseError::AlreadyConnected)
    }

    /// Current session, if one has been published
    pub fn try_get(&self) -> Option<Arc<dyn Session>> {
        self.session.get().cloned()
    }

    pub fn is_connected(&self) -> bool {
        self.session.get().is_some()
    }

    /// Query the node role
    ///
    /// Failures are logged and reported as `Unreachable`; they never propagate.
    pub async fn classify(&self) -> NodeRole {
        let Some(session) = self.try_get() else {
            return NodeRole::Unreachable;
        };

        match session.is_in_recovery().await {
            Ok(in_recovery) => NodeRole::from_recovery(in_recovery),
            Err(e) => {
                error!(error = %e, "Failed to query recovery state");
                NodeRole::Unreachable
            }
        }
    }

    /// Release the session if one was ever published
    pub async fn close(&self) {
        let Some(session) = self.try_get() else {
            info!("No database connection to close");
            return;
        };

        match session.close().await {
            Ok(()) => info!("Database connection closed"),
            Err(e) => warn!(error = %e, "Database connection did not close cleanly"),
        }
    }
}

impl std::fmt::Debug for DatabaseLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatabaseLink")
            .field("connected", &self.is_connected())
            .finish()
    }
}
