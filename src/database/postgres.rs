//! sqlx-backed session over a single `PgConnection`

use super::{Connector, DatabaseError, Session};
use async_trait::async_trait;
use sqlx::{Connection, PgConnection};
use std::sync::Arc;
use tokio::sync::Mutex;

const RECOVERY_QUERY: &str = "SELECT pg_is_in_recovery()";

/// Connects with `PgConnection::connect`, one attempt per call
#[derive(Debug, Clone, Copy, Default)]
pub struct PgConnector;

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, url: &str) -> Result<Arc<dyn Session>, DatabaseError> {
        let conn = PgConnection::connect(url)
            .await
            .map_err(DatabaseError::Connect)?;
        Ok(Arc::new(PgSession::new(conn)))
    }
}

/// One PostgreSQL connection shared by all requests
///
/// Queries are serialized through the mutex. `None` means closed.
pub struct PgSession {
    conn: Mutex<Option<PgConnection>>,
}

impl PgSession {
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Mutex::new(Some(conn)),
        }
    }
}

#[async_trait]
impl Session for PgSession {
    async fn is_in_recovery(&self) -> Result<bool, DatabaseError> {
        let mut guard = self.conn.lock().await;
        let conn = guard.as_mut().ok_or(DatabaseError::Closed)?;

        sqlx::query_scalar::<_, bool>(RECOVERY_QUERY)
            .fetch_one(conn)
            .await
            .map_err(DatabaseError::Query)
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        let conn = self.conn.lock().await.take();
        match conn {
            Some(conn) => conn.close().await.map_err(DatabaseError::Close),
            None => Ok(()),
        }
    }
}
