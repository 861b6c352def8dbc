//! In-memory connector and session for tests

#![allow(clippy::expect_used)]

use super::{Connector, DatabaseError, Session};
use async_trait::async_trait;
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// What the next recovery query returns
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recovery {
    InRecovery(bool),
    Fails,
    /// Never answers
    Stalls,
}

/// Mirrors `PgSession`: queries and close share one connection lock
pub struct FakeSession {
    conn: tokio::sync::Mutex<()>,
    recovery: Mutex<Recovery>,
    closed: AtomicBool,
    close_calls: AtomicUsize,
}

impl FakeSession {
    pub fn new(recovery: Recovery) -> Arc<Self> {
        Arc::new(Self {
            conn: tokio::sync::Mutex::new(()),
            recovery: Mutex::new(recovery),
            closed: AtomicBool::new(false),
            close_calls: AtomicUsize::new(0),
        })
    }

    pub fn primary() -> Arc<Self> {
        Self::new(Recovery::InRecovery(false))
    }

    pub fn replica() -> Arc<Self> {
        Self::new(Recovery::InRecovery(true))
    }

    pub fn failing() -> Arc<Self> {
        Self::new(Recovery::Fails)
    }

    pub fn set_recovery(&self, recovery: Recovery) {
        *self.recovery.lock().expect("FakeSession lock poisoned") = recovery;
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn close_calls(&self) -> usize {
        self.close_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Session for FakeSession {
    async fn is_in_recovery(&self) -> Result<bool, DatabaseError> {
        let _conn = self.conn.lock().await;
        if self.is_closed() {
            return Err(DatabaseError::Closed);
        }
        let recovery = *self.recovery.lock().expect("FakeSession lock poisoned");
        match recovery {
            Recovery::InRecovery(value) => Ok(value),
            Recovery::Fails => Err(DatabaseError::Query(sqlx::Error::Protocol(
                "server closed the connection unexpectedly".to_string(),
            ))),
            // Keeps the connection lock, like a query the server never answers
            Recovery::Stalls => std::future::pending().await,
        }
    }

    async fn close(&self) -> Result<(), DatabaseError> {
        self.close_calls.fetch_add(1, Ordering::SeqCst);
        let _conn = self.conn.lock().await;
        self.closed.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Connector that refuses until `set_reachable(true)`
pub struct FakeConnector {
    reachable: AtomicBool,
    attempts: AtomicUsize,
    session: Arc<FakeSession>,
}

impl FakeConnector {
    pub fn new(session: Arc<FakeSession>, reachable: bool) -> Arc<Self> {
        Arc::new(Self {
            reachable: AtomicBool::new(reachable),
            attempts: AtomicUsize::new(0),
            session,
        })
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(&self, _url: &str) -> Result<Arc<dyn Session>, DatabaseError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if self.reachable.load(Ordering::SeqCst) {
            let session: Arc<dyn Session> = self.session.clone();
            Ok(session)
        } else {
            Err(DatabaseError::Connect(sqlx::Error::Io(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))))
        }
    }
}
