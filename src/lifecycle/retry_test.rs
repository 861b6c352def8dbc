//! Tests for the connect-retry loop

use super::clock::MockClock;
use super::*;
use crate::database::testing::{FakeConnector, FakeSession};
use crate::database::{Connector, DatabaseError, Session};
use crate::server::shutdown_channel;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Fails a fixed number of times, then hands out the session
struct CountdownConnector {
    failures_left: AtomicUsize,
    session: Arc<FakeSession>,
}

#[async_trait]
impl Connector for CountdownConnector {
    async fn connect(&self, _url: &str) -> Result<Arc<dyn Session>, DatabaseError> {
        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(DatabaseError::Connect(sqlx::Error::PoolTimedOut));
        }
        let session: Arc<dyn Session> = self.session.clone();
        Ok(session)
    }
}

#[tokio::test]
async fn test_connects_on_first_attempt() {
    let connector = FakeConnector::new(FakeSession::primary(), true);
    let clock = Arc::new(MockClock::new(Utc::now()));
    let reconnector = Reconnector::new(connector.clone(), clock.clone(), Duration::from_secs(2));
    let (_controller, mut signal) = shutdown_channel();

    let outcome = reconnector.connect("postgres://db", &mut signal).await;

    assert!(matches!(outcome, ConnectOutcome::Connected { attempts: 1, .. }));
    assert_eq!(connector.attempts(), 1);
    assert!(clock.sleeps().is_empty(), "No delay before the first attempt");
}

/// Each failure waits the fixed interval; success ends the loop
#[tokio::test]
async fn test_retries_with_fixed_interval_until_success() {
    let connector = Arc::new(CountdownConnector {
        failures_left: AtomicUsize::new(3),
        session: FakeSession::replica(),
    });
    let start = Utc::now();
    let clock = Arc::new(MockClock::new(start));
    let reconnector = Reconnector::new(connector, clock.clone(), Duration::from_secs(2));
    let (_controller, mut signal) = shutdown_channel();

    let outcome = reconnector.connect("postgres://db", &mut signal).await;

    match outcome {
        ConnectOutcome::Connected { session, attempts } => {
            assert_eq!(attempts, 4);
            assert!(session.is_in_recovery().await.expect("query"));
        }
        ConnectOutcome::Cancelled { .. } => panic!("loop should have connected"),
    }
    assert_eq!(clock.sleeps(), vec![Duration::from_secs(2); 3]);
    assert_eq!(clock.now(), start + chrono::Duration::seconds(6));
}

/// Failed attempts are only counted, nothing else changes
#[tokio::test]
async fn test_failed_attempts_are_recorded_in_metrics() {
    let connector = Arc::new(CountdownConnector {
        failures_left: AtomicUsize::new(2),
        session: FakeSession::primary(),
    });
    let clock = Arc::new(MockClock::new(Utc::now()));
    let metrics = crate::server::create_metrics().expect("metrics");
    let reconnector = Reconnector::new(connector, clock, Duration::from_secs(2))
        .with_metrics(metrics.clone());
    let (_controller, mut signal) = shutdown_channel();

    reconnector.connect("postgres://db", &mut signal).await;

    let body = metrics.encode().expect("encode");
    assert!(body.contains(r#"pg_role_probe_connect_attempts_total{outcome="failure"} 2"#));
    assert!(body.contains(r#"pg_role_probe_connect_attempts_total{outcome="success"} 1"#));
}

#[tokio::test]
async fn test_no_attempt_after_shutdown() {
    let connector = FakeConnector::new(FakeSession::primary(), true);
    let clock = Arc::new(MockClock::new(Utc::now()));
    let reconnector = Reconnector::new(connector.clone(), clock, Duration::from_secs(2));
    let (controller, mut signal) = shutdown_channel();
    controller.shutdown();

    let outcome = reconnector.connect("postgres://db", &mut signal).await;

    assert!(matches!(outcome, ConnectOutcome::Cancelled { attempts: 0 }));
    assert_eq!(connector.attempts(), 0);
}

/// Shutdown interrupts the wait between attempts
#[tokio::test]
async fn test_shutdown_interrupts_retry_delay() {
    let connector = FakeConnector::new(FakeSession::primary(), false);
    let reconnector = Reconnector::new(
        connector.clone(),
        Arc::new(SystemClock),
        Duration::from_secs(60),
    );
    let (controller, mut signal) = shutdown_channel();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        controller.shutdown();
    });

    let outcome = tokio::time::timeout(
        Duration::from_secs(2),
        reconnector.connect("postgres://db", &mut signal),
    )
    .await
    .expect("loop should stop on shutdown");

    assert!(matches!(outcome, ConnectOutcome::Cancelled { attempts: 1 }));
    assert_eq!(connector.attempts(), 1);
}
