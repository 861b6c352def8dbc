use pg_role_probe::config::{Config, ProbeOptions};
use pg_role_probe::database::PgConnector;
use pg_role_probe::lifecycle::{Orchestrator, SystemClock};
use pg_role_probe::server::{listen_for_termination, shutdown_channel};
use std::sync::Arc;
use tracing::{error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Diagnostics go to stderr; stdout stays unused
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting PostgreSQL role probe");

    let config = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "Failed to load configuration");
            return Err(e.into());
        }
    };

    // Create shutdown channel; only SIGTERM triggers it
    let (shutdown_controller, shutdown_signal) = shutdown_channel();
    let signal_handle = listen_for_termination(shutdown_controller)?;

    let orchestrator = Orchestrator::new(
        ProbeOptions::default(),
        Arc::new(PgConnector),
        Arc::new(SystemClock),
    )?;

    let result = orchestrator
        .run(&config.database_url, shutdown_signal)
        .await;
    signal_handle.abort();

    if let Err(e) = result {
        error!(error = %e, "Probe failed to start");
        return Err(e.into());
    }

    info!("PostgreSQL role probe shut down gracefully");
    Ok(())
}
