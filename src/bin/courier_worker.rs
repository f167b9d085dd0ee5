//! # Courier Worker
//!
//! Standalone worker binary: consumes the request queue over PGMQ, uppercases
//! the payload, and publishes the result to each message's reply queue.
//!
//! ## Usage
//!
//! ```bash
//! # Run with default configuration from ./config
//! cargo run --bin courier-worker
//!
//! # Run with a specific environment overlay
//! COURIER_ENV=production cargo run --bin courier-worker
//! ```

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use tokio::signal;
use tracing::info;

use courier_core::broker::BrokerSession;
use courier_core::config::ConfigManager;
use courier_core::logging;
use courier_core::messaging::{MessagingProvider, PgmqMessagingService};
use courier_core::worker::{WorkHandler, WorkerLoop};

/// Demo handler: simulates a few seconds of work, then uppercases the payload
struct UppercaseHandler;

#[async_trait]
impl WorkHandler for UppercaseHandler {
    async fn process(&self, payload: &str) -> anyhow::Result<String> {
        tokio::time::sleep(Duration::from_secs(2)).await;
        Ok(format!("Processed: {}", payload.to_uppercase()))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_structured_logging();

    info!("Starting Courier worker");
    info!("   Version: {}", env!("CARGO_PKG_VERSION"));

    let manager = ConfigManager::load().context("failed to load configuration")?;
    let config = manager.config();
    info!(
        environment = manager.environment(),
        request_queue = %config.queues.request_queue,
        "Configuration loaded"
    );

    let service = PgmqMessagingService::new(&config.broker.database_url)
        .await
        .context("failed to connect to PGMQ")?;

    let session = Arc::new(BrokerSession::new(
        MessagingProvider::Pgmq(service),
        config,
    ));
    session.connect_with_retry().await;

    let worker = WorkerLoop::new(
        Arc::clone(&session),
        UppercaseHandler,
        config.queues.request_queue.clone(),
    );
    let subscription = worker.start();

    info!("Worker running, press Ctrl+C to stop");
    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("Shutdown signal received, stopping worker");
    subscription.shutdown().await;
    info!("Worker stopped");
    Ok(())
}
