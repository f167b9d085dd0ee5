//! Shared harness for coordinator integration tests.
//!
//! Runs the full coordinator and worker loops against the in-memory
//! messaging provider with aggressive timings so end-to-end flows settle in
//! milliseconds.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use courier_core::broker::{BrokerSession, SubscriptionHandle};
use courier_core::config::CourierConfig;
use courier_core::coordinator::Coordinator;
use courier_core::correlation::CorrelationId;
use courier_core::messaging::{InMemoryMessagingService, MessagingProvider};
use courier_core::status_store::RequestEntry;
use courier_core::worker::{WorkHandler, WorkerLoop};

/// Configuration with millisecond-scale polling and sweeping
pub fn fast_config() -> CourierConfig {
    let mut config = CourierConfig::default();
    config.broker.poll_interval_ms = 10;
    config.broker.reconnect_delay_secs = 1;
    config.retention.ttl_secs = 1;
    config.retention.sweep_interval_secs = 1;
    config
}

/// Uppercases the payload, like the demo worker but without the think time
pub struct UppercaseHandler;

#[async_trait]
impl WorkHandler for UppercaseHandler {
    async fn process(&self, payload: &str) -> anyhow::Result<String> {
        Ok(format!("Processed: {}", payload.to_uppercase()))
    }
}

/// Fails every request with a fixed domain error
pub struct RejectingHandler;

#[async_trait]
impl WorkHandler for RejectingHandler {
    async fn process(&self, _payload: &str) -> anyhow::Result<String> {
        Err(anyhow::anyhow!("not found"))
    }
}

pub struct Harness {
    pub coordinator: Arc<Coordinator>,
    pub service: InMemoryMessagingService,
    worker_subscription: Option<SubscriptionHandle>,
}

impl Harness {
    /// Coordinator only; no worker consumes the request queue
    pub async fn without_worker() -> Self {
        Self::build(fast_config(), None::<UppercaseHandler>).await
    }

    /// Coordinator plus a worker loop running `handler`
    pub async fn with_worker<H: WorkHandler>(handler: H) -> Self {
        Self::build(fast_config(), Some(handler)).await
    }

    pub async fn build<H: WorkHandler>(config: CourierConfig, handler: Option<H>) -> Self {
        let service = InMemoryMessagingService::new();
        let coordinator = Arc::new(
            Coordinator::start(&config, MessagingProvider::InMemory(service.clone()))
                .await
                .expect("coordinator start"),
        );

        let worker_subscription = match handler {
            Some(handler) => {
                // Worker gets its own session over the same shared queues
                let session = Arc::new(BrokerSession::new(
                    MessagingProvider::InMemory(service.clone()),
                    &config,
                ));
                session.connect().await.expect("worker connect");
                let worker =
                    WorkerLoop::new(session, handler, config.queues.request_queue.clone());
                Some(worker.start())
            }
            None => None,
        };

        Self {
            coordinator,
            service,
            worker_subscription,
        }
    }

    /// Poll until the entry reaches a terminal status, or panic at the deadline
    pub async fn wait_for_terminal(&self, id: &CorrelationId) -> RequestEntry {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if let Some(entry) = self.coordinator.status(id) {
                if entry.status.is_terminal() {
                    return entry;
                }
            }
            if tokio::time::Instant::now() >= deadline {
                panic!("request {id} did not settle before the deadline");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until the named queue is empty, or panic at the deadline
    pub async fn wait_for_empty_queue(&self, queue_name: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while self.service.queue_length(queue_name).await > 0 {
            if tokio::time::Instant::now() >= deadline {
                panic!("queue {queue_name} did not drain before the deadline");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    /// Poll until `predicate` holds, or panic at the deadline
    pub async fn wait_until<F: Fn() -> bool>(&self, what: &str, predicate: F) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        while !predicate() {
            if tokio::time::Instant::now() >= deadline {
                panic!("timed out waiting for {what}");
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }

    pub async fn shutdown(self) {
        if let Some(subscription) = self.worker_subscription {
            subscription.shutdown().await;
        }
        let coordinator = Arc::into_inner(self.coordinator)
            .expect("coordinator handles still held at shutdown");
        coordinator.shutdown().await;
    }
}
