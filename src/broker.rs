//! # Broker Session
//!
//! Owns exactly one transport handle and the reconnect policy around it.
//! Exposes publish and subscribe; the dispatcher and demultiplexer never
//! touch the provider directly.
//!
//! Connection lifecycle is a small state machine: Disconnected, Connecting,
//! Connected. Connect-failure schedules a retry after a fixed delay;
//! connection-lost drops back to Disconnected, and the subscription loop
//! re-runs the full setup (queue declaration included) before polling again.
//! Deliveries unacknowledged at disconnect time are redelivered by the
//! broker's own at-least-once guarantee once the subscription resumes.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::config::CourierConfig;
use crate::error::CourierError;
use crate::messaging::{
    MessageId, MessagingError, MessagingProvider, MessagingService, QueueMessage, QueuedMessage,
};

/// Connection state of the broker session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected = 0,
    Connecting = 1,
    Connected = 2,
}

impl From<u8> for ConnectionState {
    fn from(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Connected,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Connecting => write!(f, "connecting"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// What the subscriber decided about a delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Processed; delete the message
    Ack,
    /// Unusable; remove without redelivery
    Drop,
    /// Not processed; make it eligible for redelivery
    Requeue,
}

/// Per-delivery callback for a subscription
#[async_trait]
pub trait MessageHandler<T: QueueMessage>: Send + Sync + 'static {
    async fn handle(&self, message: QueuedMessage<T>) -> Disposition;
}

/// Single connection/transport owner with publish and subscribe primitives
#[derive(Debug)]
pub struct BrokerSession {
    provider: MessagingProvider,
    /// Queues declared on every (re)connect
    queues: Vec<String>,
    state: AtomicU8,
    reconnect_delay: Duration,
    poll_interval: Duration,
    visibility_timeout: Duration,
    batch_size: usize,
}

impl BrokerSession {
    pub fn new(provider: MessagingProvider, config: &CourierConfig) -> Self {
        Self {
            provider,
            queues: vec![
                config.queues.request_queue.clone(),
                config.queues.reply_queue.clone(),
            ],
            state: AtomicU8::new(ConnectionState::Disconnected as u8),
            reconnect_delay: config.broker.reconnect_delay(),
            poll_interval: config.broker.poll_interval(),
            visibility_timeout: config.broker.visibility_timeout(),
            batch_size: config.broker.batch_size,
        }
    }

    pub fn state(&self) -> ConnectionState {
        ConnectionState::from(self.state.load(Ordering::Acquire))
    }

    fn set_state(&self, state: ConnectionState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Mark the transport lost; the next subscription cycle reconnects
    pub fn mark_disconnected(&self) {
        self.set_state(ConnectionState::Disconnected);
    }

    /// One connection attempt: declare the required queues, then enter
    /// Connected. Failure drops back to Disconnected.
    pub async fn connect(&self) -> Result<(), MessagingError> {
        self.set_state(ConnectionState::Connecting);
        debug!(provider = self.provider.provider_name(), "Connecting broker session");

        for queue_name in &self.queues {
            if let Err(e) = self.provider.ensure_queue(queue_name).await {
                self.set_state(ConnectionState::Disconnected);
                return Err(e);
            }
        }

        self.set_state(ConnectionState::Connected);
        info!(
            provider = self.provider.provider_name(),
            queues = ?self.queues,
            "Broker session connected"
        );
        Ok(())
    }

    /// Retry `connect` with a fixed delay until it succeeds
    pub async fn connect_with_retry(&self) {
        loop {
            match self.connect().await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "Broker connect failed, scheduling retry"
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    /// Retry `connect` until success or the running flag clears
    async fn reconnect_until(&self, running: &AtomicBool) {
        while running.load(Ordering::Relaxed) {
            match self.connect().await {
                Ok(()) => return,
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_in_secs = self.reconnect_delay.as_secs(),
                        "Broker reconnect failed, scheduling retry"
                    );
                    tokio::time::sleep(self.reconnect_delay).await;
                }
            }
        }
    }

    /// Publish a message, blocking only until the broker acknowledges the
    /// enqueue. Fails fast while disconnected; a transport failure marks the
    /// session lost so the subscription loops re-run setup.
    pub async fn publish<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, CourierError> {
        if self.state() != ConnectionState::Connected {
            return Err(CourierError::BrokerDisconnected {
                message: format!("cannot publish to {queue_name} while disconnected"),
            });
        }

        match self.provider.send_message(queue_name, message).await {
            Ok(message_id) => Ok(message_id),
            Err(e) => {
                warn!(queue_name = %queue_name, error = %e, "Publish failed, marking session lost");
                self.mark_disconnected();
                Err(CourierError::Messaging(e))
            }
        }
    }

    /// Start a long-lived polling subscription on a queue.
    ///
    /// The spawned loop fetches batches under the configured visibility
    /// timeout, hands each delivery to the handler, and acks/nacks according
    /// to the returned [`Disposition`]. Transport failures flip the session
    /// to Disconnected and the loop re-establishes the subscription from
    /// scratch after the reconnect delay.
    pub fn subscribe<T, H>(self: &Arc<Self>, queue_name: String, handler: H) -> SubscriptionHandle
    where
        T: QueueMessage,
        H: MessageHandler<T>,
    {
        let session = Arc::clone(self);
        let is_running = Arc::new(AtomicBool::new(true));
        let running = Arc::clone(&is_running);
        let queue = queue_name.clone();

        let join = tokio::spawn(async move {
            info!(queue_name = %queue, "Subscription started");

            while running.load(Ordering::Relaxed) {
                if session.state() != ConnectionState::Connected {
                    session.reconnect_until(&running).await;
                    continue;
                }

                let batch = session
                    .provider
                    .receive_raw_messages(&queue, session.batch_size, session.visibility_timeout)
                    .await;

                match batch {
                    Ok(messages) if messages.is_empty() => {
                        tokio::time::sleep(session.poll_interval).await;
                    }
                    Ok(messages) => {
                        for raw in messages {
                            if !running.load(Ordering::Relaxed) {
                                break;
                            }

                            let receipt = raw.receipt_handle.clone();

                            // Decode per delivery: a payload violating the
                            // envelope is dropped so it cannot starve the
                            // messages behind it
                            let message = match T::from_bytes(&raw.message) {
                                Ok(message) => QueuedMessage::new(
                                    receipt.clone(),
                                    message,
                                    raw.receive_count,
                                    raw.enqueued_at,
                                ),
                                Err(e) => {
                                    warn!(
                                        queue_name = %queue,
                                        receipt_handle = %receipt,
                                        error = %e,
                                        "Dropping undecodable message"
                                    );
                                    if let Err(e) =
                                        session.provider.nack_message(&queue, &receipt, false).await
                                    {
                                        warn!(
                                            queue_name = %queue,
                                            receipt_handle = %receipt,
                                            error = %e,
                                            "Failed to settle delivery, marking session lost"
                                        );
                                        session.mark_disconnected();
                                        break;
                                    }
                                    continue;
                                }
                            };

                            let disposition = handler.handle(message).await;
                            let settle = match disposition {
                                Disposition::Ack => {
                                    session.provider.ack_message(&queue, &receipt).await
                                }
                                Disposition::Drop => {
                                    session.provider.nack_message(&queue, &receipt, false).await
                                }
                                Disposition::Requeue => {
                                    session.provider.nack_message(&queue, &receipt, true).await
                                }
                            };

                            if let Err(e) = settle {
                                warn!(
                                    queue_name = %queue,
                                    receipt_handle = %receipt,
                                    error = %e,
                                    "Failed to settle delivery, marking session lost"
                                );
                                session.mark_disconnected();
                                break;
                            }
                        }
                    }
                    Err(e) => {
                        warn!(queue_name = %queue, error = %e, "Receive failed, marking session lost");
                        session.mark_disconnected();
                    }
                }
            }

            debug!(queue_name = %queue, "Subscription stopped");
        });

        SubscriptionHandle {
            queue_name,
            is_running,
            join,
        }
    }
}

/// Handle to a running subscription loop
#[derive(Debug)]
pub struct SubscriptionHandle {
    queue_name: String,
    is_running: Arc<AtomicBool>,
    join: JoinHandle<()>,
}

impl SubscriptionHandle {
    pub fn queue_name(&self) -> &str {
        &self.queue_name
    }

    /// Signal the loop to stop after the current delivery
    pub fn stop(&self) {
        self.is_running.store(false, Ordering::Relaxed);
    }

    /// Stop and tear the loop down. In-flight unacknowledged deliveries are
    /// redelivered by the broker per its at-least-once semantics.
    pub async fn shutdown(self) {
        self.stop();
        self.join.abort();
        let _ = self.join.await;
    }
}
