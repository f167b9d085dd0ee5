//! # In-Memory Messaging Service
//!
//! Thread-safe in-memory queues with visibility-timeout simulation, for
//! tests and local development. Cheaply cloneable so a test harness can keep
//! a handle to the same queues the coordinator and worker use, and carries a
//! send-failure injection switch for dispatch-rollback tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::messaging::errors::MessagingError;
use crate::messaging::traits::{MessagingService, QueueMessage};
use crate::messaging::types::{MessageId, QueuedMessage, ReceiptHandle};

#[derive(Debug, Clone)]
struct InMemoryQueuedMessage {
    id: u64,
    payload: Vec<u8>,
    enqueued_at: DateTime<Utc>,
    /// When the message becomes visible again (None = visible now)
    visible_at: Option<DateTime<Utc>>,
    receive_count: u32,
}

#[derive(Debug, Default)]
struct InMemoryQueue {
    messages: VecDeque<InMemoryQueuedMessage>,
    next_id: u64,
}

#[derive(Debug, Default)]
struct Inner {
    queues: RwLock<HashMap<String, InMemoryQueue>>,
    sent: AtomicU64,
    fail_sends: AtomicBool,
}

/// In-memory messaging backend
#[derive(Debug, Clone, Default)]
pub struct InMemoryMessagingService {
    inner: Arc<Inner>,
}

impl InMemoryMessagingService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent send fail, for dispatch-rollback tests
    pub fn set_fail_sends(&self, fail: bool) {
        self.inner.fail_sends.store(fail, Ordering::Relaxed);
    }

    /// Number of messages currently in a queue (visible or in-flight)
    pub async fn queue_length(&self, queue_name: &str) -> usize {
        let queues = self.inner.queues.read().await;
        queues.get(queue_name).map_or(0, |q| q.messages.len())
    }

    /// Total messages accepted across all queues
    pub fn total_sent(&self) -> u64 {
        self.inner.sent.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl MessagingService for InMemoryMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        let mut queues = self.inner.queues.write().await;
        queues.entry(queue_name.to_string()).or_default();
        Ok(())
    }

    async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError> {
        if self.inner.fail_sends.load(Ordering::Relaxed) {
            return Err(MessagingError::queue_operation(
                queue_name,
                "send",
                "injected send failure",
            ));
        }

        let payload = message.to_bytes()?;

        let mut queues = self.inner.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        queue.next_id += 1;
        let id = queue.next_id;
        queue.messages.push_back(InMemoryQueuedMessage {
            id,
            payload,
            enqueued_at: Utc::now(),
            visible_at: None,
            receive_count: 0,
        });
        self.inner.sent.fetch_add(1, Ordering::Relaxed);

        Ok(MessageId::from(id))
    }

    async fn receive_raw_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage<Vec<u8>>>, MessagingError> {
        let mut queues = self.inner.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        let now = Utc::now();
        let invisible_until = now
            + chrono::Duration::from_std(visibility_timeout)
                .unwrap_or_else(|_| chrono::Duration::max_value());
        let mut received = Vec::new();

        for msg in queue.messages.iter_mut() {
            if received.len() >= max_messages {
                break;
            }

            let is_visible = msg.visible_at.map(|vt| vt <= now).unwrap_or(true);
            if is_visible {
                msg.visible_at = Some(invisible_until);
                msg.receive_count += 1;

                received.push(QueuedMessage::new(
                    ReceiptHandle::from(msg.id),
                    msg.payload.clone(),
                    msg.receive_count,
                    msg.enqueued_at,
                ));
            }
        }

        Ok(received)
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let message_id: u64 = receipt_handle
            .as_str()
            .parse()
            .map_err(|_| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        let mut queues = self.inner.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        match queue.messages.iter().position(|m| m.id == message_id) {
            Some(pos) => {
                queue.messages.remove(pos);
                Ok(())
            }
            None => Err(MessagingError::message_not_found(message_id.to_string())),
        }
    }

    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError> {
        let message_id: u64 = receipt_handle
            .as_str()
            .parse()
            .map_err(|_| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        let mut queues = self.inner.queues.write().await;
        let queue = queues
            .get_mut(queue_name)
            .ok_or_else(|| MessagingError::queue_not_found(queue_name))?;

        if requeue {
            match queue.messages.iter_mut().find(|m| m.id == message_id) {
                Some(msg) => {
                    msg.visible_at = None;
                    Ok(())
                }
                None => Err(MessagingError::message_not_found(message_id.to_string())),
            }
        } else {
            match queue.messages.iter().position(|m| m.id == message_id) {
                Some(pos) => {
                    queue.messages.remove(pos);
                    Ok(())
                }
                None => Err(MessagingError::message_not_found(message_id.to_string())),
            }
        }
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        Ok(true)
    }

    fn provider_name(&self) -> &'static str {
        "in_memory"
    }
}
