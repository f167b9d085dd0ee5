//! # PGMQ Messaging Service
//!
//! PostgreSQL Message Queue backend via the pgmq-rs crate. PGMQ gives
//! at-least-once delivery through visibility timeouts: delete is the ack,
//! archive is the terminal nack (the message moves to the `a_{queue}` table
//! and is never redelivered).

use std::time::Duration;

use async_trait::async_trait;
use pgmq::PGMQueue;
use sqlx::PgPool;
use tracing::debug;

use crate::messaging::errors::MessagingError;
use crate::messaging::traits::{MessagingService, QueueMessage};
use crate::messaging::types::{MessageId, QueuedMessage, ReceiptHandle};

/// PGMQ-backed messaging service
#[derive(Debug, Clone)]
pub struct PgmqMessagingService {
    pgmq: PGMQueue,
}

impl PgmqMessagingService {
    /// Connect using a database URL
    pub async fn new(database_url: &str) -> Result<Self, MessagingError> {
        let pgmq = PGMQueue::new(database_url.to_string())
            .await
            .map_err(|e| MessagingError::connection(e.to_string()))?;
        Ok(Self { pgmq })
    }

    /// Build on an existing connection pool
    pub async fn new_with_pool(pool: PgPool) -> Self {
        let pgmq = PGMQueue::new_with_pool(pool).await;
        Self { pgmq }
    }

    /// Underlying connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pgmq.connection
    }
}

#[async_trait]
impl MessagingService for PgmqMessagingService {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        self.pgmq
            .create(queue_name)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "create", e.to_string()))
    }

    async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError> {
        let bytes = message.to_bytes()?;
        let value: serde_json::Value = serde_json::from_slice(&bytes)
            .map_err(|e| MessagingError::message_serialization(e.to_string()))?;

        let message_id = self
            .pgmq
            .send(queue_name, &value)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "send", e.to_string()))?;

        debug!(queue_name = %queue_name, message_id, "Message sent");
        Ok(MessageId::from(message_id))
    }

    async fn receive_raw_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage<Vec<u8>>>, MessagingError> {
        let vt = visibility_timeout.as_secs().min(i32::MAX as u64) as i32;

        let raw = self
            .pgmq
            .read_batch::<serde_json::Value>(queue_name, Some(vt), max_messages as i32)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "read", e.to_string()))?
            .unwrap_or_default();

        let mut received = Vec::with_capacity(raw.len());
        for msg in raw {
            // The queue stores arbitrary jsonb; envelope decoding happens at
            // the subscription so a bad payload can be nacked individually
            let bytes = serde_json::to_vec(&msg.message)
                .map_err(|e| MessagingError::message_serialization(e.to_string()))?;

            received.push(QueuedMessage::new(
                ReceiptHandle::from(msg.msg_id),
                bytes,
                msg.read_ct.max(0) as u32,
                msg.enqueued_at,
            ));
        }

        Ok(received)
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        let message_id = receipt_handle
            .as_i64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        self.pgmq
            .delete(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "delete", e.to_string()))?;
        Ok(())
    }

    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError> {
        if requeue {
            // Visibility timeout handles redelivery; nothing to do
            return Ok(());
        }

        let message_id = receipt_handle
            .as_i64()
            .ok_or_else(|| MessagingError::invalid_receipt_handle(receipt_handle.as_str()))?;

        self.pgmq
            .archive(queue_name, message_id)
            .await
            .map_err(|e| MessagingError::queue_operation(queue_name, "archive", e.to_string()))?;
        Ok(())
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        match sqlx::query("SELECT 1").execute(&self.pgmq.connection).await {
            Ok(_) => Ok(true),
            Err(_) => Ok(false),
        }
    }

    fn provider_name(&self) -> &'static str {
        "pgmq"
    }
}
