//! Provider-agnostic messaging trait definitions

use std::time::Duration;

use async_trait::async_trait;

use super::errors::MessagingError;
use super::types::{MessageId, QueuedMessage, ReceiptHandle};

/// Core messaging contract implemented by each transport backend.
///
/// Any queue system that supports idempotent queue creation, send/receive
/// with a visibility timeout, and ack/nack can implement this. The generic
/// send/receive methods make the trait non-object-safe; callers dispatch
/// through the [`super::MessagingProvider`] enum instead of a trait object.
#[async_trait]
pub trait MessagingService: Send + Sync + 'static {
    /// Create a queue if it doesn't exist (idempotent)
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError>;

    /// Send a message, returning the provider-assigned id
    async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError>;

    /// Receive up to `max_messages` as raw payload bytes, making them
    /// invisible to other consumers for `visibility_timeout`. Unacknowledged
    /// messages become visible again and are redelivered (at-least-once).
    ///
    /// Decoding is the caller's concern: a payload that violates the
    /// expected envelope must still be receivable so it can be nacked
    /// instead of jamming the queue.
    async fn receive_raw_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage<Vec<u8>>>, MessagingError>;

    /// Typed receive for callers that trust the queue contents. A payload
    /// that fails to decode errors the whole call, so subscription loops
    /// that must survive poison messages decode per message from
    /// [`Self::receive_raw_messages`] instead.
    async fn receive_messages<T: QueueMessage>(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage<T>>, MessagingError> {
        let raw = self
            .receive_raw_messages(queue_name, max_messages, visibility_timeout)
            .await?;

        raw.into_iter()
            .map(|delivery| {
                let message = T::from_bytes(&delivery.message)?;
                Ok(QueuedMessage::new(
                    delivery.receipt_handle,
                    message,
                    delivery.receive_count,
                    delivery.enqueued_at,
                ))
            })
            .collect()
    }

    /// Acknowledge successful processing (delete the message)
    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError>;

    /// Negative acknowledge. With `requeue` the message becomes eligible for
    /// redelivery; without it the message is moved out of the queue for good
    /// (PGMQ archives it, the in-memory provider drops it).
    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError>;

    /// Verify the backend is reachable
    async fn health_check(&self) -> Result<bool, MessagingError>;

    /// Provider name for logging
    fn provider_name(&self) -> &'static str;
}

/// Message serialization contract.
///
/// Blanket-implemented as JSON for any serde-compatible type, so envelope
/// structs only need `Serialize`/`Deserialize` derives.
pub trait QueueMessage: Send + Sync + Clone + 'static {
    fn to_bytes(&self) -> Result<Vec<u8>, MessagingError>;

    fn from_bytes(bytes: &[u8]) -> Result<Self, MessagingError>
    where
        Self: Sized;
}

impl<T> QueueMessage for T
where
    T: serde::Serialize + serde::de::DeserializeOwned + Send + Sync + Clone + 'static,
{
    fn to_bytes(&self) -> Result<Vec<u8>, MessagingError> {
        serde_json::to_vec(self).map_err(|e| MessagingError::message_serialization(e.to_string()))
    }

    fn from_bytes(bytes: &[u8]) -> Result<Self, MessagingError> {
        serde_json::from_slice(bytes)
            .map_err(|e| MessagingError::message_deserialization(e.to_string()))
    }
}
