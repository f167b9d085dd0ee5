//! Core types for the provider-agnostic messaging abstraction

use chrono::{DateTime, Utc};

/// Provider-assigned identifier for a sent message.
///
/// Format is provider-specific: PGMQ uses the i64 message id as a string,
/// the in-memory provider a monotonic counter.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MessageId(pub String);

impl MessageId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for MessageId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// Handle for acknowledging or rejecting a received message
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReceiptHandle(pub String);

impl ReceiptHandle {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Parse as i64 (PGMQ message ids)
    pub fn as_i64(&self) -> Option<i64> {
        self.0.parse().ok()
    }
}

impl std::fmt::Display for ReceiptHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for ReceiptHandle {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<u64> for ReceiptHandle {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// A message received from a queue, with delivery metadata
#[derive(Debug, Clone)]
pub struct QueuedMessage<T> {
    /// Handle for acking/nacking this delivery
    pub receipt_handle: ReceiptHandle,

    /// The deserialized payload
    pub message: T,

    /// How many times this message has been delivered (at-least-once:
    /// increments on each redelivery after a visibility timeout)
    pub receive_count: u32,

    /// When the message was originally enqueued
    pub enqueued_at: DateTime<Utc>,
}

impl<T> QueuedMessage<T> {
    pub fn new(
        receipt_handle: ReceiptHandle,
        message: T,
        receive_count: u32,
        enqueued_at: DateTime<Utc>,
    ) -> Self {
        Self {
            receipt_handle,
            message,
            receive_count,
            enqueued_at,
        }
    }
}
