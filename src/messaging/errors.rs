//! Transport-level error types for the messaging layer

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MessagingError {
    #[error("broker connection error: {message}")]
    Connection { message: String },

    #[error("queue operation failed: {queue_name}: {operation}: {message}")]
    QueueOperation {
        queue_name: String,
        operation: String,
        message: String,
    },

    #[error("queue not found: {queue_name}")]
    QueueNotFound { queue_name: String },

    #[error("message serialization error: {message}")]
    MessageSerialization { message: String },

    #[error("message deserialization error: {message}")]
    MessageDeserialization { message: String },

    #[error("no message for receipt handle: {receipt_handle}")]
    MessageNotFound { receipt_handle: String },

    #[error("invalid receipt handle: {handle}")]
    InvalidReceiptHandle { handle: String },
}

impl MessagingError {
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub fn queue_operation(
        queue_name: impl Into<String>,
        operation: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::QueueOperation {
            queue_name: queue_name.into(),
            operation: operation.into(),
            message: message.into(),
        }
    }

    pub fn queue_not_found(queue_name: impl Into<String>) -> Self {
        Self::QueueNotFound {
            queue_name: queue_name.into(),
        }
    }

    pub fn message_serialization(message: impl Into<String>) -> Self {
        Self::MessageSerialization {
            message: message.into(),
        }
    }

    pub fn message_deserialization(message: impl Into<String>) -> Self {
        Self::MessageDeserialization {
            message: message.into(),
        }
    }

    pub fn message_not_found(receipt_handle: impl Into<String>) -> Self {
        Self::MessageNotFound {
            receipt_handle: receipt_handle.into(),
        }
    }

    pub fn invalid_receipt_handle(handle: impl Into<String>) -> Self {
        Self::InvalidReceiptHandle {
            handle: handle.into(),
        }
    }
}

pub type MessagingResult<T> = Result<T, MessagingError>;
