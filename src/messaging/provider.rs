//! Enum dispatch over the available transport backends.
//!
//! `MessagingService` has generic methods and therefore cannot live behind
//! `dyn`; this enum gives the broker session a single concrete handle.

use std::time::Duration;

use async_trait::async_trait;

use super::errors::MessagingError;
use super::providers::{InMemoryMessagingService, PgmqMessagingService};
use super::traits::{MessagingService, QueueMessage};
use super::types::{MessageId, QueuedMessage, ReceiptHandle};

/// The configured messaging backend
#[derive(Debug, Clone)]
pub enum MessagingProvider {
    Pgmq(PgmqMessagingService),
    InMemory(InMemoryMessagingService),
}

#[async_trait]
impl MessagingService for MessagingProvider {
    async fn ensure_queue(&self, queue_name: &str) -> Result<(), MessagingError> {
        match self {
            Self::Pgmq(service) => service.ensure_queue(queue_name).await,
            Self::InMemory(service) => service.ensure_queue(queue_name).await,
        }
    }

    async fn send_message<T: QueueMessage>(
        &self,
        queue_name: &str,
        message: &T,
    ) -> Result<MessageId, MessagingError> {
        match self {
            Self::Pgmq(service) => service.send_message(queue_name, message).await,
            Self::InMemory(service) => service.send_message(queue_name, message).await,
        }
    }

    async fn receive_raw_messages(
        &self,
        queue_name: &str,
        max_messages: usize,
        visibility_timeout: Duration,
    ) -> Result<Vec<QueuedMessage<Vec<u8>>>, MessagingError> {
        match self {
            Self::Pgmq(service) => {
                service
                    .receive_raw_messages(queue_name, max_messages, visibility_timeout)
                    .await
            }
            Self::InMemory(service) => {
                service
                    .receive_raw_messages(queue_name, max_messages, visibility_timeout)
                    .await
            }
        }
    }

    async fn ack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
    ) -> Result<(), MessagingError> {
        match self {
            Self::Pgmq(service) => service.ack_message(queue_name, receipt_handle).await,
            Self::InMemory(service) => service.ack_message(queue_name, receipt_handle).await,
        }
    }

    async fn nack_message(
        &self,
        queue_name: &str,
        receipt_handle: &ReceiptHandle,
        requeue: bool,
    ) -> Result<(), MessagingError> {
        match self {
            Self::Pgmq(service) => {
                service
                    .nack_message(queue_name, receipt_handle, requeue)
                    .await
            }
            Self::InMemory(service) => {
                service
                    .nack_message(queue_name, receipt_handle, requeue)
                    .await
            }
        }
    }

    async fn health_check(&self) -> Result<bool, MessagingError> {
        match self {
            Self::Pgmq(service) => service.health_check().await,
            Self::InMemory(service) => service.health_check().await,
        }
    }

    fn provider_name(&self) -> &'static str {
        match self {
            Self::Pgmq(service) => service.provider_name(),
            Self::InMemory(service) => service.provider_name(),
        }
    }
}
