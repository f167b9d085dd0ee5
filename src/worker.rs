//! # Worker Loop
//!
//! Consumes the request queue, runs the domain handler, and publishes the
//! outcome to whatever reply queue the message names. Domain failures are
//! replies, not transport errors: they travel as error-tagged payloads and
//! the work message is still acknowledged.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::broker::{BrokerSession, Disposition, MessageHandler, SubscriptionHandle};
use crate::messaging::{QueuedMessage, ReplyMessage, WorkMessage};

/// Domain processing hook a worker runs per request.
///
/// Returning `Err` produces an error-tagged reply; it never nacks the work
/// message.
#[async_trait]
pub trait WorkHandler: Send + Sync + 'static {
    async fn process(&self, payload: &str) -> anyhow::Result<String>;
}

pub struct WorkerLoop<H: WorkHandler> {
    session: Arc<BrokerSession>,
    handler: Arc<H>,
    request_queue: String,
}

impl<H: WorkHandler> WorkerLoop<H> {
    pub fn new(session: Arc<BrokerSession>, handler: H, request_queue: String) -> Self {
        Self {
            session,
            handler: Arc::new(handler),
            request_queue,
        }
    }

    /// Subscribe to the request queue and start processing
    pub fn start(self) -> SubscriptionHandle {
        info!(queue_name = %self.request_queue, "Worker loop starting");
        let queue = self.request_queue.clone();
        let session = Arc::clone(&self.session);
        self.session.subscribe(
            queue,
            WorkDelivery {
                session,
                handler: Arc::clone(&self.handler),
            },
        )
    }
}

struct WorkDelivery<H: WorkHandler> {
    session: Arc<BrokerSession>,
    handler: Arc<H>,
}

#[async_trait]
impl<H: WorkHandler> MessageHandler<WorkMessage> for WorkDelivery<H> {
    async fn handle(&self, delivery: QueuedMessage<WorkMessage>) -> Disposition {
        let work = delivery.message;
        let correlation_id = work.metadata.correlation_id;
        let reply_to = work.metadata.reply_to;

        let reply = match self.handler.process(&work.payload).await {
            Ok(result) => {
                debug!(correlation_id = %correlation_id, "Work completed");
                ReplyMessage::success(result, &correlation_id)
            }
            Err(cause) => {
                // Full anyhow chain so the requester sees the root cause
                warn!(correlation_id = %correlation_id, error = %cause, "Work failed");
                ReplyMessage::failure(&format!("{cause:#}"), &correlation_id)
            }
        };

        match self.session.publish(&reply_to, &reply).await {
            Ok(_) => Disposition::Ack,
            Err(e) => {
                // Reply lost in transit: leave the work message for redelivery
                // so the outcome isn't silently dropped.
                warn!(
                    correlation_id = %correlation_id,
                    reply_to = %reply_to,
                    error = %e,
                    "Failed to publish reply, requeueing work message"
                );
                Disposition::Requeue
            }
        }
    }
}
