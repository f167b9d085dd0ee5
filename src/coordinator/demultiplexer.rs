//! Reply demultiplexing: the single consumer of the reply queue.
//!
//! Each reply is resolved to a status transition by correlation identifier.
//! Replies with no usable correlation identifier are dropped without
//! redelivery; a reply for an entry already in a terminal state is
//! acknowledged and otherwise ignored, which makes redelivered duplicates
//! harmless.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::broker::{Disposition, MessageHandler};
use crate::correlation::CorrelationId;
use crate::error::CourierError;
use crate::messaging::{QueuedMessage, ReplyMessage};
use crate::status_store::{RequestStatus, StatusStore, TransitionOutcome};

#[derive(Debug)]
pub struct ReplyDemultiplexer {
    store: Arc<StatusStore>,
}

impl ReplyDemultiplexer {
    pub fn new(store: Arc<StatusStore>) -> Self {
        Self { store }
    }

    fn correlation_id(reply: &ReplyMessage) -> Result<CorrelationId, CourierError> {
        let raw = reply
            .metadata
            .correlation_id
            .as_deref()
            .ok_or_else(|| CourierError::MalformedReply {
                reason: "missing correlation id".to_string(),
            })?;

        raw.parse().map_err(|_| CourierError::MalformedReply {
            reason: format!("unparseable correlation id: {raw}"),
        })
    }
}

#[async_trait]
impl MessageHandler<ReplyMessage> for ReplyDemultiplexer {
    async fn handle(&self, delivery: QueuedMessage<ReplyMessage>) -> Disposition {
        let reply = delivery.message;

        let correlation_id = match Self::correlation_id(&reply) {
            Ok(id) => id,
            Err(e) => {
                warn!(error = %e, "Dropping malformed reply");
                return Disposition::Drop;
            }
        };

        let (status, result) = if reply.is_error() {
            (RequestStatus::Failed, reply.payload)
        } else {
            (RequestStatus::Completed, reply.payload)
        };

        match self.store.transition(&correlation_id, status, result) {
            TransitionOutcome::Applied => {
                debug!(correlation_id = %correlation_id, status = %status, "Reply applied");
                Disposition::Ack
            }
            TransitionOutcome::AlreadyTerminal => {
                debug!(
                    correlation_id = %correlation_id,
                    "Duplicate reply for settled request ignored"
                );
                Disposition::Ack
            }
            TransitionOutcome::NotFound => {
                // Entry expired or never existed; nothing to update
                debug!(
                    correlation_id = %correlation_id,
                    "Dropping reply with no matching status entry"
                );
                Disposition::Drop
            }
        }
    }
}
