//! Request dispatch: correlation minting, status registration, and publish
//! with rollback on failure.

use std::sync::Arc;

use tracing::{debug, warn};

use crate::broker::BrokerSession;
use crate::correlation::CorrelationId;
use crate::error::{CourierError, Result};
use crate::messaging::WorkMessage;
use crate::status_store::{RequestEntry, StatusStore};

/// Accepts request payloads and forwards them onto the request queue.
///
/// The status entry is registered before the publish so a reply can never
/// arrive for an unknown correlation identifier. A failed publish rolls the
/// entry back out so the caller sees a clean failure instead of an entry
/// stuck in Processing forever.
#[derive(Debug)]
pub struct RequestDispatcher {
    session: Arc<BrokerSession>,
    store: Arc<StatusStore>,
    request_queue: String,
    /// Stamped into every work message so workers know where to reply
    reply_queue: String,
}

impl RequestDispatcher {
    pub fn new(
        session: Arc<BrokerSession>,
        store: Arc<StatusStore>,
        request_queue: String,
        reply_queue: String,
    ) -> Self {
        Self {
            session,
            store,
            request_queue,
            reply_queue,
        }
    }

    /// Submit a payload for asynchronous processing.
    ///
    /// Returns immediately with the correlation identifier the caller polls
    /// for status; never waits for the work to complete.
    pub async fn submit(&self, payload: String) -> Result<CorrelationId> {
        let correlation_id = CorrelationId::mint();
        self.store.insert(correlation_id, RequestEntry::processing())?;

        let message = WorkMessage::new(payload, correlation_id, &self.reply_queue);

        match self.session.publish(&self.request_queue, &message).await {
            Ok(message_id) => {
                debug!(
                    correlation_id = %correlation_id,
                    message_id = %message_id,
                    queue_name = %self.request_queue,
                    "Request dispatched"
                );
                Ok(correlation_id)
            }
            Err(e) => {
                // Roll back so the failed submission leaves no trace
                self.store.remove(&correlation_id);
                warn!(
                    correlation_id = %correlation_id,
                    error = %e,
                    "Dispatch failed, status entry rolled back"
                );
                Err(CourierError::DispatchFailed {
                    message: e.to_string(),
                })
            }
        }
    }
}
