//! # Wire-Level Message Envelopes
//!
//! JSON envelopes carried on the request and reply queues. PGMQ has no
//! out-of-band message properties, so the correlation id and reply
//! destination ride inside a metadata block alongside the payload.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationId;

/// Fixed prefix marking a reply payload as a worker-reported failure.
///
/// Worker failures travel as ordinary reply data, not transport errors;
/// this convention is the only failure channel the coordinator has.
pub const ERROR_REPLY_PREFIX: &str = "Error: ";

/// Work item sent to the request queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkMessage {
    /// Raw work payload, opaque to the coordinator
    pub payload: String,
    pub metadata: WorkMessageMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkMessageMetadata {
    /// Opaque token joining this work item to its eventual reply
    pub correlation_id: String,
    /// Queue the worker must publish its reply to
    pub reply_to: String,
    pub enqueued_at: DateTime<Utc>,
}

impl WorkMessage {
    pub fn new(payload: String, correlation_id: CorrelationId, reply_to: &str) -> Self {
        Self {
            payload,
            metadata: WorkMessageMetadata {
                correlation_id: correlation_id.to_string(),
                reply_to: reply_to.to_string(),
                enqueued_at: Utc::now(),
            },
        }
    }
}

/// Result sent back on the reply queue.
///
/// `correlation_id` is optional at the wire level so a missing field shows
/// up as a malformed reply rather than a deserialization failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyMessage {
    /// Success result, or an error-tagged string (`"Error: ..."`)
    pub payload: String,
    pub metadata: ReplyMessageMetadata,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyMessageMetadata {
    pub correlation_id: Option<String>,
    pub enqueued_at: DateTime<Utc>,
}

impl ReplyMessage {
    /// Reply carrying a normal result
    pub fn success(payload: String, correlation_id: &str) -> Self {
        Self {
            payload,
            metadata: ReplyMessageMetadata {
                correlation_id: Some(correlation_id.to_string()),
                enqueued_at: Utc::now(),
            },
        }
    }

    /// Reply carrying a worker-reported failure
    pub fn failure(cause: &str, correlation_id: &str) -> Self {
        Self {
            payload: format!("{ERROR_REPLY_PREFIX}{cause}"),
            metadata: ReplyMessageMetadata {
                correlation_id: Some(correlation_id.to_string()),
                enqueued_at: Utc::now(),
            },
        }
    }

    /// Whether the payload is error-tagged by convention
    pub fn is_error(&self) -> bool {
        self.payload.starts_with(ERROR_REPLY_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_work_message_carries_correlation_metadata() {
        let id = CorrelationId::mint();
        let msg = WorkMessage::new("hello".to_string(), id, "reply_queue");

        assert_eq!(msg.payload, "hello");
        assert_eq!(msg.metadata.correlation_id, id.to_string());
        assert_eq!(msg.metadata.reply_to, "reply_queue");
    }

    #[test]
    fn test_work_message_serde_roundtrip() {
        let msg = WorkMessage::new("data".to_string(), CorrelationId::mint(), "replies");
        let json = serde_json::to_string(&msg).expect("serialize");
        let back: WorkMessage = serde_json::from_str(&json).expect("deserialize");

        assert_eq!(back.payload, msg.payload);
        assert_eq!(back.metadata.correlation_id, msg.metadata.correlation_id);
        assert_eq!(back.metadata.reply_to, msg.metadata.reply_to);
    }

    #[test]
    fn test_error_tag_convention() {
        let id = CorrelationId::mint().to_string();

        let ok = ReplyMessage::success("HELLO".to_string(), &id);
        assert!(!ok.is_error());

        let err = ReplyMessage::failure("not found", &id);
        assert!(err.is_error());
        assert_eq!(err.payload, "Error: not found");
    }

    #[test]
    fn test_reply_without_correlation_id_deserializes() {
        // Malformed on purpose: the demultiplexer must see this as a reply
        // with missing metadata, not a parse failure
        let json = r#"{"payload":"orphan","metadata":{"correlation_id":null,"enqueued_at":"2026-01-01T00:00:00Z"}}"#;
        let reply: ReplyMessage = serde_json::from_str(json).expect("deserialize");
        assert!(reply.metadata.correlation_id.is_none());
    }
}
