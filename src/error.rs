//! # Error Taxonomy
//!
//! Coordinator-level errors surfaced at the submit/status boundary.
//!
//! Transport faults are handled locally by the broker session's reconnect
//! loop and never bubble past this boundary except as `DispatchFailed` when a
//! publish is attempted during an outage. Worker-reported failures travel as
//! ordinary reply payloads (`"Error: "` prefix), not as error values.

use thiserror::Error;

use crate::config::ConfigurationError;
use crate::correlation::CorrelationId;
use crate::messaging::MessagingError;

#[derive(Debug, Error)]
pub enum CourierError {
    /// Publish to the request queue failed; the status entry was rolled back
    /// and the submitter holds no correlation id
    #[error("dispatch failed: {message}")]
    DispatchFailed { message: String },

    /// Two live entries would share a correlation id (unreachable under v4
    /// uniqueness, surfaced rather than silently overwritten)
    #[error("correlation id collision: {0}")]
    CorrelationCollision(CorrelationId),

    /// Reply message missing or carrying unparseable correlation metadata
    #[error("malformed reply: {reason}")]
    MalformedReply { reason: String },

    /// Broker session is not connected; publishes fail until the reconnect
    /// loop re-establishes the transport
    #[error("broker disconnected: {message}")]
    BrokerDisconnected { message: String },

    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Messaging(#[from] MessagingError),
}

pub type Result<T> = std::result::Result<T, CourierError>;
