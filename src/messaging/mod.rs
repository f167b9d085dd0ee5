//! # Messaging
//!
//! Provider-agnostic queue transport and the wire-level message envelopes.
//! The production backend is PGMQ (PostgreSQL message queues); an in-memory
//! backend with the same visibility/ack semantics serves tests and local
//! development.

pub mod errors;
pub mod message;
pub mod provider;
pub mod providers;
pub mod traits;
pub mod types;

pub use errors::{MessagingError, MessagingResult};
pub use message::{ReplyMessage, ReplyMessageMetadata, WorkMessage, WorkMessageMetadata, ERROR_REPLY_PREFIX};
pub use provider::MessagingProvider;
pub use providers::{InMemoryMessagingService, PgmqMessagingService};
pub use traits::{MessagingService, QueueMessage};
pub use types::{MessageId, QueuedMessage, ReceiptHandle};
