#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, PGMQ in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Courier Core
//!
//! Asynchronous request/reply coordination over PostgreSQL message queues.
//!
//! ## Overview
//!
//! Courier decouples request submission from request fulfillment through a
//! message broker. A requester submits a payload and immediately receives a
//! correlation identifier; workers consume the request queue, process the
//! payload, and publish the outcome to a reply queue. The coordinator
//! demultiplexes replies back onto an in-memory status table that callers
//! poll by correlation identifier.
//!
//! ## Module Organization
//!
//! - [`coordinator`] - Requester-side facade: dispatch, reply demultiplexing, expiry sweeping
//! - [`worker`] - Consumer loop turning work messages into replies
//! - [`broker`] - Broker session: connection lifecycle, publish, subscribe
//! - [`messaging`] - Provider-agnostic queue abstraction (PGMQ, in-memory)
//! - [`status_store`] - Concurrent correlation-id -> status table
//! - [`config`] - Configuration management
//! - [`error`] - Structured error handling
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier_core::config::CourierConfig;
//! use courier_core::coordinator::Coordinator;
//! use courier_core::messaging::{InMemoryMessagingService, MessagingProvider};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = CourierConfig::default();
//! let provider = MessagingProvider::InMemory(InMemoryMessagingService::new());
//!
//! let coordinator = Coordinator::start(&config, provider).await?;
//! let correlation_id = coordinator.submit("hello".to_string()).await?;
//!
//! // Poll until a worker's reply lands
//! if let Some(entry) = coordinator.status(&correlation_id) {
//!     println!("{}: {}", correlation_id, entry.status);
//! }
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod config;
pub mod coordinator;
pub mod correlation;
pub mod error;
pub mod logging;
pub mod messaging;
pub mod status_store;
pub mod worker;

pub use broker::{BrokerSession, ConnectionState, Disposition, MessageHandler, SubscriptionHandle};
pub use config::CourierConfig;
pub use coordinator::Coordinator;
pub use correlation::CorrelationId;
pub use error::{CourierError, Result};
pub use status_store::{RequestEntry, RequestStatus, StatusStore, TransitionOutcome};
pub use worker::{WorkHandler, WorkerLoop};
