//! # Request/Reply Coordinator
//!
//! The requester-side process: accepts submissions, tracks their status in
//! memory, consumes the reply queue, and evicts stale entries. One
//! [`Coordinator`] owns one broker session, one status store, one reply
//! subscription, and one sweeper.

pub mod demultiplexer;
pub mod dispatcher;
pub mod sweeper;

pub use demultiplexer::ReplyDemultiplexer;
pub use dispatcher::RequestDispatcher;
pub use sweeper::{ExpirySweeper, SweeperStats};

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::info;

use crate::broker::{BrokerSession, SubscriptionHandle};
use crate::config::CourierConfig;
use crate::correlation::CorrelationId;
use crate::error::Result;
use crate::messaging::MessagingProvider;
use crate::status_store::{RequestEntry, StatusStore};

pub struct Coordinator {
    session: Arc<BrokerSession>,
    store: Arc<StatusStore>,
    dispatcher: RequestDispatcher,
    sweeper: ExpirySweeper,
    sweeper_handle: JoinHandle<()>,
    reply_subscription: SubscriptionHandle,
}

impl Coordinator {
    /// Bring up a coordinator: connect the broker session (retrying until it
    /// succeeds), subscribe the reply demultiplexer, and start the sweeper.
    pub async fn start(config: &CourierConfig, provider: MessagingProvider) -> Result<Self> {
        let session = Arc::new(BrokerSession::new(provider, config));
        session.connect_with_retry().await;

        let store = Arc::new(StatusStore::new());

        let reply_subscription = session.subscribe(
            config.queues.reply_queue.clone(),
            ReplyDemultiplexer::new(Arc::clone(&store)),
        );

        let dispatcher = RequestDispatcher::new(
            Arc::clone(&session),
            Arc::clone(&store),
            config.queues.request_queue.clone(),
            config.queues.reply_queue.clone(),
        );

        let sweeper = ExpirySweeper::new(
            Arc::clone(&store),
            config.retention.ttl(),
            config.retention.sweep_interval(),
        );
        let sweeper_handle = sweeper.start();

        info!(
            request_queue = %config.queues.request_queue,
            reply_queue = %config.queues.reply_queue,
            "Coordinator started"
        );

        Ok(Self {
            session,
            store,
            dispatcher,
            sweeper,
            sweeper_handle,
            reply_subscription,
        })
    }

    /// Submit a payload; returns its correlation id immediately
    pub async fn submit(&self, payload: String) -> Result<CorrelationId> {
        self.dispatcher.submit(payload).await
    }

    /// Current status snapshot for a correlation id. `None` means the id is
    /// unknown here, whether never submitted or already evicted.
    pub fn status(&self, id: &CorrelationId) -> Option<RequestEntry> {
        self.store.get(id)
    }

    /// Number of live status entries
    pub fn entry_count(&self) -> usize {
        self.store.len()
    }

    pub fn session(&self) -> &Arc<BrokerSession> {
        &self.session
    }

    /// Stop the reply subscription and the sweeper, then wait for both loops
    /// to wind down. Status entries are not persisted anywhere; whatever is
    /// still in the store is lost with the process.
    pub async fn shutdown(self) {
        self.sweeper.stop();
        self.reply_subscription.shutdown().await;
        self.sweeper_handle.abort();
        let _ = self.sweeper_handle.await;
        info!(remaining_entries = self.store.len(), "Coordinator stopped");
    }
}
