//! Publish/subscribe event transport.
//!
//! Topics are plain strings (category names), payloads are opaque bytes.
//! Delivery is at-most-once and fire-and-forget: a subscriber that is not
//! live when a message is published will never see it (no backlog, no
//! replay), and ordering is only guaranteed within a single topic for a
//! single publisher.
//!
//! The production transport is [`RedisBus`](crate::redis::RedisBus), which
//! rides the same Redis connection family as record storage. [`MemoryBus`]
//! is the in-process fake used by tests; it is built on
//! [`tokio::sync::broadcast`], whose semantics match the contract (messages
//! published with no live receiver are dropped, lagged receivers skip
//! ahead).

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::StoreError;

/// Capacity of the in-memory broadcast channel.
///
/// A subscriber that falls more than this many messages behind skips
/// ahead to the oldest retained message.
const MEMORY_BUS_CAPACITY: usize = 256;

/// A message received from the bus.
#[derive(Debug, Clone)]
pub struct BusMessage {
    /// The topic the message was published on.
    pub topic: String,
    /// The opaque payload bytes.
    pub payload: Vec<u8>,
}

/// Publish/subscribe transport over string topics and byte payloads.
#[async_trait]
pub trait EventBus: Send + Sync {
    /// Publish `payload` on `topic`. Fire-and-forget: succeeds even when
    /// nobody is subscribed.
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StoreError>;

    /// Subscribe to a set of topics, returning a handle that only observes
    /// messages published after this call returns.
    async fn subscribe(&self, topics: &[&str]) -> Result<Box<dyn Subscription>, StoreError>;
}

/// A live subscription to one or more topics.
#[async_trait]
pub trait Subscription: Send {
    /// Non-blocking poll: the next pending message, or `None` when nothing
    /// is waiting. The empty case is not an error.
    fn poll(&mut self) -> Option<BusMessage>;

    /// Tear the subscription down. Polling afterwards always yields `None`.
    async fn unsubscribe(&mut self) -> Result<(), StoreError>;
}

/// In-process [`EventBus`] over a single [`tokio::sync::broadcast`] channel.
///
/// Cloning shares the underlying channel, so a cloned bus handed to the
/// keyed store publishes to subscribers created from the original.
#[derive(Debug, Clone)]
pub struct MemoryBus {
    tx: broadcast::Sender<BusMessage>,
}

impl MemoryBus {
    /// Create a bus with no subscribers.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(MEMORY_BUS_CAPACITY);
        Self { tx }
    }
}

impl Default for MemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventBus for MemoryBus {
    async fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), StoreError> {
        // send fails only when there are zero receivers, which is the
        // normal no-subscriber case for a fire-and-forget bus.
        let _ = self.tx.send(BusMessage {
            topic: topic.to_owned(),
            payload: payload.to_vec(),
        });
        Ok(())
    }

    async fn subscribe(&self, topics: &[&str]) -> Result<Box<dyn Subscription>, StoreError> {
        debug!(?topics, "memory bus subscription created");
        Ok(Box::new(MemorySubscription {
            rx: Some(self.tx.subscribe()),
            topics: topics.iter().map(|t| (*t).to_owned()).collect(),
        }))
    }
}

/// Subscription handle over the in-process bus.
struct MemorySubscription {
    rx: Option<broadcast::Receiver<BusMessage>>,
    topics: Vec<String>,
}

#[async_trait]
impl Subscription for MemorySubscription {
    fn poll(&mut self) -> Option<BusMessage> {
        let rx = self.rx.as_mut()?;
        loop {
            match rx.try_recv() {
                Ok(message) if self.topics.iter().any(|t| *t == message.topic) => {
                    return Some(message);
                }
                // A message for a topic this subscription does not watch.
                Ok(_) => {}
                Err(broadcast::error::TryRecvError::Lagged(skipped)) => {
                    debug!(skipped, "memory bus subscriber lagged, skipping ahead");
                }
                Err(
                    broadcast::error::TryRecvError::Empty
                    | broadcast::error::TryRecvError::Closed,
                ) => return None,
            }
        }
    }

    async fn unsubscribe(&mut self) -> Result<(), StoreError> {
        self.rx = None;
        Ok(())
    }
}
