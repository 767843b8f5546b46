//! Connection fan-out registry.
//!
//! Tracks the set of live client connections -- each represented by the
//! sending half of its outbound message queue -- and broadcasts serialized
//! envelopes to all of them. Delivery to each connection is independent: a
//! connection whose send fails is swept out of the registry by the same
//! broadcast that detected the failure, and never blocks the others.
//!
//! Membership is mutated by connection-lifecycle events (register on
//! establishment, unregister on disconnect) and read by broadcast; the
//! `RwLock` serializes mutation against iteration so a broadcast never
//! observes a partially-updated set.

use std::collections::HashMap;

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

/// Opaque identity of a registered connection.
pub type ConnectionId = Uuid;

/// Registry of live client connections.
#[derive(Debug, Default)]
pub struct ClientRegistry {
    connections: RwLock<HashMap<ConnectionId, mpsc::Sender<String>>>,
}

impl ClientRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection's outbound sender. Called exactly once per
    /// connection, on establishment. Returns the connection's identity.
    pub async fn register(&self, sender: mpsc::Sender<String>) -> ConnectionId {
        let id = Uuid::new_v4();
        self.connections.write().await.insert(id, sender);
        debug!(connection_id = %id, "client connection registered");
        id
    }

    /// Remove a connection. Called exactly once per connection, on
    /// disconnect detection. Removing an already-swept connection is a
    /// no-op.
    pub async fn unregister(&self, id: ConnectionId) {
        if self.connections.write().await.remove(&id).is_some() {
            debug!(connection_id = %id, "client connection unregistered");
        }
    }

    /// Number of currently registered connections.
    pub async fn connection_count(&self) -> usize {
        self.connections.read().await.len()
    }

    /// Deliver `message` to every registered connection.
    ///
    /// Sends are independent and non-blocking; a closed or saturated
    /// connection counts as failed and is unregistered immediately after
    /// the delivery pass.
    pub async fn broadcast(&self, message: &str) {
        let mut failed: Vec<ConnectionId> = Vec::new();
        {
            let connections = self.connections.read().await;
            for (id, sender) in connections.iter() {
                if let Err(e) = sender.try_send(message.to_owned()) {
                    warn!(connection_id = %id, error = %e,
                        "dropping client connection after failed send");
                    failed.push(*id);
                }
            }
        }

        if !failed.is_empty() {
            let mut connections = self.connections.write().await;
            for id in failed {
                connections.remove(&id);
            }
        }
    }
}
