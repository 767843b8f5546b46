//! Shared application state for the dashboard API server.

use std::sync::Arc;

use tapefeed_distributor::ClientRegistry;
use tapefeed_store::KeyedEventStore;

/// Shared state for the Axum application.
///
/// Wrapped in [`Arc`] and injected via Axum's `State` extractor. REST
/// handlers read through the keyed store; the WebSocket handler registers
/// connections with the fan-out registry the distribution service
/// broadcasts into.
#[derive(Clone)]
pub struct AppState {
    /// The keyed event store backing all REST reads.
    pub store: KeyedEventStore,
    /// The connection fan-out registry shared with the distributor.
    pub registry: Arc<ClientRegistry>,
}

impl AppState {
    /// Assemble the application state.
    pub const fn new(store: KeyedEventStore, registry: Arc<ClientRegistry>) -> Self {
        Self { store, registry }
    }
}
