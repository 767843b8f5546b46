//! The distribution service: bus events in, client broadcasts out.
//!
//! A single long-lived cooperative task subscribes to the fixed topic set,
//! polls the subscription, applies category-specific handling, and forwards
//! normalized envelopes to the [`ClientRegistry`]. The loop never
//! busy-spins: an empty poll suspends for the configured interval, and a
//! shutdown request is observed within one poll-sleep cycle.
//!
//! A failure while processing one message is logged and followed by a short
//! pause; it never terminates the service.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use tapefeed_store::{BusMessage, EventBus, KeyedEventStore, Subscription};
use tapefeed_types::{Envelope, StoreEvent, category};

use crate::error::DistributorError;
use crate::registry::ClientRegistry;
use crate::stats::recompute_position_stats;

/// The fixed set of topics the service listens on.
pub const TOPICS: [&str; 4] = [
    category::ORDERS,
    category::POSITIONS,
    category::TRADES,
    category::SIGNALS,
];

/// Timing knobs for the distribution loop.
#[derive(Debug, Clone)]
pub struct DistributorConfig {
    /// How long an empty poll suspends before polling again.
    pub poll_interval: Duration,
    /// How long the loop pauses after a processing error.
    pub error_pause: Duration,
}

impl Default for DistributorConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(100),
            error_pause: Duration::from_secs(1),
        }
    }
}

/// A bus event classified by its category, so handling below is an
/// exhaustive match instead of ad hoc field access.
#[derive(Debug)]
enum TopicEvent {
    /// A `positions` mutation: triggers aggregate recomputation.
    Positions(StoreEvent),
    /// A `signals` event: passed through to clients.
    Signals(StoreEvent),
    /// Any other category: observed, not distributed.
    Other(StoreEvent),
}

impl TopicEvent {
    fn classify(event: StoreEvent) -> Self {
        match event.category.as_str() {
            category::POSITIONS => Self::Positions(event),
            category::SIGNALS => Self::Signals(event),
            _ => Self::Other(event),
        }
    }
}

/// Bridges store mutation events to the connection fan-out registry.
///
/// The service is `Stopped` until [`Self::spawn`] succeeds, `Listening`
/// until the returned handle is stopped, and `Stopped` again after.
/// Restarting requires a fresh instance.
pub struct DistributionService {
    store: KeyedEventStore,
    bus: Arc<dyn EventBus>,
    registry: Arc<ClientRegistry>,
    config: DistributorConfig,
}

impl DistributionService {
    /// Assemble a service over the given store, bus, and registry.
    pub fn new(
        store: KeyedEventStore,
        bus: Arc<dyn EventBus>,
        registry: Arc<ClientRegistry>,
        config: DistributorConfig,
    ) -> Self {
        Self {
            store,
            bus,
            registry,
            config,
        }
    }

    /// Subscribe to the fixed topic set and start the listening task.
    ///
    /// # Errors
    ///
    /// Returns [`DistributorError::Store`] if the subscription cannot be
    /// established; in that case no task is started.
    pub async fn spawn(self) -> Result<DistributorHandle, DistributorError> {
        let subscription = self.bus.subscribe(&TOPICS).await?;
        info!(topics = ?TOPICS, "distribution service listening");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(run_loop(
            self.store,
            self.registry,
            self.config,
            subscription,
            shutdown_rx,
        ));

        Ok(DistributorHandle {
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle to a listening distribution service.
pub struct DistributorHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl DistributorHandle {
    /// Stop the service and wait for the loop to exit.
    ///
    /// Infallible by design: once this returns, no further broadcast will
    /// be made by this service instance.
    pub async fn stop(self) {
        // The loop may already be gone; a dead receiver is fine.
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            error!(error = %e, "distribution task did not shut down cleanly");
        }
    }
}

/// The poll-sleep distribution loop.
async fn run_loop(
    store: KeyedEventStore,
    registry: Arc<ClientRegistry>,
    config: DistributorConfig,
    mut subscription: Box<dyn Subscription>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        if *shutdown.borrow() {
            break;
        }
        match subscription.poll() {
            Some(message) => {
                if let Err(e) = process_message(&store, &registry, &message).await {
                    error!(topic = message.topic, error = %e,
                        "failed to process event, pausing briefly");
                    pause(config.error_pause, &mut shutdown).await;
                }
            }
            None => pause(config.poll_interval, &mut shutdown).await,
        }
    }

    if let Err(e) = subscription.unsubscribe().await {
        warn!(error = %e, "failed to unsubscribe cleanly");
    }
    info!("distribution service stopped");
}

/// Suspend for `duration`, waking early on shutdown.
async fn pause(duration: Duration, shutdown: &mut watch::Receiver<bool>) {
    tokio::select! {
        () = tokio::time::sleep(duration) => {}
        _ = shutdown.changed() => {}
    }
}

/// Decode one bus message and apply its category-specific handling.
async fn process_message(
    store: &KeyedEventStore,
    registry: &ClientRegistry,
    message: &BusMessage,
) -> Result<(), DistributorError> {
    let event: StoreEvent = serde_json::from_slice(&message.payload)?;
    debug!(topic = message.topic, action = ?event.action, "event received");

    let envelope = match TopicEvent::classify(event) {
        TopicEvent::Positions(event) => {
            let stats = recompute_position_stats(store).await?;
            Envelope::new(category::POSITIONS, event.action, stats)
        }
        TopicEvent::Signals(event) => Envelope::with_category(
            category::SIGNALS,
            event.action,
            event.category,
            event.data,
        ),
        TopicEvent::Other(event) => {
            debug!(category = event.category, "no distribution handling for category");
            return Ok(());
        }
    };

    let json = serde_json::to_string(&envelope)?;
    registry.broadcast(&json).await;
    Ok(())
}
