//! Store layer for the tapefeed event pipeline.
//!
//! Redis holds the live dashboard state and carries the mutation event
//! stream. This crate provides the resilient connector, the keyed event
//! store (typed CRUD with event emission), and the pub/sub event bus, each
//! behind an injectable trait so tests run against in-memory fakes.
//!
//! # Architecture
//!
//! ```text
//! Command (route layer, feed handlers)
//!     |
//!     +-- mutate --> KeyedEventStore --> StoreBackend (Redis hash/set ops)
//!                        |
//!                        +-- emit ----> EventBus (pub/sub topic = category)
//! ```
//!
//! # Modules
//!
//! - [`redis`] -- Resilient connector and Redis-backed implementations
//! - [`backend`] -- The [`StoreBackend`] seam and its in-memory fake
//! - [`keyed`] -- The keyed event store
//! - [`bus`] -- The [`EventBus`]/[`Subscription`] seam and its in-memory fake
//! - [`error`] -- Shared error types

pub mod backend;
pub mod bus;
pub mod error;
pub mod keyed;
pub mod redis;

// Re-export primary types for convenience.
pub use backend::{MemoryBackend, StoreBackend};
pub use bus::{BusMessage, EventBus, MemoryBus, Subscription};
pub use error::StoreError;
pub use keyed::KeyedEventStore;
pub use redis::{ConnectOptions, RedisBackend, RedisBus, connect_with_retry};
