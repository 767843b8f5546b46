//! Event distribution for the tapefeed dashboard backend.
//!
//! Bridges store-side mutation events to the set of live client
//! connections: a single listening task subscribes to the category topics,
//! recomputes derived aggregates where required, and fans normalized
//! envelopes out to every connected client.
//!
//! ```text
//! Keyed store mutation
//!     |
//!     +-- event on bus topic --> DistributionService
//!                                    |-- positions: recompute stats
//!                                    |-- signals:   pass through
//!                                    +-- envelope --> ClientRegistry --> clients
//! ```
//!
//! # Modules
//!
//! - [`service`] -- The listening loop and its lifecycle handle
//! - [`registry`] -- The connection fan-out registry
//! - [`stats`] -- Derived aggregate recomputation
//! - [`error`] -- Shared error types

pub mod error;
pub mod registry;
pub mod service;
pub mod stats;

// Re-export primary types for convenience.
pub use error::DistributorError;
pub use registry::{ClientRegistry, ConnectionId};
pub use service::{DistributionService, DistributorConfig, DistributorHandle, TOPICS};
pub use stats::recompute_position_stats;
