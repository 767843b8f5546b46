//! Dashboard API server for the tapefeed event pipeline.
//!
//! Exposes REST reads over the keyed event store and a WebSocket feed of
//! the envelopes the distribution service broadcasts. The server itself is
//! thin plumbing; all concurrency and failure handling lives in
//! `tapefeed-store` and `tapefeed-distributor`.
//!
//! # Modules
//!
//! - [`config`] -- YAML configuration with environment overrides
//! - [`state`] -- Shared application state
//! - [`router`] -- Route assembly (REST + WebSocket)
//! - [`handlers`] -- REST endpoint handlers
//! - [`ws`] -- The WebSocket feed handler
//! - [`error`] -- API error responses

pub mod config;
pub mod error;
pub mod handlers;
pub mod router;
pub mod state;
pub mod ws;

pub use config::{AppConfig, ConfigError};
pub use error::ServerError;
pub use router::build_router;
pub use state::AppState;
