//! Shared type definitions for the tapefeed event pipeline.
//!
//! This crate is the single source of truth for the types that cross crate
//! boundaries: record field values, store mutation events, and the outbound
//! envelope delivered to dashboard clients.
//!
//! # Modules
//!
//! - [`record`] -- Flat field mappings and the records that hold them
//! - [`event`] -- Store mutation events and the outbound envelope
//! - [`category`] -- Well-known category (topic) names

pub mod category;
pub mod event;
pub mod record;

// Re-export all public types at crate root for convenience.
pub use event::{Envelope, EventAction, StoreEvent};
pub use record::{FieldMap, FieldValue, Record};
