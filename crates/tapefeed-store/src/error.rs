//! Error types for the store layer.
//!
//! All errors are propagated via [`StoreError`], which wraps the underlying
//! [`fred`] and [`serde_json`] errors with additional context about which
//! operation failed.

/// Errors that can occur in the store layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A Redis operation failed.
    #[error("Redis error: {0}")]
    Redis(#[from] fred::error::Error),

    /// A serialization or deserialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A configuration error (bad URL, bad option).
    #[error("Configuration error: {0}")]
    Config(String),

    /// Every connection attempt against the backing store failed.
    ///
    /// This is fatal for the owning process: it must not proceed to serve
    /// traffic without its backing store.
    #[error("connection to {target} exhausted after {attempts} attempts")]
    ConnectionExhausted {
        /// The connection target that could not be reached.
        target: String,
        /// How many attempts were made before giving up.
        attempts: u32,
    },
}
