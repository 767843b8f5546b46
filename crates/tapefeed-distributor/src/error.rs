//! Error types for the distribution layer.

use tapefeed_store::StoreError;

/// Errors that can occur while distributing events.
#[derive(Debug, thiserror::Error)]
pub enum DistributorError {
    /// A keyed store or bus operation failed.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// An event payload could not be decoded or an envelope could not be
    /// encoded.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),
}
