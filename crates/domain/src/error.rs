//! Domain error types.

use thiserror::Error;

/// Errors that can occur while validating or decoding domain documents.
#[derive(Debug, Error)]
pub enum DomainError {
    /// A stored document does not have the expected shape.
    #[error("Malformed {collection} document {id}: {reason}")]
    MalformedDocument {
        collection: &'static str,
        id: String,
        reason: String,
    },

    /// Invalid quantity.
    #[error("Invalid quantity: {quantity} (must be greater than 0)")]
    InvalidQuantity { quantity: u32 },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Convenience type alias for domain results.
pub type Result<T> = std::result::Result<T, DomainError>;
