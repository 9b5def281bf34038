use thiserror::Error;

/// Errors that can occur when interacting with the document store.
#[derive(Debug, Error)]
pub enum DocumentStoreError {
    /// A document with the same `_id` already exists in the collection.
    #[error("Duplicate key in collection '{collection}': {id}")]
    DuplicateKey { collection: String, id: String },

    /// An update could not be applied to the matched document.
    ///
    /// The document is left untouched when this is returned.
    #[error("Invalid update on path '{path}': {reason}")]
    InvalidUpdate { path: String, reason: String },

    /// A positional (`$`) path had no array element matched by the filter.
    #[error("Positional operator on '{path}' did not match any array element")]
    PositionalMismatch { path: String },

    /// A document is not a JSON object.
    #[error("Document is not an object: {0}")]
    NotAnObject(String),

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for document store operations.
pub type Result<T> = std::result::Result<T, DocumentStoreError>;
