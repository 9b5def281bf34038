//! Conversions between domain types and stored documents.

use chrono::{DateTime, Utc};
use document_store::{Document, ID_FIELD};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::{DomainError, Result};

/// Decodes a stored document, reporting which document was malformed.
pub fn decode<T: DeserializeOwned>(collection: &'static str, document: &Document) -> Result<T> {
    serde_json::from_value(document.clone()).map_err(|e| DomainError::MalformedDocument {
        collection,
        id: document
            .get(ID_FIELD)
            .map(|id| id.as_str().map_or_else(|| id.to_string(), str::to_string))
            .unwrap_or_else(|| "<missing _id>".to_string()),
        reason: e.to_string(),
    })
}

/// Encodes a domain value as a document.
pub fn encode<T: Serialize>(value: &T) -> Result<Document> {
    Ok(serde_json::to_value(value)?)
}

/// Timestamps are stored as epoch milliseconds so range predicates compare
/// them numerically.
pub fn timestamp(at: DateTime<Utc>) -> i64 {
    at.timestamp_millis()
}
