//! Saga error types.

use document_store::DocumentStoreError;
use domain::DomainError;
use thiserror::Error;

use crate::outcome::CompensationOutcome;

/// Errors that can occur while running actions and sagas.
#[derive(Debug, Error)]
pub enum SagaError {
    /// A required request field is absent or blank.
    #[error("{action} requires {name}")]
    MissingParameter {
        action: &'static str,
        name: &'static str,
    },

    /// A referenced cart, line item, inventory record or reservation is missing.
    #[error("{kind} not found: {id}")]
    RecordNotFound { kind: &'static str, id: String },

    /// A conditional write matched nothing because its business rule no
    /// longer holds.
    #[error("Precondition failed in '{step}': {reason}")]
    PreconditionFailed { step: &'static str, reason: String },

    /// The rollback of an earlier step could not be applied.
    #[error("{outcome} failed: {reason}")]
    CompensationFailed {
        outcome: CompensationOutcome,
        reason: String,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Document store error.
    #[error("Document store error: {0}")]
    Store(#[from] DocumentStoreError),
}

impl SagaError {
    /// Returns true for the error kind that triggers compensation.
    pub fn is_precondition_failed(&self) -> bool {
        matches!(self, SagaError::PreconditionFailed { .. })
    }

    pub(crate) fn not_found(kind: &'static str, id: impl ToString) -> Self {
        SagaError::RecordNotFound {
            kind,
            id: id.to_string(),
        }
    }

    pub(crate) fn precondition(step: &'static str, reason: impl Into<String>) -> Self {
        SagaError::PreconditionFailed {
            step,
            reason: reason.into(),
        }
    }
}

/// Convenience type alias for saga results.
pub type Result<T> = std::result::Result<T, SagaError>;
