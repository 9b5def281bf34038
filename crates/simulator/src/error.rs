//! Simulator error types.

use common::ProductId;
use document_store::DocumentStoreError;
use domain::DomainError;
use saga::SagaError;
use stats::StatsError;
use thiserror::Error;

/// Errors that abort a simulation run.
#[derive(Debug, Error)]
pub enum SimulatorError {
    /// Saga error outside the expected precondition failures.
    #[error("Saga error: {0}")]
    Saga(#[from] SagaError),

    /// Document store error.
    #[error("Document store error: {0}")]
    Store(#[from] DocumentStoreError),

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    /// Statistics error.
    #[error("Statistics error: {0}")]
    Stats(#[from] StatsError),

    /// Database connection error.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A client task panicked or was cancelled.
    #[error("Client task failed: {0}")]
    Client(#[from] tokio::task::JoinError),

    /// Stock was created or destroyed by the run.
    #[error("Stock not conserved for {product_id}: seeded {seeded}, accounted {accounted}")]
    ConservationViolated {
        product_id: ProductId,
        seeded: u64,
        accounted: u64,
    },
}

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, SimulatorError>;
