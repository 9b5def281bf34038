//! Batch sweep returning the stock of abandoned carts.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::CartId;
use document_store::{Collection, Document, DocumentStore, Filter, ID_FIELD};
use domain::fields::{MODIFIED_ON, STATE};
use domain::{Cart, CartState, timestamp};

use super::EXPIRE_CARTS;
use crate::action::Action;
use crate::collections::Collections;
use crate::instrument::Instrumentation;
use crate::steps::{ExpireCart, ReleaseReservation, ReleaseReservationRequest};
use crate::{Result, SagaError};

#[derive(Debug, Clone, Copy)]
pub struct ExpireCartsRequest {
    /// Active carts last modified at or before this instant are expired.
    pub cutoff: DateTime<Utc>,
}

/// A cart the sweep could not expire.
#[derive(Debug)]
pub struct ExpireFailure {
    /// The stored `_id`, kept raw because the cart may not decode.
    pub cart_id: String,
    pub error: SagaError,
}

/// Outcome of one sweep.
#[derive(Debug, Default)]
pub struct ExpireReport {
    pub expired: Vec<CartId>,
    pub failures: Vec<ExpireFailure>,
}

impl ExpireReport {
    /// Returns true if every eligible cart was expired.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Expires stale active carts one at a time.
///
/// For each cart every line's reservation is released back to available
/// stock, then the cart is marked expired if it is still exactly as read.
/// A cart that fails is left active and recorded in the report; the sweep
/// carries on with the rest. Reservations already released for a cart that
/// changed meanwhile count as released when a later sweep retries it.
pub struct ExpireCarts<S> {
    carts: Collection<S>,
    release_reservation: ReleaseReservation<S>,
    expire_cart: ExpireCart<S>,
    instrumentation: Instrumentation,
}

impl<S: DocumentStore + Clone> ExpireCarts<S> {
    pub fn new(collections: &Collections<S>, instrumentation: Instrumentation) -> Self {
        Self {
            carts: collections.carts.clone(),
            release_reservation: ReleaseReservation::new(collections.inventories.clone()),
            expire_cart: ExpireCart::new(collections.carts.clone()),
            instrumentation,
        }
    }

    async fn expire(&self, doc: &Document) -> Result<CartId> {
        let cart = Cart::from_document(doc)?;

        for line in &cart.products {
            let release = ReleaseReservationRequest {
                cart_id: cart.id.clone(),
                product_id: line.product_id.clone(),
                quantity: line.quantity,
            };
            let released = self
                .instrumentation
                .run(&self.release_reservation, &release)
                .await?;
            if !released {
                tracing::debug!(cart_id = %cart.id, product_id = %line.product_id, "reservation already released");
            }
        }

        self.instrumentation.run(&self.expire_cart, &cart).await?;
        Ok(cart.id)
    }

    async fn run(&self, request: &ExpireCartsRequest) -> Result<ExpireReport> {
        metrics::counter!("saga_executions_total", "saga" => EXPIRE_CARTS).increment(1);

        let filter = Filter::new()
            .eq(STATE, CartState::Active.as_str())
            .lte(MODIFIED_ON, timestamp(request.cutoff));
        let stale = self.carts.find_many(&filter).await?;

        let mut report = ExpireReport::default();
        for doc in &stale {
            match self.expire(doc).await {
                Ok(cart_id) => {
                    metrics::counter!("carts_expired").increment(1);
                    report.expired.push(cart_id);
                }
                Err(error) => {
                    let cart_id = doc
                        .get(ID_FIELD)
                        .map(|id| id.as_str().map_or_else(|| id.to_string(), str::to_string))
                        .unwrap_or_default();
                    tracing::warn!(%cart_id, %error, "failed to expire cart");
                    report.failures.push(ExpireFailure { cart_id, error });
                }
            }
        }

        tracing::info!(
            expired = report.expired.len(),
            failed = report.failures.len(),
            "expiry sweep finished"
        );
        Ok(report)
    }
}

#[async_trait]
impl<S: DocumentStore + Clone> Action for ExpireCarts<S> {
    type Request = ExpireCartsRequest;
    type Response = ExpireReport;

    fn name(&self) -> &'static str {
        EXPIRE_CARTS
    }

    #[tracing::instrument(skip(self, request), fields(cutoff = %request.cutoff))]
    async fn execute(&self, request: &ExpireCartsRequest) -> Result<ExpireReport> {
        self.instrumentation.total(self.run(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;

    #[tokio::test]
    async fn empty_store_expires_nothing() {
        let saga = ExpireCarts::new(
            &Collections::new(InMemoryDocumentStore::new()),
            Instrumentation::disabled(),
        );

        let report = saga
            .execute(&ExpireCartsRequest { cutoff: Utc::now() })
            .await
            .unwrap();

        assert!(report.expired.is_empty());
        assert!(report.is_clean());
    }
}
