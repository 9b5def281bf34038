//! Inventory reservation steps.

use async_trait::async_trait;
use chrono::Utc;
use common::{CartId, ProductId};
use document_store::{Collection, DocumentStore, Filter, Update, UpdateOptions};
use domain::fields::{ID, MODIFIED_ON, QUANTITY, RESERVATIONS, RESERVATIONS_ID, RESERVATIONS_MATCHED_QUANTITY};
use domain::{InventoryRecord, Reservation, encode};

use super::{ADJUST_RESERVATION, RELEASE_ALL_RESERVATIONS, RELEASE_RESERVATION, RESERVE_STOCK, now};
use crate::action::Action;
use crate::{Result, SagaError};

async fn load_record<S: DocumentStore>(
    inventories: &Collection<S>,
    product_id: &ProductId,
) -> Result<InventoryRecord> {
    let doc = inventories
        .find_one(&Filter::by_id(product_id.as_str()))
        .await?
        .ok_or_else(|| SagaError::not_found("inventory", product_id))?;
    Ok(InventoryRecord::from_document(&doc)?)
}

/// Moves stock from available into a new reservation for a cart.
pub struct ReserveStock<S> {
    inventories: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct ReserveStockRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl<S: DocumentStore> ReserveStock<S> {
    pub fn new(inventories: Collection<S>) -> Self {
        Self { inventories }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for ReserveStock<S> {
    type Request = ReserveStockRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        RESERVE_STOCK
    }

    async fn execute(&self, request: &ReserveStockRequest) -> Result<()> {
        let filter = Filter::by_id(request.product_id.as_str())
            .gte(QUANTITY, request.quantity)
            .ne(RESERVATIONS_ID, request.cart_id.as_str());
        let reservation = Reservation {
            cart_id: request.cart_id.clone(),
            quantity: request.quantity,
            created_on: Utc::now(),
        };
        let update = Update::new()
            .inc(QUANTITY, -i64::from(request.quantity))
            .push(RESERVATIONS, encode(&reservation)?)
            .set(MODIFIED_ON, now());

        let result = self
            .inventories
            .update_one(&filter, &update, UpdateOptions::new())
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }

        let record = load_record(&self.inventories, &request.product_id).await?;
        let reason = if record.reservation_for(&request.cart_id).is_some() {
            format!("cart {} already holds a reservation on {}", request.cart_id, request.product_id)
        } else {
            format!(
                "insufficient stock for {}: requested {}, available {}",
                request.product_id, request.quantity, record.quantity
            )
        };
        Err(SagaError::precondition(RESERVE_STOCK, reason))
    }
}

/// Grows or shrinks a cart's reservation, moving the difference between
/// available stock and the reservation.
pub struct AdjustReservation<S> {
    inventories: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct AdjustReservationRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// Units taken from available stock; negative values return stock.
    pub delta: i64,
    /// The reservation quantity after the adjustment.
    pub quantity: u32,
}

impl<S: DocumentStore> AdjustReservation<S> {
    pub fn new(inventories: Collection<S>) -> Self {
        Self { inventories }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for AdjustReservation<S> {
    type Request = AdjustReservationRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        ADJUST_RESERVATION
    }

    async fn execute(&self, request: &AdjustReservationRequest) -> Result<()> {
        let filter = Filter::by_id(request.product_id.as_str())
            .eq(RESERVATIONS_ID, request.cart_id.as_str())
            .gte(QUANTITY, request.delta);
        let update = Update::new()
            .inc(QUANTITY, -request.delta)
            .set(RESERVATIONS_MATCHED_QUANTITY, request.quantity)
            .set(MODIFIED_ON, now());

        let result = self
            .inventories
            .update_one(&filter, &update, UpdateOptions::new())
            .await?;
        if result.matched_count > 0 {
            return Ok(());
        }

        let record = load_record(&self.inventories, &request.product_id).await?;
        if record.reservation_for(&request.cart_id).is_none() {
            return Err(SagaError::not_found(
                "reservation",
                format!("{}/{}", request.product_id, request.cart_id),
            ));
        }
        Err(SagaError::precondition(
            ADJUST_RESERVATION,
            format!(
                "insufficient stock for {}: requested {} more, available {}",
                request.product_id, request.delta, record.quantity
            ),
        ))
    }
}

/// Returns one cart's reserved units for a product to available stock.
///
/// Only a reservation holding exactly the requested quantity is released.
/// A reservation that is already gone counts as released and the response
/// is `false`.
pub struct ReleaseReservation<S> {
    inventories: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct ReleaseReservationRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: u32,
}

impl<S: DocumentStore> ReleaseReservation<S> {
    pub fn new(inventories: Collection<S>) -> Self {
        Self { inventories }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for ReleaseReservation<S> {
    type Request = ReleaseReservationRequest;
    type Response = bool;

    fn name(&self) -> &'static str {
        RELEASE_RESERVATION
    }

    async fn execute(&self, request: &ReleaseReservationRequest) -> Result<bool> {
        let held = Filter::new()
            .eq(ID, request.cart_id.as_str())
            .eq(QUANTITY, request.quantity);
        let filter = Filter::by_id(request.product_id.as_str()).elem_match(RESERVATIONS, held);
        let update = Update::new()
            .inc(QUANTITY, i64::from(request.quantity))
            .pull(RESERVATIONS, Filter::new().eq(ID, request.cart_id.as_str()))
            .set(MODIFIED_ON, now());

        let result = self
            .inventories
            .update_one(&filter, &update, UpdateOptions::new())
            .await?;
        if result.matched_count > 0 {
            return Ok(true);
        }

        let record = load_record(&self.inventories, &request.product_id).await?;
        match record.reservation_for(&request.cart_id) {
            None => Ok(false),
            Some(reservation) => Err(SagaError::precondition(
                RELEASE_RESERVATION,
                format!(
                    "reservation of cart {} on {} holds {}, line holds {}",
                    request.cart_id, request.product_id, reservation.quantity, request.quantity
                ),
            )),
        }
    }
}

/// Drops every reservation a cart holds, across all inventory records.
///
/// The reserved units are not returned to available stock: they left with
/// the order.
pub struct ReleaseAllReservations<S> {
    inventories: Collection<S>,
}

impl<S: DocumentStore> ReleaseAllReservations<S> {
    pub fn new(inventories: Collection<S>) -> Self {
        Self { inventories }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for ReleaseAllReservations<S> {
    type Request = CartId;
    type Response = u64;

    fn name(&self) -> &'static str {
        RELEASE_ALL_RESERVATIONS
    }

    async fn execute(&self, cart_id: &CartId) -> Result<u64> {
        let filter = Filter::new().eq(RESERVATIONS_ID, cart_id.as_str());
        let update = Update::new()
            .pull(RESERVATIONS, Filter::new().eq(ID, cart_id.as_str()))
            .set(MODIFIED_ON, now());

        let result = self.inventories.update_many(&filter, &update).await?;
        Ok(result.modified_count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;
    use domain::fields::INVENTORIES;

    async fn inventories(quantity: u32) -> Collection<InMemoryDocumentStore> {
        let inventories = Collection::new(InMemoryDocumentStore::new(), INVENTORIES);
        inventories
            .insert_one(encode(&InventoryRecord::new("P1", quantity)).unwrap())
            .await
            .unwrap();
        inventories
    }

    async fn record(inventories: &Collection<InMemoryDocumentStore>) -> InventoryRecord {
        load_record(inventories, &ProductId::new("P1")).await.unwrap()
    }

    fn reserve(cart: &str, quantity: u32) -> ReserveStockRequest {
        ReserveStockRequest {
            cart_id: CartId::new(cart),
            product_id: ProductId::new("P1"),
            quantity,
        }
    }

    #[tokio::test]
    async fn reserve_moves_stock_into_reservation() {
        let inventories = inventories(5).await;
        ReserveStock::new(inventories.clone()).execute(&reserve("user-1", 2)).await.unwrap();

        let record = record(&inventories).await;
        assert_eq!(record.quantity, 3);
        assert_eq!(record.reservation_for(&CartId::new("user-1")).unwrap().quantity, 2);
        assert_eq!(record.total_stock(), 5);
    }

    #[tokio::test]
    async fn reserve_rejects_insufficient_stock_and_second_reservation() {
        let inventories = inventories(5).await;
        let step = ReserveStock::new(inventories.clone());

        let err = step.execute(&reserve("user-1", 6)).await.unwrap_err();
        assert!(err.to_string().contains("insufficient stock"));

        step.execute(&reserve("user-1", 1)).await.unwrap();
        let err = step.execute(&reserve("user-1", 1)).await.unwrap_err();
        assert!(err.to_string().contains("already holds a reservation"));

        assert_eq!(record(&inventories).await.quantity, 4);
    }

    #[tokio::test]
    async fn reserve_on_unknown_product_is_not_found() {
        let inventories = inventories(5).await;
        let err = ReserveStock::new(inventories)
            .execute(&ReserveStockRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P404"),
                quantity: 1,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, SagaError::RecordNotFound { kind: "inventory", .. }));
    }

    #[tokio::test]
    async fn adjust_grows_and_shrinks_reservation() {
        let inventories = inventories(5).await;
        ReserveStock::new(inventories.clone()).execute(&reserve("user-1", 2)).await.unwrap();
        let adjust = AdjustReservation::new(inventories.clone());

        adjust
            .execute(&AdjustReservationRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P1"),
                delta: 2,
                quantity: 4,
            })
            .await
            .unwrap();
        let grown = record(&inventories).await;
        assert_eq!(grown.quantity, 1);
        assert_eq!(grown.reserved_total(), 4);

        adjust
            .execute(&AdjustReservationRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P1"),
                delta: -3,
                quantity: 1,
            })
            .await
            .unwrap();
        let shrunk = record(&inventories).await;
        assert_eq!(shrunk.quantity, 4);
        assert_eq!(shrunk.reserved_total(), 1);
    }

    #[tokio::test]
    async fn adjust_distinguishes_missing_reservation_from_low_stock() {
        let inventories = inventories(5).await;
        let adjust = AdjustReservation::new(inventories.clone());
        let request = AdjustReservationRequest {
            cart_id: CartId::new("user-1"),
            product_id: ProductId::new("P1"),
            delta: 10,
            quantity: 12,
        };

        let err = adjust.execute(&request).await.unwrap_err();
        assert!(matches!(err, SagaError::RecordNotFound { kind: "reservation", .. }));

        ReserveStock::new(inventories.clone()).execute(&reserve("user-1", 2)).await.unwrap();
        let err = adjust.execute(&request).await.unwrap_err();
        assert!(matches!(err, SagaError::PreconditionFailed { step: ADJUST_RESERVATION, .. }));
        assert_eq!(record(&inventories).await.quantity, 3);
    }

    #[tokio::test]
    async fn release_returns_stock_once() {
        let inventories = inventories(5).await;
        ReserveStock::new(inventories.clone()).execute(&reserve("user-1", 2)).await.unwrap();
        let release = ReleaseReservation::new(inventories.clone());
        let request = ReleaseReservationRequest {
            cart_id: CartId::new("user-1"),
            product_id: ProductId::new("P1"),
            quantity: 2,
        };

        assert!(release.execute(&request).await.unwrap());
        assert!(!release.execute(&request).await.unwrap());

        let record = record(&inventories).await;
        assert_eq!(record.quantity, 5);
        assert!(record.reservations.is_empty());
    }

    #[tokio::test]
    async fn release_refuses_mismatched_quantity() {
        let inventories = inventories(5).await;
        ReserveStock::new(inventories.clone()).execute(&reserve("user-1", 2)).await.unwrap();

        let err = ReleaseReservation::new(inventories.clone())
            .execute(&ReleaseReservationRequest {
                cart_id: CartId::new("user-1"),
                product_id: ProductId::new("P1"),
                quantity: 3,
            })
            .await
            .unwrap_err();

        assert!(err.is_precondition_failed());
        assert_eq!(record(&inventories).await.quantity, 3);
    }

    #[tokio::test]
    async fn release_all_drops_only_that_cart() {
        let inventories = inventories(5).await;
        let reserve_step = ReserveStock::new(inventories.clone());
        reserve_step.execute(&reserve("user-1", 2)).await.unwrap();
        reserve_step.execute(&reserve("user-2", 1)).await.unwrap();

        let released = ReleaseAllReservations::new(inventories.clone())
            .execute(&CartId::new("user-1"))
            .await
            .unwrap();

        assert_eq!(released, 1);
        let record = record(&inventories).await;
        assert_eq!(record.quantity, 2);
        assert_eq!(record.reservations.len(), 1);
        assert!(record.reservation_for(&CartId::new("user-2")).is_some());
    }
}
