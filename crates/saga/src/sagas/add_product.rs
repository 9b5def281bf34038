//! Add a product to a cart and reserve its stock.

use async_trait::async_trait;
use common::CartId;
use document_store::DocumentStore;
use domain::{DomainError, Product};

use super::{ADD_PRODUCT_TO_SHOPPING_CART, require};
use crate::action::Action;
use crate::collections::Collections;
use crate::instrument::Instrumentation;
use crate::outcome::CompensationOutcome;
use crate::steps::{
    AddLineItem, AddLineItemRequest, REMOVE_LINE_ITEM, RESERVE_STOCK, RemoveLineItem,
    RemoveLineItemRequest, ReserveStock, ReserveStockRequest,
};
use crate::{Result, SagaError};

#[derive(Debug, Clone)]
pub struct AddProductRequest {
    pub cart_id: CartId,
    pub product: Product,
    pub quantity: u32,
}

impl AddProductRequest {
    fn validate(&self) -> Result<()> {
        require(self.cart_id.is_empty(), ADD_PRODUCT_TO_SHOPPING_CART, "cart_id")?;
        require(self.product.id.is_empty(), ADD_PRODUCT_TO_SHOPPING_CART, "product.id")?;
        if self.quantity == 0 {
            return Err(DomainError::InvalidQuantity {
                quantity: self.quantity,
            }
            .into());
        }
        Ok(())
    }
}

/// Adds a line item to a cart, then reserves the stock for it.
///
/// Steps:
/// 1. `add_line_item` (creates the cart on first use)
/// 2. `reserve_stock`
///
/// When the reservation's precondition fails the line item is pulled back
/// out of the cart and the original failure is returned.
pub struct AddProductToShoppingCart<S> {
    add_line_item: AddLineItem<S>,
    reserve_stock: ReserveStock<S>,
    remove_line_item: RemoveLineItem<S>,
    instrumentation: Instrumentation,
}

impl<S: DocumentStore + Clone> AddProductToShoppingCart<S> {
    pub fn new(collections: &Collections<S>, instrumentation: Instrumentation) -> Self {
        Self {
            add_line_item: AddLineItem::new(collections.carts.clone()),
            reserve_stock: ReserveStock::new(collections.inventories.clone()),
            remove_line_item: RemoveLineItem::new(collections.carts.clone()),
            instrumentation,
        }
    }

    async fn run(&self, request: &AddProductRequest) -> Result<()> {
        metrics::counter!("saga_executions_total", "saga" => ADD_PRODUCT_TO_SHOPPING_CART)
            .increment(1);
        request.validate()?;

        let line = AddLineItemRequest {
            cart_id: request.cart_id.clone(),
            product: request.product.clone(),
            quantity: request.quantity,
        };
        self.instrumentation.run(&self.add_line_item, &line).await?;

        let reservation = ReserveStockRequest {
            cart_id: request.cart_id.clone(),
            product_id: request.product.id.clone(),
            quantity: request.quantity,
        };
        match self.instrumentation.run(&self.reserve_stock, &reservation).await {
            Ok(()) => {
                metrics::counter!("saga_completed", "saga" => ADD_PRODUCT_TO_SHOPPING_CART)
                    .increment(1);
                tracing::debug!("product added and reserved");
                Ok(())
            }
            Err(e) if e.is_precondition_failed() => Err(self.compensate(request, e).await),
            Err(e) => Err(e),
        }
    }

    /// Pulls the line item added in step 1.
    async fn compensate(&self, request: &AddProductRequest, failure: SagaError) -> SagaError {
        let outcome = CompensationOutcome::new(
            RESERVE_STOCK,
            REMOVE_LINE_ITEM,
            &request.cart_id,
            &request.product.id,
        );
        let removal = RemoveLineItemRequest {
            cart_id: request.cart_id.clone(),
            product_id: request.product.id.clone(),
        };

        match self.instrumentation.run(&self.remove_line_item, &removal).await {
            Ok(()) => {
                let outcome = outcome.succeeded();
                metrics::counter!("saga_compensated", "saga" => ADD_PRODUCT_TO_SHOPPING_CART)
                    .increment(1);
                tracing::warn!(%outcome, reason = %failure, "saga compensated");
                failure
            }
            Err(e) => {
                metrics::counter!("saga_compensation_failed", "saga" => ADD_PRODUCT_TO_SHOPPING_CART)
                    .increment(1);
                tracing::error!(%outcome, reason = %failure, error = %e, "compensation failed");
                SagaError::CompensationFailed {
                    outcome,
                    reason: e.to_string(),
                }
            }
        }
    }
}

#[async_trait]
impl<S: DocumentStore + Clone> Action for AddProductToShoppingCart<S> {
    type Request = AddProductRequest;
    type Response = ();

    fn name(&self) -> &'static str {
        ADD_PRODUCT_TO_SHOPPING_CART
    }

    #[tracing::instrument(skip(self, request), fields(cart_id = %request.cart_id, product_id = %request.product.id))]
    async fn execute(&self, request: &AddProductRequest) -> Result<()> {
        self.instrumentation.total(self.run(request)).await
    }
}
