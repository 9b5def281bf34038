//! Change the quantity of a reserved line item.

use async_trait::async_trait;
use common::{CartId, ProductId};
use document_store::DocumentStore;

use super::{UPDATE_RESERVATION_QUANTITY, require};
use crate::action::Action;
use crate::collections::Collections;
use crate::instrument::Instrumentation;
use crate::outcome::CompensationOutcome;
use crate::steps::{
    ADJUST_RESERVATION, AdjustReservation, AdjustReservationRequest, LineItemChange,
    RESTORE_LINE_ITEM_QUANTITY, RestoreLineItemQuantity, RestoreLineItemQuantityRequest,
    SetLineItemQuantity, SetLineItemQuantityRequest,
};
use crate::{Result, SagaError};

#[derive(Debug, Clone)]
pub struct UpdateReservationRequest {
    pub cart_id: CartId,
    pub product_id: ProductId,
    /// The new line quantity; zero keeps the line with nothing reserved.
    pub quantity: u32,
}

impl UpdateReservationRequest {
    fn validate(&self) -> Result<()> {
        require(self.cart_id.is_empty(), UPDATE_RESERVATION_QUANTITY, "cart_id")?;
        require(self.product_id.is_empty(), UPDATE_RESERVATION_QUANTITY, "product_id")
    }
}

/// Rewrites a cart line's quantity, then moves the difference between the
/// inventory's available stock and the cart's reservation.
///
/// When the inventory cannot cover the growth, the old line quantity is
/// written back and the original failure is returned. The write-back only
/// applies over the quantity this saga wrote. A zero difference
/// still performs both writes.
pub struct UpdateReservationQuantityForAProduct<S> {
    set_line_item_quantity: SetLineItemQuantity<S>,
    adjust_reservation: AdjustReservation<S>,
    restore_line_item_quantity: RestoreLineItemQuantity<S>,
    instrumentation: Instrumentation,
}

impl<S: DocumentStore + Clone> UpdateReservationQuantityForAProduct<S> {
    pub fn new(collections: &Collections<S>, instrumentation: Instrumentation) -> Self {
        Self {
            set_line_item_quantity: SetLineItemQuantity::new(collections.carts.clone()),
            adjust_reservation: AdjustReservation::new(collections.inventories.clone()),
            restore_line_item_quantity: RestoreLineItemQuantity::new(collections.carts.clone()),
            instrumentation,
        }
    }

    async fn run(&self, request: &UpdateReservationRequest) -> Result<LineItemChange> {
        metrics::counter!("saga_executions_total", "saga" => UPDATE_RESERVATION_QUANTITY)
            .increment(1);
        request.validate()?;

        let line = SetLineItemQuantityRequest {
            cart_id: request.cart_id.clone(),
            product_id: request.product_id.clone(),
            quantity: request.quantity,
        };
        let change = self
            .instrumentation
            .run(&self.set_line_item_quantity, &line)
            .await?;

        let adjustment = AdjustReservationRequest {
            cart_id: request.cart_id.clone(),
            product_id: request.product_id.clone(),
            delta: change.delta(),
            quantity: change.current,
        };
        match self
            .instrumentation
            .run(&self.adjust_reservation, &adjustment)
            .await
        {
            Ok(()) => {
                metrics::counter!("saga_completed", "saga" => UPDATE_RESERVATION_QUANTITY)
                    .increment(1);
                tracing::debug!(delta = change.delta(), "reservation adjusted");
                Ok(change)
            }
            Err(e) if e.is_precondition_failed() => Err(self.compensate(request, change, e).await),
            Err(e) => Err(e),
        }
    }

    /// Writes the previous quantity back into the cart line.
    async fn compensate(
        &self,
        request: &UpdateReservationRequest,
        change: LineItemChange,
        failure: SagaError,
    ) -> SagaError {
        let outcome = CompensationOutcome::new(
            ADJUST_RESERVATION,
            RESTORE_LINE_ITEM_QUANTITY,
            &request.cart_id,
            &request.product_id,
        );
        let restore = RestoreLineItemQuantityRequest {
            cart_id: request.cart_id.clone(),
            product_id: request.product_id.clone(),
            expected: change.current,
            quantity: change.previous,
        };

        match self
            .instrumentation
            .run(&self.restore_line_item_quantity, &restore)
            .await
        {
            Ok(_) => {
                let outcome = outcome.succeeded();
                metrics::counter!("saga_compensated", "saga" => UPDATE_RESERVATION_QUANTITY)
                    .increment(1);
                tracing::warn!(%outcome, reason = %failure, "saga compensated");
                failure
            }
            Err(e) => {
                metrics::counter!("saga_compensation_failed", "saga" => UPDATE_RESERVATION_QUANTITY)
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
impl<S: DocumentStore + Clone> Action for UpdateReservationQuantityForAProduct<S> {
    type Request = UpdateReservationRequest;
    type Response = LineItemChange;

    fn name(&self) -> &'static str {
        UPDATE_RESERVATION_QUANTITY
    }

    #[tracing::instrument(skip(self, request), fields(cart_id = %request.cart_id, product_id = %request.product_id, quantity = request.quantity))]
    async fn execute(&self, request: &UpdateReservationRequest) -> Result<LineItemChange> {
        self.instrumentation.total(self.run(request)).await
    }
}
