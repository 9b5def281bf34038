//! Turn an active cart into an order.

use async_trait::async_trait;
use common::{CartId, OrderId};
use document_store::{Collection, DocumentStore, Filter};
use domain::fields::STATE;
use domain::{Cart, CartState, PaymentInfo, ShippingInfo};

use super::{CHECKOUT_CART, require};
use crate::action::Action;
use crate::collections::Collections;
use crate::instrument::Instrumentation;
use crate::steps::{CompleteCart, CreateOrder, CreateOrderRequest, ReleaseAllReservations};
use crate::{Result, SagaError};

const LOCATE_CART: &str = "locate_cart";

#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub cart_id: CartId,
    pub shipping: ShippingInfo,
    pub payment: PaymentInfo,
}

impl CheckoutRequest {
    fn validate(&self) -> Result<()> {
        let blank = |s: &str| s.trim().is_empty();
        require(self.cart_id.is_empty(), CHECKOUT_CART, "cart_id")?;
        require(blank(&self.shipping.name), CHECKOUT_CART, "shipping.name")?;
        require(blank(&self.shipping.address), CHECKOUT_CART, "shipping.address")?;
        require(blank(&self.payment.reference), CHECKOUT_CART, "payment.reference")
    }
}

/// What checkout produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutReceipt {
    pub order_id: OrderId,
    /// Inventory records a reservation was dropped from.
    pub released: u64,
}

/// Snapshots an active cart into an order, completes the cart and drops
/// its reservations.
///
/// There is no compensation: a failure after the order is inserted is
/// returned as is.
pub struct CheckoutCart<S> {
    carts: Collection<S>,
    create_order: CreateOrder<S>,
    complete_cart: CompleteCart<S>,
    release_all: ReleaseAllReservations<S>,
    instrumentation: Instrumentation,
}

impl<S: DocumentStore + Clone> CheckoutCart<S> {
    pub fn new(collections: &Collections<S>, instrumentation: Instrumentation) -> Self {
        Self {
            carts: collections.carts.clone(),
            create_order: CreateOrder::new(collections.orders.clone()),
            complete_cart: CompleteCart::new(collections.carts.clone()),
            release_all: ReleaseAllReservations::new(collections.inventories.clone()),
            instrumentation,
        }
    }

    async fn locate(&self, cart_id: &CartId) -> Result<Cart> {
        let filter = Filter::by_id(cart_id.as_str()).eq(STATE, CartState::Active.as_str());
        let doc = self
            .carts
            .find_one(&filter)
            .await?
            .ok_or_else(|| SagaError::not_found("active cart", cart_id))?;
        Ok(Cart::from_document(&doc)?)
    }

    async fn run(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt> {
        metrics::counter!("saga_executions_total", "saga" => CHECKOUT_CART).increment(1);
        request.validate()?;

        let cart = self
            .instrumentation
            .time(LOCATE_CART, self.locate(&request.cart_id))
            .await?;

        let order = CreateOrderRequest {
            cart,
            shipping: request.shipping.clone(),
            payment: request.payment.clone(),
        };
        let order_id = self.instrumentation.run(&self.create_order, &order).await?;

        self.instrumentation
            .run(&self.complete_cart, &request.cart_id)
            .await?;
        let released = self
            .instrumentation
            .run(&self.release_all, &request.cart_id)
            .await?;

        metrics::counter!("saga_completed", "saga" => CHECKOUT_CART).increment(1);
        tracing::info!(%order_id, released, "cart checked out");

        Ok(CheckoutReceipt { order_id, released })
    }
}

#[async_trait]
impl<S: DocumentStore + Clone> Action for CheckoutCart<S> {
    type Request = CheckoutRequest;
    type Response = CheckoutReceipt;

    fn name(&self) -> &'static str {
        CHECKOUT_CART
    }

    #[tracing::instrument(skip(self, request), fields(cart_id = %request.cart_id))]
    async fn execute(&self, request: &CheckoutRequest) -> Result<CheckoutReceipt> {
        self.instrumentation.total(self.run(request)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::InMemoryDocumentStore;

    fn request(cart: &str, address: &str) -> CheckoutRequest {
        CheckoutRequest {
            cart_id: CartId::new(cart),
            shipping: ShippingInfo {
                name: "Ada".to_string(),
                address: address.to_string(),
            },
            payment: PaymentInfo {
                reference: "card-1".to_string(),
            },
        }
    }

    fn saga() -> CheckoutCart<InMemoryDocumentStore> {
        CheckoutCart::new(
            &Collections::new(InMemoryDocumentStore::new()),
            Instrumentation::disabled(),
        )
    }

    #[tokio::test]
    async fn rejects_blank_shipping_address() {
        let err = saga().execute(&request("user-1", "  ")).await.unwrap_err();
        assert!(matches!(
            err,
            SagaError::MissingParameter { name: "shipping.address", .. }
        ));
    }

    #[tokio::test]
    async fn missing_cart_is_not_found() {
        let err = saga().execute(&request("user-1", "1 Loop Rd")).await.unwrap_err();
        assert!(matches!(err, SagaError::RecordNotFound { kind: "active cart", .. }));
    }
}
