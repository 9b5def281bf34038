//! Order step.

use async_trait::async_trait;
use chrono::Utc;
use common::OrderId;
use document_store::{Collection, DocumentStore};
use domain::{Cart, Order, PaymentInfo, ShippingInfo, encode};

use super::CREATE_ORDER;
use crate::Result;
use crate::action::Action;

/// Inserts an order snapshot of a cart.
pub struct CreateOrder<S> {
    orders: Collection<S>,
}

#[derive(Debug, Clone)]
pub struct CreateOrderRequest {
    pub cart: Cart,
    pub shipping: ShippingInfo,
    pub payment: PaymentInfo,
}

impl<S: DocumentStore> CreateOrder<S> {
    pub fn new(orders: Collection<S>) -> Self {
        Self { orders }
    }
}

#[async_trait]
impl<S: DocumentStore> Action for CreateOrder<S> {
    type Request = CreateOrderRequest;
    type Response = OrderId;

    fn name(&self) -> &'static str {
        CREATE_ORDER
    }

    async fn execute(&self, request: &CreateOrderRequest) -> Result<OrderId> {
        let order = Order::from_cart(
            &request.cart,
            request.shipping.clone(),
            request.payment.clone(),
            Utc::now(),
        );
        self.orders.insert_one(encode(&order)?).await?;
        Ok(order.id)
    }
}
