//! Order document created at checkout.

use chrono::{DateTime, Utc};
use common::{CartId, OrderId};
use document_store::Document;
use serde::{Deserialize, Serialize};

use crate::cart::{Cart, LineItem};
use crate::fields::ORDERS;
use crate::product::Money;
use crate::{Result, decode};

/// Where the order ships to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShippingInfo {
    pub name: String,
    pub address: String,
}

/// Payment details captured at checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentInfo {
    pub reference: String,
}

/// An immutable snapshot of a cart at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: OrderId,
    pub cart_id: CartId,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_on: DateTime<Utc>,
    pub shipping: ShippingInfo,
    pub payment: PaymentInfo,
    pub products: Vec<LineItem>,
}

impl Order {
    /// Snapshots a cart into a new order.
    pub fn from_cart(
        cart: &Cart,
        shipping: ShippingInfo,
        payment: PaymentInfo,
        created_on: DateTime<Utc>,
    ) -> Self {
        Self {
            id: OrderId::new(),
            cart_id: cart.id.clone(),
            created_on,
            shipping,
            payment,
            products: cart.products.clone(),
        }
    }

    /// Decodes an order from its stored document.
    pub fn from_document(document: &Document) -> Result<Self> {
        decode(ORDERS, document)
    }

    /// Returns the order total.
    pub fn total(&self) -> Money {
        self.products.iter().map(LineItem::total_price).sum()
    }
}
