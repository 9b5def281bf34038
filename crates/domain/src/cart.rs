//! Shopping cart document and its state machine.

use chrono::{DateTime, Utc};
use common::{CartId, ProductId};
use document_store::Document;
use serde::{Deserialize, Serialize};

use crate::fields::CARTS;
use crate::product::{Money, Product};
use crate::{Result, decode};

/// The state of a cart in its lifecycle.
///
/// State transitions are one-way:
/// ```text
/// Active ──┬──► Complete
///          └──► Expired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CartState {
    /// Items can be added and reserved.
    #[default]
    Active,

    /// Checked out into an order (terminal state).
    Complete,

    /// Swept by the expiry job, reservations returned (terminal state).
    Expired,
}

impl CartState {
    /// Returns true if the cart can still be modified.
    pub fn is_active(&self) -> bool {
        matches!(self, CartState::Active)
    }

    /// Returns true if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, CartState::Complete | CartState::Expired)
    }

    /// Returns true if the cart may move to `next`.
    pub fn can_transition_to(&self, next: CartState) -> bool {
        self.is_active() && next.is_terminal()
    }

    /// Returns the value stored in the `state` field.
    pub fn as_str(&self) -> &'static str {
        match self {
            CartState::Active => "active",
            CartState::Complete => "complete",
            CartState::Expired => "expired",
        }
    }
}

impl std::fmt::Display for CartState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A product line in a cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(rename = "_id")]
    pub product_id: ProductId,
    pub quantity: u32,
    pub name: String,
    pub price: Money,
}

impl LineItem {
    /// Creates a line item for a product.
    pub fn new(product: &Product, quantity: u32) -> Self {
        Self {
            product_id: product.id.clone(),
            quantity,
            name: product.name.clone(),
            price: product.price,
        }
    }

    /// Returns the total price for this line (quantity * price).
    pub fn total_price(&self) -> Money {
        self.price.multiply(self.quantity)
    }
}

/// A shopping cart, keyed by the client that owns it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(rename = "_id")]
    pub id: CartId,
    #[serde(default)]
    pub state: CartState,
    #[serde(default)]
    pub products: Vec<LineItem>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub modified_on: DateTime<Utc>,
}

impl Cart {
    /// Decodes a cart from its stored document.
    pub fn from_document(document: &Document) -> Result<Self> {
        decode(CARTS, document)
    }

    /// Returns the line item for a product, if present.
    pub fn line_item(&self, product_id: &ProductId) -> Option<&LineItem> {
        self.products.iter().find(|item| &item.product_id == product_id)
    }

    /// Returns the total number of units across all lines.
    pub fn total_quantity(&self) -> u64 {
        self.products.iter().map(|item| u64::from(item.quantity)).sum()
    }

    /// Returns the total price of the cart.
    pub fn total_price(&self) -> Money {
        self.products.iter().map(LineItem::total_price).sum()
    }
}
