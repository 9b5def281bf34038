//! Inventory ledger document.

use chrono::{DateTime, Utc};
use common::{CartId, ProductId};
use document_store::Document;
use serde::{Deserialize, Serialize};

use crate::fields::INVENTORIES;
use crate::{Result, decode};

/// Stock held back from availability for one cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reservation {
    #[serde(rename = "_id")]
    pub cart_id: CartId,
    pub quantity: u32,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_on: DateTime<Utc>,
}

/// Available stock for a product plus the reservations carved out of it.
///
/// `quantity` plus the sum of reservation quantities is the product's stock;
/// every reserve, adjust and release keeps that sum constant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryRecord {
    #[serde(rename = "_id")]
    pub id: ProductId,
    pub quantity: u32,
    #[serde(default)]
    pub reservations: Vec<Reservation>,
    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub modified_on: Option<DateTime<Utc>>,
}

impl InventoryRecord {
    /// Creates a record with no reservations.
    pub fn new(id: impl Into<ProductId>, quantity: u32) -> Self {
        Self {
            id: id.into(),
            quantity,
            reservations: Vec::new(),
            modified_on: None,
        }
    }

    /// Decodes an inventory record from its stored document.
    pub fn from_document(document: &Document) -> Result<Self> {
        decode(INVENTORIES, document)
    }

    /// Returns the reservation held by a cart, if any.
    pub fn reservation_for(&self, cart_id: &CartId) -> Option<&Reservation> {
        self.reservations.iter().find(|r| &r.cart_id == cart_id)
    }

    /// Returns the number of units currently reserved.
    pub fn reserved_total(&self) -> u64 {
        self.reservations.iter().map(|r| u64::from(r.quantity)).sum()
    }

    /// Returns available plus reserved units.
    pub fn total_stock(&self) -> u64 {
        u64::from(self.quantity) + self.reserved_total()
    }

    /// Returns true if no cart holds more than one reservation.
    pub fn has_unique_reservations(&self) -> bool {
        let mut seen = std::collections::HashSet::new();
        self.reservations.iter().all(|r| seen.insert(&r.cart_id))
    }
}
