//! Domain documents for the shopping cart reservation system.
//!
//! This crate defines the shapes stored in the document store:
//! - Carts with their line items and one-way state machine
//! - Inventory records with available stock and per-cart reservations
//! - Orders created at checkout
//!
//! The field and collection names used by conditional store updates live in
//! [`fields`] so the sagas and the documents cannot drift apart.

pub mod cart;
pub mod document;
pub mod error;
pub mod fields;
pub mod inventory;
pub mod order;
pub mod product;

pub use cart::{Cart, CartState, LineItem};
pub use common::{CartId, OrderId, ProductId};
pub use document::{decode, encode, timestamp};
pub use error::{DomainError, Result};
pub use inventory::{InventoryRecord, Reservation};
pub use order::{Order, PaymentInfo, ShippingInfo};
pub use product::{Money, Product};
