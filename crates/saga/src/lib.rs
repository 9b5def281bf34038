//! Compensating sagas for shopping carts backed by an inventory ledger.
//!
//! The store only guarantees atomicity per document, so a cart and the
//! inventory records it reserves from are updated by separate conditional
//! writes. Each saga runs its steps strictly in sequence and, when the
//! designated risky step fails its precondition, runs exactly one
//! compensation:
//!
//! | Saga | Steps | Compensation |
//! |---|---|---|
//! | [`AddProductToShoppingCart`] | `add_line_item`, `reserve_stock` | `remove_line_item` |
//! | [`UpdateReservationQuantityForAProduct`] | `set_line_item_quantity`, `adjust_reservation` | `restore_line_item_quantity` |
//! | [`CheckoutCart`] | locate, `create_order`, `complete_cart`, `release_all_reservations` | none |
//! | [`ExpireCarts`] | per cart: `release_reservation` per line, `expire_cart` if unchanged since read | none, failures reported per cart |
//!
//! There is no retry anywhere; a compensation that cannot be applied is
//! surfaced as [`SagaError::CompensationFailed`].

pub mod action;
pub mod collections;
pub mod error;
pub mod instrument;
pub mod outcome;
pub mod sagas;
pub mod steps;

pub use action::Action;
pub use collections::Collections;
pub use error::{Result, SagaError};
pub use instrument::Instrumentation;
pub use outcome::CompensationOutcome;
pub use sagas::{
    AddProductRequest, AddProductToShoppingCart, CheckoutCart, CheckoutReceipt, CheckoutRequest,
    ExpireCarts, ExpireCartsRequest, ExpireFailure, ExpireReport, UpdateReservationQuantityForAProduct,
    UpdateReservationRequest,
};
pub use steps::LineItemChange;
