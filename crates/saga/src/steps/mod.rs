//! Primitive actions, one conditional store operation each.

mod cart;
mod inventory;
mod order;

pub use cart::{
    AddLineItem, AddLineItemRequest, CompleteCart, ExpireCart, LineItemChange, RemoveLineItem,
    RemoveLineItemRequest, RestoreLineItemQuantity, RestoreLineItemQuantityRequest,
    SetLineItemQuantity, SetLineItemQuantityRequest,
};
pub use inventory::{
    AdjustReservation, AdjustReservationRequest, ReleaseAllReservations, ReleaseReservation,
    ReleaseReservationRequest, ReserveStock, ReserveStockRequest,
};
pub use order::{CreateOrder, CreateOrderRequest};

pub const ADD_LINE_ITEM: &str = "add_line_item";
pub const REMOVE_LINE_ITEM: &str = "remove_line_item";
pub const SET_LINE_ITEM_QUANTITY: &str = "set_line_item_quantity";
pub const RESTORE_LINE_ITEM_QUANTITY: &str = "restore_line_item_quantity";
pub const COMPLETE_CART: &str = "complete_cart";
pub const EXPIRE_CART: &str = "expire_cart";
pub const RESERVE_STOCK: &str = "reserve_stock";
pub const ADJUST_RESERVATION: &str = "adjust_reservation";
pub const RELEASE_RESERVATION: &str = "release_reservation";
pub const RELEASE_ALL_RESERVATIONS: &str = "release_all_reservations";
pub const CREATE_ORDER: &str = "create_order";

fn now() -> i64 {
    domain::timestamp(chrono::Utc::now())
}
