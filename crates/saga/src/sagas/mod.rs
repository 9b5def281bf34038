//! Sagas composed from the primitive steps.

mod add_product;
mod checkout;
mod expire;
mod update_reservation;

pub use add_product::{AddProductRequest, AddProductToShoppingCart};
pub use checkout::{CheckoutCart, CheckoutReceipt, CheckoutRequest};
pub use expire::{ExpireCarts, ExpireCartsRequest, ExpireFailure, ExpireReport};
pub use update_reservation::{UpdateReservationQuantityForAProduct, UpdateReservationRequest};

pub const ADD_PRODUCT_TO_SHOPPING_CART: &str = "add_product_to_shopping_cart";
pub const UPDATE_RESERVATION_QUANTITY: &str = "update_reservation_quantity_for_a_product";
pub const CHECKOUT_CART: &str = "checkout_cart";
pub const EXPIRE_CARTS: &str = "expire_carts";

fn require(blank: bool, action: &'static str, name: &'static str) -> crate::Result<()> {
    if blank {
        return Err(crate::SagaError::MissingParameter { action, name });
    }
    Ok(())
}
