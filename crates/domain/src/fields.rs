//! Collection and field names shared by documents and store predicates.

pub use document_store::ID_FIELD as ID;

/// Collection holding one document per cart.
pub const CARTS: &str = "carts";

/// Collection holding one inventory record per product.
pub const INVENTORIES: &str = "inventories";

/// Collection holding orders created at checkout.
pub const ORDERS: &str = "orders";

pub const STATE: &str = "state";
pub const MODIFIED_ON: &str = "modifiedOn";
pub const CREATED_ON: &str = "createdOn";
pub const QUANTITY: &str = "quantity";

/// Cart line items.
pub const PRODUCTS: &str = "products";
pub const PRODUCTS_ID: &str = "products._id";
pub const PRODUCTS_MATCHED_QUANTITY: &str = "products.$.quantity";

/// Inventory reservations.
pub const RESERVATIONS: &str = "reservations";
pub const RESERVATIONS_ID: &str = "reservations._id";
pub const RESERVATIONS_MATCHED_QUANTITY: &str = "reservations.$.quantity";
