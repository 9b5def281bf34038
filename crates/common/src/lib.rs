//! Identifiers shared across the store, domain and saga crates.

mod types;

pub use types::{CartId, OrderId, ProductId};
