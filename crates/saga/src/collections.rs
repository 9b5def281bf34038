//! Collection handles the sagas operate on.

use document_store::{Collection, DocumentStore};
use domain::fields::{CARTS, INVENTORIES, ORDERS};

/// The three collections bound to one store.
#[derive(Clone)]
pub struct Collections<S> {
    pub carts: Collection<S>,
    pub inventories: Collection<S>,
    pub orders: Collection<S>,
}

impl<S: DocumentStore + Clone> Collections<S> {
    /// Binds carts, inventories and orders to `store`.
    pub fn new(store: S) -> Self {
        Self {
            carts: Collection::new(store.clone(), CARTS),
            inventories: Collection::new(store.clone(), INVENTORIES),
            orders: Collection::new(store, ORDERS),
        }
    }

    /// Removes every document from the three collections.
    pub async fn drop_all(&self) -> document_store::Result<()> {
        self.carts.drop().await?;
        self.inventories.drop().await?;
        self.orders.drop().await
    }
}
