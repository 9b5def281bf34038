//! Product catalog and inventory seeding.

use document_store::DocumentStore;
use domain::{InventoryRecord, Money, Product, encode};
use saga::Collections;

use crate::Result;

/// Builds a deterministic catalog of `count` products.
pub fn catalog(count: usize) -> Vec<Product> {
    (0..count)
        .map(|i| {
            let price = i64::try_from(i + 1).unwrap_or(i64::MAX).saturating_mul(250);
            Product::new(
                format!("SKU-{:03}", i + 1),
                format!("Product {}", i + 1),
                Money::from_cents(price),
            )
        })
        .collect()
}

/// Empties the collections and gives every product `stock` available units.
pub async fn seed_inventory<S: DocumentStore + Clone>(
    collections: &Collections<S>,
    products: &[Product],
    stock: u32,
) -> Result<()> {
    collections.drop_all().await?;
    for product in products {
        let record = InventoryRecord::new(product.id.clone(), stock);
        collections.inventories.insert_one(encode(&record)?).await?;
    }
    tracing::info!(products = products.len(), stock, "inventory seeded");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use document_store::{Filter, InMemoryDocumentStore};

    #[test]
    fn catalog_is_deterministic() {
        let products = catalog(3);
        assert_eq!(products.len(), 3);
        assert_eq!(products[0].id.as_str(), "SKU-001");
        assert_eq!(products[2].price, Money::from_cents(750));
        assert_eq!(catalog(3), products);
    }

    #[tokio::test]
    async fn seeding_replaces_previous_state() {
        let collections = Collections::new(InMemoryDocumentStore::new());
        seed_inventory(&collections, &catalog(4), 10).await.unwrap();
        seed_inventory(&collections, &catalog(2), 5).await.unwrap();

        let records = collections.inventories.find_many(&Filter::new()).await.unwrap();
        assert_eq!(records.len(), 2);
        let record = InventoryRecord::from_document(&records[0]).unwrap();
        assert_eq!(record.quantity, 5);
    }
}
