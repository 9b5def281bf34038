use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::document::{document_id, id_key};
use crate::store::{DocumentStore, UpdateOptions, UpdateResult, upsert_document};
use crate::{Document, DocumentStoreError, Filter, Result, Update, assign_id};

/// In-memory document store.
///
/// Every write runs under a single write lock and replaces the stored
/// document only after the whole update has been applied to a copy, which
/// gives the same per-document atomicity as the PostgreSQL implementation.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<Document>>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory document store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in a collection.
    pub async fn document_count(&self, collection: &str) -> usize {
        self.collections
            .read()
            .await
            .get(collection)
            .map_or(0, Vec::len)
    }

    /// Removes every collection.
    pub async fn clear(&self) {
        self.collections.write().await.clear();
    }
}

fn contains_id(documents: &[Document], id: &Value) -> bool {
    let key = id_key(id);
    documents
        .iter()
        .filter_map(document_id)
        .any(|existing| id_key(existing) == key)
}

fn duplicate(collection: &str, id: &Value) -> DocumentStoreError {
    DocumentStoreError::DuplicateKey {
        collection: collection.to_string(),
        id: id_key(id),
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|doc| filter.matches(doc)))
            .cloned())
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let collections = self.collections.read().await;
        Ok(collections
            .get(collection)
            .map(|docs| {
                docs.iter()
                    .filter(|doc| filter.matches(doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Value> {
        let id = assign_id(&mut document)?;

        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();
        if contains_id(documents, &id) {
            return Err(duplicate(collection, &id));
        }
        documents.push(document);
        Ok(id)
    }

    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let mut collections = self.collections.write().await;
        let documents = collections.entry(collection.to_string()).or_default();

        if let Some(document) = documents.iter_mut().find(|doc| filter.matches(doc)) {
            let modified = update.apply(document, filter)?;
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            });
        }

        metrics::counter!("document_store_update_misses_total").increment(1);
        if !options.upsert {
            return Ok(UpdateResult::default());
        }

        let mut document = upsert_document(filter, update)?;
        let id = assign_id(&mut document)?;
        if contains_id(documents, &id) {
            return Err(duplicate(collection, &id));
        }
        documents.push(document);

        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult> {
        let mut collections = self.collections.write().await;
        let mut result = UpdateResult::default();
        let Some(documents) = collections.get_mut(collection) else {
            return Ok(result);
        };

        for document in documents.iter_mut().filter(|doc| filter.matches(doc)) {
            result.matched_count += 1;
            if update.apply(document, filter)? {
                result.modified_count += 1;
            }
        }
        Ok(result)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        self.collections.write().await.remove(collection);
        Ok(())
    }
}
