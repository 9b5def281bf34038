use async_trait::async_trait;
use serde_json::Value;

use crate::{Document, Filter, Result, Update};

/// Options for single-document updates.
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateOptions {
    /// Insert a new document built from the filter's top-level equalities
    /// and the update when nothing matches.
    pub upsert: bool,
}

impl UpdateOptions {
    /// Creates options without upsert.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates options with upsert enabled.
    pub fn upsert() -> Self {
        Self { upsert: true }
    }
}

/// Outcome of an update call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UpdateResult {
    /// Number of documents that matched the filter.
    pub matched_count: u64,
    /// Number of matched documents whose content changed.
    pub modified_count: u64,
    /// The `_id` of the document inserted by an upsert, if any.
    pub upserted_id: Option<Value>,
}

impl UpdateResult {
    /// Returns true if the filter matched nothing and nothing was upserted.
    pub fn is_noop(&self) -> bool {
        self.matched_count == 0 && self.upserted_id.is_none()
    }
}

/// Core trait for document store implementations.
///
/// Documents are grouped into named collections and keyed by `_id`. The only
/// atomicity offered is per document: `update_one` evaluates its filter and
/// applies its update as one indivisible step, and never writes a partially
/// applied update. There are no multi-document transactions.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Returns the first document matching the filter, in insertion order.
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>>;

    /// Returns every document matching the filter, in insertion order.
    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>>;

    /// Inserts a document, assigning a generated `_id` if it has none.
    ///
    /// Fails with `DuplicateKey` if the `_id` already exists. Returns the `_id`.
    async fn insert_one(&self, collection: &str, document: Document) -> Result<Value>;

    /// Atomically updates the first document matching the filter.
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult>;

    /// Updates every document matching the filter.
    ///
    /// Each document is updated atomically on its own; the batch as a whole
    /// is not.
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult>;

    /// Removes every document in a collection.
    async fn drop_collection(&self, collection: &str) -> Result<()>;
}

/// A store bound to one named collection.
///
/// Actions receive the collection handles they touch instead of the whole
/// store, which keeps their side effects to the resources they declare.
#[derive(Debug, Clone)]
pub struct Collection<S> {
    store: S,
    name: &'static str,
}

impl<S: DocumentStore> Collection<S> {
    /// Binds a store to a collection name.
    pub fn new(store: S, name: &'static str) -> Self {
        Self { store, name }
    }

    /// Returns the collection name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub async fn find_one(&self, filter: &Filter) -> Result<Option<Document>> {
        self.store.find_one(self.name, filter).await
    }

    pub async fn find_many(&self, filter: &Filter) -> Result<Vec<Document>> {
        self.store.find_many(self.name, filter).await
    }

    pub async fn insert_one(&self, document: Document) -> Result<Value> {
        self.store.insert_one(self.name, document).await
    }

    pub async fn update_one(
        &self,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        self.store
            .update_one(self.name, filter, update, options)
            .await
    }

    pub async fn update_many(&self, filter: &Filter, update: &Update) -> Result<UpdateResult> {
        self.store.update_many(self.name, filter, update).await
    }

    pub async fn drop(&self) -> Result<()> {
        self.store.drop_collection(self.name).await
    }
}

/// Builds the document inserted by an upsert.
///
/// Positional paths cannot be resolved against a fresh document, so the
/// update is applied with an empty filter and such paths fail.
pub(crate) fn upsert_document(filter: &Filter, update: &Update) -> Result<Document> {
    let mut document = filter.upsert_seed();
    update.apply(&mut document, &Filter::new())?;
    Ok(document)
}
