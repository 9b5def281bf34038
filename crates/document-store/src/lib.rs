//! Document store adapter for the cart reservation sagas.
//!
//! Documents are JSON objects grouped into named collections. The store
//! contract is deliberately narrow: conditional find, insert and update
//! primitives whose only atomicity guarantee is per document. Callers that
//! need cross-document consistency have to build it themselves, with
//! conditional updates and compensations.

pub mod document;
pub mod error;
pub mod filter;
pub mod memory;
pub mod postgres;
pub mod store;
pub mod update;

pub use document::{Document, ID_FIELD, assign_id};
pub use error::{DocumentStoreError, Result};
pub use filter::{Condition, Filter};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use store::{Collection, DocumentStore, UpdateOptions, UpdateResult};
pub use update::{Operation, Update};
