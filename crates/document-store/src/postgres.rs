use async_trait::async_trait;
use serde_json::Value;
use sqlx::{PgConnection, PgPool, Row};

use crate::document::id_key;
use crate::store::{DocumentStore, UpdateOptions, UpdateResult, upsert_document};
use crate::{Document, DocumentStoreError, Filter, Result, Update, assign_id};

/// PostgreSQL-backed document store.
///
/// Documents live as JSONB rows in a single `documents` table keyed by
/// `(collection, id)`. Filters are evaluated in process; candidate rows are
/// locked with `SELECT ... FOR UPDATE` inside a transaction before an update
/// is evaluated and written, so a conditional update on one document is
/// atomic with respect to concurrent writers. An `_id` equality in the filter
/// is pushed down to SQL to narrow the candidate set.
#[derive(Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Creates a new PostgreSQL document store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }
}

async fn select_documents(
    conn: &mut PgConnection,
    collection: &str,
    filter: &Filter,
    lock: bool,
) -> Result<Vec<(String, Value)>> {
    let id = filter.id_equality().map(id_key);

    let mut sql = String::from("SELECT id, body FROM documents WHERE collection = $1");
    if id.is_some() {
        sql.push_str(" AND id = $2");
    }
    sql.push_str(" ORDER BY seq");
    if lock {
        sql.push_str(" FOR UPDATE");
    }

    let mut query = sqlx::query(&sql).bind(collection);
    if let Some(id) = id.as_deref() {
        query = query.bind(id);
    }

    let rows = query.fetch_all(&mut *conn).await?;
    rows.into_iter()
        .map(|row| -> Result<(String, Value)> {
            Ok((row.try_get("id")?, row.try_get("body")?))
        })
        .filter(|candidate| match candidate {
            Ok((_, body)) => filter.matches(body),
            Err(_) => true,
        })
        .collect()
}

async fn insert_document(
    conn: &mut PgConnection,
    collection: &str,
    id: &Value,
    body: &Value,
) -> Result<()> {
    let key = id_key(id);
    sqlx::query("INSERT INTO documents (collection, id, body) VALUES ($1, $2, $3)")
        .bind(collection)
        .bind(key.as_str())
        .bind(body)
        .execute(&mut *conn)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("documents_pkey")
            {
                return DocumentStoreError::DuplicateKey {
                    collection: collection.to_string(),
                    id: key.clone(),
                };
            }
            DocumentStoreError::Database(e)
        })?;
    Ok(())
}

async fn replace_document(
    conn: &mut PgConnection,
    collection: &str,
    key: &str,
    body: &Value,
) -> Result<()> {
    sqlx::query("UPDATE documents SET body = $3 WHERE collection = $1 AND id = $2")
        .bind(collection)
        .bind(key)
        .bind(body)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    async fn find_one(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        let mut conn = self.pool.acquire().await?;
        let documents = select_documents(&mut *conn, collection, filter, false).await?;
        Ok(documents.into_iter().next().map(|(_, body)| body))
    }

    async fn find_many(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        let mut conn = self.pool.acquire().await?;
        let documents = select_documents(&mut *conn, collection, filter, false).await?;
        Ok(documents.into_iter().map(|(_, body)| body).collect())
    }

    async fn insert_one(&self, collection: &str, mut document: Document) -> Result<Value> {
        let id = assign_id(&mut document)?;
        let mut conn = self.pool.acquire().await?;
        insert_document(&mut *conn, collection, &id, &document).await?;
        Ok(id)
    }

    #[tracing::instrument(skip(self, filter, update))]
    async fn update_one(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
        options: UpdateOptions,
    ) -> Result<UpdateResult> {
        let mut tx = self.pool.begin().await?;

        let candidates = select_documents(&mut *tx, collection, filter, true).await?;
        if let Some((key, mut body)) = candidates.into_iter().next() {
            let modified = update.apply(&mut body, filter)?;
            if modified {
                replace_document(&mut *tx, collection, &key, &body).await?;
            }
            tx.commit().await?;
            return Ok(UpdateResult {
                matched_count: 1,
                modified_count: u64::from(modified),
                upserted_id: None,
            });
        }

        metrics::counter!("document_store_update_misses_total").increment(1);
        if !options.upsert {
            tx.rollback().await?;
            return Ok(UpdateResult::default());
        }

        let mut document = upsert_document(filter, update)?;
        let id = assign_id(&mut document)?;
        insert_document(&mut *tx, collection, &id, &document).await?;
        tx.commit().await?;
        tracing::debug!(collection, id = %id, "upserted document");

        Ok(UpdateResult {
            matched_count: 0,
            modified_count: 0,
            upserted_id: Some(id),
        })
    }

    #[tracing::instrument(skip(self, filter, update))]
    async fn update_many(
        &self,
        collection: &str,
        filter: &Filter,
        update: &Update,
    ) -> Result<UpdateResult> {
        let mut tx = self.pool.begin().await?;
        let mut result = UpdateResult::default();

        for (key, mut body) in select_documents(&mut *tx, collection, filter, true).await? {
            result.matched_count += 1;
            if update.apply(&mut body, filter)? {
                replace_document(&mut *tx, collection, &key, &body).await?;
                result.modified_count += 1;
            }
        }

        tx.commit().await?;
        Ok(result)
    }

    async fn drop_collection(&self, collection: &str) -> Result<()> {
        sqlx::query("DELETE FROM documents WHERE collection = $1")
            .bind(collection)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
