//! PostgreSQL implementation of the `DocumentStore` trait.
//!
//! All collections share one table; a document is a JSONB body keyed by
//! `(collection, document_key)`.

use async_trait::async_trait;
use serde_json::Value;
use sqlx_core::query::query;
use sqlx_core::query_as::query_as;
use sqlx_postgres::PgPool;
use tracing::{debug, instrument};

use strata_storage::{Document, DocumentStore, FieldUpdate, StorageError, document_key};

use crate::config::PostgresConfig;
use crate::error::map_query_error;
use crate::migrations;
use crate::pool;

const FIND_SQL: &str =
    "SELECT body FROM strata_documents WHERE collection = $1 AND document_key = $2";

const SET_FIELD_SQL: &str = r#"UPDATE strata_documents
    SET body = jsonb_set(body, ARRAY[$3::text], to_jsonb($4::text), true),
        updated_at = now()
    WHERE collection = $1 AND document_key = $2"#;

const UNSET_FIELD_SQL: &str = r#"UPDATE strata_documents
    SET body = body - $3::text,
        updated_at = now()
    WHERE collection = $1 AND document_key = $2"#;

const INSERT_SQL: &str =
    "INSERT INTO strata_documents (collection, document_key, body) VALUES ($1, $2, $3)";

/// Document store backed by a single PostgreSQL table.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: PgPool,
}

impl PostgresDocumentStore {
    /// Connects and, if configured, applies migrations.
    pub async fn new(config: PostgresConfig) -> Result<Self, StorageError> {
        let pool = pool::create_pool(&config).await?;

        if config.run_migrations {
            migrations::run(&pool).await?;
        }

        Ok(Self { pool })
    }

    /// Wraps an existing pool. Migrations are not run.
    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl DocumentStore for PostgresDocumentStore {
    #[instrument(skip(self))]
    async fn find_one(
        &self,
        collection: &str,
        document_key: &str,
    ) -> Result<Option<Document>, StorageError> {
        let row: Option<(Value,)> = query_as(FIND_SQL)
            .bind(collection)
            .bind(document_key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| map_query_error(e, collection, document_key))?;

        match row {
            None => Ok(None),
            Some((Value::Object(body),)) => Ok(Some(body)),
            Some((other,)) => Err(StorageError::invalid_document(format!(
                "{collection}/{document_key} body is not an object: {other}"
            ))),
        }
    }

    #[instrument(skip(self, update), fields(field = update.field()))]
    async fn update_one(
        &self,
        collection: &str,
        document_key: &str,
        update: &FieldUpdate,
    ) -> Result<(), StorageError> {
        let result = match update {
            FieldUpdate::Set { field, value } => {
                query(SET_FIELD_SQL)
                    .bind(collection)
                    .bind(document_key)
                    .bind(field.as_str())
                    .bind(value.as_str())
                    .execute(&self.pool)
                    .await
            }
            FieldUpdate::Unset { field } => {
                query(UNSET_FIELD_SQL)
                    .bind(collection)
                    .bind(document_key)
                    .bind(field.as_str())
                    .execute(&self.pool)
                    .await
            }
        }
        .map_err(|e| map_query_error(e, collection, document_key))?;

        debug!(rows = result.rows_affected(), "document field updated");
        Ok(())
    }

    #[instrument(skip(self, document))]
    async fn insert_one(&self, collection: &str, document: Document) -> Result<(), StorageError> {
        let key = document_key(&document)
            .ok_or_else(|| StorageError::invalid_document("document has no string _id"))?
            .to_string();

        query(INSERT_SQL)
            .bind(collection)
            .bind(key.as_str())
            .bind(Value::Object(document))
            .execute(&self.pool)
            .await
            .map_err(|e| map_query_error(e, collection, &key))?;

        Ok(())
    }
}
