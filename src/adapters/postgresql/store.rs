//! PostgreSQL document store
//!
//! Each database is a PostgreSQL schema and each collection a table of
//! `(id UUID PRIMARY KEY, doc JSONB NOT NULL, loaded_at TIMESTAMPTZ)`. Key paths
//! become `doc #> '{a,b}'` expressions.

use super::client::PostgreSQLClient;
use crate::adapters::store::{DocumentStore, InsertedDocument, StoreConnector};
use crate::config::schema::PostgreSQLConfig;
use crate::domain::{CifdbError, Document, DocumentId, KeyPath, KeyTuple, Result, StoreError};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_postgres::types::ToSql;
use uuid::Uuid;

/// Rows per INSERT statement (two bind parameters each)
const INSERT_BATCH_ROWS: usize = 5_000;

/// Key tuples per DELETE statement
const DELETE_BATCH_KEYS: usize = 500;

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_path_segment(segment: &str) -> bool {
    !segment.is_empty()
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Validates and double-quotes an SQL identifier
fn quote_identifier(name: &str) -> Result<String> {
    if is_identifier(name) && name.len() <= 63 {
        Ok(format!("\"{name}\""))
    } else {
        Err(CifdbError::Validation(format!(
            "'{name}' is not a valid PostgreSQL identifier"
        )))
    }
}

fn qualified(database: &str, collection: &str) -> Result<String> {
    Ok(format!(
        "{}.{}",
        quote_identifier(database)?,
        quote_identifier(collection)?
    ))
}

/// Renders a key path as a JSONB path expression literal
fn path_expression(path: &KeyPath) -> Result<String> {
    if let Some(bad) = path.segments().iter().find(|s| !is_path_segment(s)) {
        return Err(CifdbError::Validation(format!(
            "Key path segment '{bad}' cannot be used in an index expression"
        )));
    }
    Ok(format!("(doc #> '{{{}}}')", path.segments().join(",")))
}

/// PostgreSQL JSONB implementation of [`DocumentStore`]
#[derive(Clone)]
pub struct PostgresStore {
    client: PostgreSQLClient,
}

impl PostgresStore {
    /// Create a new store from configuration
    ///
    /// The pool connects lazily; nothing is opened until the first call.
    pub fn new(config: PostgreSQLConfig) -> Result<Self> {
        Ok(Self {
            client: PostgreSQLClient::new(config)?,
        })
    }

    pub fn client(&self) -> &PostgreSQLClient {
        &self.client
    }

    async fn insert_batch(
        &self,
        table: &str,
        documents: &[Document],
    ) -> Result<Vec<InsertedDocument>> {
        let ids: Vec<Uuid> = documents.iter().map(|_| Uuid::new_v4()).collect();
        let values: Vec<Value> = documents.iter().cloned().map(Value::Object).collect();

        let placeholders: Vec<String> = (0..documents.len())
            .map(|i| format!("(${}, ${})", 2 * i + 1, 2 * i + 2))
            .collect();
        let statement = format!(
            "INSERT INTO {table} (id, doc) VALUES {} ON CONFLICT DO NOTHING RETURNING id, doc",
            placeholders.join(", ")
        );
        let mut params: Vec<&(dyn ToSql + Sync)> = Vec::with_capacity(documents.len() * 2);
        for (id, value) in ids.iter().zip(values.iter()) {
            params.push(id);
            params.push(value);
        }

        let rows = self
            .client
            .query(&statement, &params, StoreError::InsertFailed)
            .await?;

        let mut returned: HashMap<Uuid, Document> = HashMap::with_capacity(rows.len());
        for row in rows {
            let id: Uuid = row.get(0);
            let doc: Value = row.get(1);
            if let Value::Object(document) = doc {
                returned.insert(id, document);
            }
        }

        // RETURNING order is not guaranteed; restore input order
        Ok(ids
            .iter()
            .filter_map(|id| {
                returned.remove(id).map(|document| InsertedDocument {
                    id: DocumentId::new(id.to_string()),
                    document,
                })
            })
            .collect())
    }
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn test_connection(&self) -> Result<()> {
        self.client.test_connection().await
    }

    async fn database_exists(&self, database: &str) -> Result<bool> {
        let rows = self
            .client
            .query(
                "SELECT EXISTS(SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
                &[&database],
                StoreError::FetchFailed,
            )
            .await?;
        Ok(rows.first().map(|r| r.get::<_, bool>(0)).unwrap_or(false))
    }

    async fn collection_exists(&self, database: &str, collection: &str) -> Result<bool> {
        let rows = self
            .client
            .query(
                "SELECT EXISTS(SELECT 1 FROM information_schema.tables \
                 WHERE table_schema = $1 AND table_name = $2)",
                &[&database, &collection],
                StoreError::FetchFailed,
            )
            .await?;
        Ok(rows.first().map(|r| r.get::<_, bool>(0)).unwrap_or(false))
    }

    async fn create_collection(&self, database: &str, collection: &str) -> Result<()> {
        let sql = format!(
            "CREATE SCHEMA IF NOT EXISTS {schema}; \
             CREATE TABLE IF NOT EXISTS {table} (\
                id UUID PRIMARY KEY, \
                doc JSONB NOT NULL, \
                loaded_at TIMESTAMPTZ NOT NULL DEFAULT now())",
            schema = quote_identifier(database)?,
            table = qualified(database, collection)?,
        );
        self.client
            .batch_execute(&sql, StoreError::CollectionCreationFailed)
            .await?;
        tracing::info!(database, collection, "Created collection");
        Ok(())
    }

    async fn drop_collection(&self, database: &str, collection: &str) -> Result<()> {
        let sql = format!("DROP TABLE IF EXISTS {}", qualified(database, collection)?);
        self.client
            .batch_execute(&sql, StoreError::CollectionDropFailed)
            .await?;
        tracing::info!(database, collection, "Dropped collection");
        Ok(())
    }

    async fn create_index(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        unique: bool,
    ) -> Result<()> {
        if key_paths.is_empty() {
            return Ok(());
        }
        let expressions = key_paths
            .iter()
            .map(path_expression)
            .collect::<Result<Vec<_>>>()?;
        let suffix = if unique { "key_uidx" } else { "key_idx" };
        let index_name: String = format!("{collection}_{suffix}").chars().take(63).collect();

        let sql = format!(
            "CREATE {unique}INDEX IF NOT EXISTS {name} ON {table} ({columns})",
            unique = if unique { "UNIQUE " } else { "" },
            name = quote_identifier(&index_name)?,
            table = qualified(database, collection)?,
            columns = expressions.join(", "),
        );
        self.client
            .batch_execute(&sql, StoreError::IndexCreationFailed)
            .await?;
        tracing::info!(database, collection, unique, index = %index_name, "Created index");
        Ok(())
    }

    async fn insert_many(
        &self,
        database: &str,
        collection: &str,
        documents: &[Document],
    ) -> Result<Vec<InsertedDocument>> {
        let table = qualified(database, collection)?;
        let mut inserted = Vec::with_capacity(documents.len());
        for batch in documents.chunks(INSERT_BATCH_ROWS) {
            inserted.extend(self.insert_batch(&table, batch).await?);
        }
        tracing::debug!(
            database,
            collection,
            requested = documents.len(),
            inserted = inserted.len(),
            "Inserted documents"
        );
        Ok(inserted)
    }

    async fn delete_many(
        &self,
        database: &str,
        collection: &str,
        key_paths: &[KeyPath],
        keys: &[KeyTuple],
    ) -> Result<u64> {
        if key_paths.is_empty() || keys.is_empty() {
            return Ok(0);
        }
        let table = qualified(database, collection)?;
        let paths: Vec<Vec<String>> = key_paths.iter().map(|p| p.segments().to_vec()).collect();

        let mut deleted = 0;
        for batch in keys.chunks(DELETE_BATCH_KEYS) {
            let mut params: Vec<&(dyn ToSql + Sync)> = paths
                .iter()
                .map(|p| p as &(dyn ToSql + Sync))
                .collect();
            let mut groups = Vec::with_capacity(batch.len());
            for key in batch {
                let mut terms = Vec::with_capacity(paths.len());
                for (position, component) in key.components().iter().enumerate() {
                    match component {
                        Some(value) => {
                            params.push(value);
                            terms.push(format!("doc #> ${} = ${}", position + 1, params.len()));
                        }
                        None => terms.push(format!("doc #> ${} IS NULL", position + 1)),
                    }
                }
                groups.push(format!("({})", terms.join(" AND ")));
            }

            let statement = format!("DELETE FROM {table} WHERE {}", groups.join(" OR "));
            deleted += self
                .client
                .execute(&statement, &params, StoreError::DeleteFailed)
                .await?;
        }
        tracing::debug!(database, collection, deleted, "Deleted documents by key");
        Ok(deleted)
    }

    async fn fetch_one(
        &self,
        database: &str,
        collection: &str,
        id: &DocumentId,
    ) -> Result<Option<Document>> {
        let uuid = Uuid::parse_str(id.as_str())
            .map_err(|e| StoreError::FetchFailed(format!("Invalid document id '{id}': {e}")))?;
        let statement = format!(
            "SELECT doc FROM {} WHERE id = $1",
            qualified(database, collection)?
        );
        let rows = self
            .client
            .query(&statement, &[&uuid], StoreError::FetchFailed)
            .await?;
        Ok(rows.first().and_then(|row| match row.get::<_, Value>(0) {
            Value::Object(document) => Some(document),
            _ => None,
        }))
    }

    async fn count(&self, database: &str, collection: &str) -> Result<u64> {
        let statement = format!("SELECT count(*) FROM {}", qualified(database, collection)?);
        let rows = self
            .client
            .query(&statement, &[], StoreError::FetchFailed)
            .await?;
        Ok(rows
            .first()
            .map(|r| r.get::<_, i64>(0).max(0) as u64)
            .unwrap_or(0))
    }
}

#[async_trait]
impl StoreConnector for PostgresStore {
    async fn connect(&self) -> Result<Arc<dyn DocumentStore>> {
        // Handles share the pool; each call checks out its own connection
        Ok(Arc::new(self.clone()))
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe()
    }
}
