use async_trait::async_trait;
use bson::{Document, Bson, Uuid};
use mongodb::{
    Client, Collection as MongoCollection,
    options::ClientOptions,
};
use doclens_core::{
    backend::{StoreBackend, StoreBackendBuilder},
    cursor::{RawValues, raw_values},
    error::{DocumentStoreError, DocumentStoreResult},
    query::QueryFilter,
};

use crate::{sanitizer::ValueSanitizer, query::MongoQueryTranslator};


fn backend_error(error: mongodb::error::Error) -> DocumentStoreError {
    DocumentStoreError::Backend(error.to_string())
}

/// MongoDB backend issuing the native `distinct` command.
///
/// Documents are stored with their id as `_id`. Keys are escaped on insert and
/// restored in distinct results; values are stored as written. Native filter
/// documents go to the server untranslated, so any operator it supports can be
/// used. See [`ValueSanitizer`].
#[derive(Debug)]
pub struct MongoDbStore {
    client: Client,
    database: String,
}

impl MongoDbStore {
    pub fn new(client: Client, database: String) -> Self {
        Self { client, database }
    }

    pub fn builder(dsn: &str, database: &str) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(dsn, database)
    }

    /// Returns the name of the database this store reads and writes.
    pub fn database(&self) -> &str {
        &self.database
    }

    fn get_collection(&self, collection_name: &str) -> MongoCollection<Document> {
        self.client
            .database(&self.database)
            .collection(&ValueSanitizer::sanitize_string(collection_name))
    }

    fn prepare_document(&self, id: &Uuid, document: &Bson) -> DocumentStoreResult<Document> {
        Ok(Document::from_iter(
            ValueSanitizer::sanitize_value(document)
                .as_document()
                .cloned()
                .ok_or_else(|| DocumentStoreError::InvalidDocument("Expected document".into()))?
                .into_iter()
                .chain(std::iter::once(("_id".to_string(), id.into()))),
        ))
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.client.shutdown().await;

        Ok(())
    }
}

#[async_trait]
impl StoreBackend for MongoDbStore {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        if documents.is_empty() {
            return Ok(());
        }

        self.get_collection(collection)
            .insert_many(
                documents
                    .iter()
                    .map(|(id, doc)| self.prepare_document(id, doc))
                    .collect::<DocumentStoreResult<Vec<Document>>>()?,
            )
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues> {
        let path = ValueSanitizer::sanitize_path(field);
        let query = MongoQueryTranslator::translate(filter.as_ref())?;

        tracing::debug!(collection, field, %query, "running distinct command");

        let values = self
            .get_collection(collection)
            .distinct(&path, query)
            .await
            .map_err(backend_error)?
            .iter()
            .map(ValueSanitizer::restore_value)
            .collect::<Vec<_>>();

        tracing::debug!(collection, field, count = values.len(), "distinct command finished");

        Ok(raw_values(values))
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.client
            .database(&self.database)
            .create_collection(&ValueSanitizer::sanitize_string(name))
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.get_collection(name)
            .drop()
            .await
            .map_err(backend_error)?;

        Ok(())
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        Ok(
            self.client
                .database(&self.database)
                .list_collection_names()
                .await
                .map_err(backend_error)?
                .iter()
                .map(|name| ValueSanitizer::restore_string(name))
                .collect()
        )
    }

    async fn shutdown(self) -> DocumentStoreResult<()> {
        self.shutdown().await
    }
}

/// Connection settings for a [`MongoDbStore`].
pub struct MongoDbStoreBuilder {
    dsn: String,
    database: String,
    app_name: Option<String>,
}

impl MongoDbStoreBuilder {
    pub fn new(dsn: &str, database: &str) -> Self {
        Self {
            dsn: dsn.to_string(),
            database: database.to_string(),
            app_name: None,
        }
    }

    /// Sets the application name reported to the server.
    pub fn app_name(mut self, app_name: &str) -> Self {
        self.app_name = Some(app_name.to_string());
        self
    }
}

#[async_trait]
impl StoreBackendBuilder for MongoDbStoreBuilder {
    type Backend = MongoDbStore;

    async fn build(self) -> DocumentStoreResult<Self::Backend> {
        let mut options = ClientOptions::parse(&self.dsn)
            .await
            .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?;

        if self.app_name.is_some() {
            options.app_name = self.app_name;
        }

        tracing::debug!(database = %self.database, "connecting to mongodb");

        Ok(MongoDbStore::new(
            Client::with_options(options)
                .map_err(|e| DocumentStoreError::Initialization(e.to_string()))?,
            self.database,
        ))
    }
}
