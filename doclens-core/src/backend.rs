//! Storage backend abstraction for distinct queries.
//!
//! This module defines the traits that abstract over different storage implementations,
//! allowing distinct queries to run against any backend (in-memory, MongoDB, ...).
//!
//! # Overview
//!
//! The [`StoreBackend`] trait is the raw result source of this crate: its
//! [`distinct_values`](StoreBackend::distinct_values) operation executes a distinct command
//! and returns the untyped values exactly as the store produced them. Typing happens later,
//! in [`DistinctIterator`](crate::cursor::DistinctIterator).
//!
//! Besides the distinct command, backends expose the small amount of collection management
//! needed to seed and tear down the data a distinct query reads.
//!
//! # Traits
//!
//! - [`StoreBackend`]: The core trait for storage backends
//! - [`DynStoreBackend`]: A trait for dynamic dispatch over backend implementations
//! - [`StoreBackendBuilder`]: Factory trait for creating backend instances
//!
//! # Examples
//!
//! ```ignore
//! use doclens::backend::StoreBackend;
//! use bson::{Uuid, Bson, doc};
//!
//! let backend = MyBackendImpl::new();
//!
//! let doc = Bson::Document(doc! { "name": "John", "address": "22 Wall Street Avenue" });
//! backend.insert_documents(vec![(Uuid::new(), doc)], "users").await?;
//!
//! let values = backend.distinct_values("address", None, "users").await?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use async_trait::async_trait;
use bson::{Bson, Uuid};
use std::{any::Any, fmt::Debug};

use crate::{cursor::RawValues, error::DocumentStoreResult, query::QueryFilter};

/// Abstract interface for document storage backends.
///
/// # Thread Safety
///
/// All implementations must be thread-safe and support concurrent access from multiple
/// async tasks. The concurrency model is implementation-specific.
///
/// # Error Handling
///
/// Failures of the underlying store are reported as
/// [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend), both when a
/// command is issued and while its results are read.
#[async_trait]
pub trait StoreBackend: Send + Sync + Debug {
    /// Inserts new documents into a collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (UUID, BSON document) pairs to insert
    /// * `collection` - The name of the collection to insert into. Created automatically if it doesn't exist.
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;

    /// Executes a distinct command.
    ///
    /// Returns the unique values found for `field` across the documents of `collection`
    /// that match `filter` (all documents when `filter` is `None`). Values are returned in
    /// the order the store produces them, already free of duplicates. Documents that lack
    /// the field contribute nothing; array values contribute each of their elements.
    ///
    /// # Arguments
    ///
    /// * `field` - The field path, possibly dotted (`coordinate.lat`)
    /// * `filter` - An optional filter restricting the documents. Native filter documents
    ///   reach the backend untouched; backends that cannot run them directly translate them
    ///   with [`QueryFilter::to_expr`].
    /// * `collection` - The name of the collection to query. A missing collection yields no values.
    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues>;

    /// Creates a new, empty collection with the specified name.
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Drops a collection and all its documents.
    ///
    /// This operation is irreversible.
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;

    /// Lists the names of all collections in the store.
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;

    /// Cleanly shuts down the backend, releasing all resources.
    ///
    /// The default implementation is a no-op; backends holding connections override it.
    async fn shutdown(self) -> DocumentStoreResult<()>
    where
        Self: Sized,
    {
        Ok(())
    }
}

#[async_trait]
impl<B> StoreBackend for &B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (*self)
            .insert_documents(documents, collection)
            .await
    }

    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues> {
        (*self)
            .distinct_values(field, filter, collection)
            .await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (*self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (*self).list_collections().await
    }
}

#[async_trait]
impl<B> StoreBackend for &mut B
where
    B: StoreBackend,
{
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        (**self)
            .insert_documents(documents, collection)
            .await
    }

    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues> {
        (**self)
            .distinct_values(field, filter, collection)
            .await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).create_collection(name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        (**self).drop_collection(name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        (**self).list_collections().await
    }
}

/// Object-safe mirror of [`StoreBackend`], used by the dynamically dispatched store.
#[async_trait]
pub trait DynStoreBackend: Send + Sync + Debug {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()>;
    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues>;
    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()>;
    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>>;
    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()>;

    fn as_any(&self) -> &dyn Any;
    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

#[async_trait]
impl<B: StoreBackend + Send + Sync + 'static> DynStoreBackend for B {
    async fn insert_documents(
        &self,
        documents: Vec<(Uuid, Bson)>,
        collection: &str,
    ) -> DocumentStoreResult<()> {
        StoreBackend::insert_documents(self, documents, collection).await
    }

    async fn distinct_values(
        &self,
        field: &str,
        filter: Option<QueryFilter>,
        collection: &str,
    ) -> DocumentStoreResult<RawValues> {
        StoreBackend::distinct_values(self, field, filter, collection).await
    }

    async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::create_collection(self, name).await
    }

    async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        StoreBackend::drop_collection(self, name).await
    }

    async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        StoreBackend::list_collections(self).await
    }

    async fn shutdown_boxed(self: Box<Self>) -> DocumentStoreResult<()> {
        StoreBackend::shutdown(*self).await
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Factory for backend instances, implemented by each backend's builder.
#[async_trait]
pub trait StoreBackendBuilder {
    type Backend: StoreBackend;

    async fn build(self) -> DocumentStoreResult<Self::Backend>;
}
