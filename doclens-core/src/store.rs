//! Store handles owning a backend.
//!
//! - [`DocumentStore`] - Statically dispatched store over a concrete backend type
//! - [`DynDocumentStore`] - Store over a boxed [`DynStoreBackend`], for runtime backend selection
//!
//! [`IntoDynDocumentStore`] erases the backend type of a [`DocumentStore`];
//! [`DynDocumentStore::into_static`] recovers it.
//!
//! # Example
//!
//! ```ignore
//! use doclens::store::DocumentStore;
//!
//! let store = DocumentStore::new(backend);
//! let mut names = store
//!     .collection("users")
//!     .distinct::<String>("name", "")
//!     .await?;
//! ```

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    collection::{Collection, DynCollection, DynTypedCollection, TypedCollection},
    document::Document,
    error::DocumentStoreResult,
};

/// A document store bound to a specific backend implementation.
///
/// # Type Parameters
///
/// * `B` - The backend implementation type
#[derive(Debug)]
pub struct DocumentStore<B: StoreBackend> {
    backend: B,
}

impl<B: StoreBackend> DocumentStore<B> {
    /// Creates a new document store with the given backend.
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    /// Returns the backend this store runs on.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Gets a typed collection for the specified document type.
    ///
    /// The collection name is determined by the document type's `collection_name()` method.
    pub fn typed_collection<'a, D: Document>(&'a self) -> TypedCollection<'a, B, D> {
        TypedCollection::new(D::collection_name().to_string(), &self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> Collection<'a, B> {
        Collection::new(name.to_string(), &self.backend)
    }

    /// Creates a new collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection already exists or creation fails.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    /// Drops a collection with the given name.
    ///
    /// # Errors
    ///
    /// Returns an error if the collection does not exist or deletion fails.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown().await
    }
}

#[derive(Debug)]
pub struct DynDocumentStore {
    backend: Box<dyn DynStoreBackend>,
}

impl DynDocumentStore {
    /// Creates a new dynamic document store with the given backend trait object.
    pub fn new(backend: Box<dyn DynStoreBackend>) -> Self {
        Self { backend }
    }

    /// Gets a typed collection for the specified document type.
    pub fn typed_collection<'a, D: Document>(&'a self) -> DynTypedCollection<'a, D> {
        DynTypedCollection::new(D::collection_name().to_string(), &*self.backend)
    }

    /// Gets an untyped collection with the given name.
    pub fn collection<'a>(&'a self, name: &str) -> DynCollection<'a> {
        DynCollection::new(name.to_string(), &*self.backend)
    }

    /// Creates a new collection with the given name.
    pub async fn create_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend
            .create_collection(name)
            .await
    }

    /// Drops a collection with the given name.
    pub async fn drop_collection(&self, name: &str) -> DocumentStoreResult<()> {
        self.backend.drop_collection(name).await
    }

    /// Lists all collections in the store.
    pub async fn list_collections(&self) -> DocumentStoreResult<Vec<String>> {
        self.backend.list_collections().await
    }

    /// Recovers the statically typed store if the backend is a `B`.
    ///
    /// Returns `None` when the backend has another type. Check with
    /// [`is_backend`](Self::is_backend) first to keep the store in that case.
    pub fn into_static<B>(self) -> Option<DocumentStore<B>>
    where
        B: StoreBackend + 'static,
    {
        self.backend
            .into_any()
            .downcast::<B>()
            .ok()
            .map(|backend| DocumentStore::new(*backend))
    }

    /// Returns `true` if the backend is a `B`.
    pub fn is_backend<B: StoreBackend + 'static>(&self) -> bool {
        self.backend.as_any().is::<B>()
    }

    /// Shuts down the store and releases backend resources.
    pub async fn shutdown(self) -> DocumentStoreResult<()> {
        self.backend.shutdown_boxed().await
    }
}

/// Conversion into a [`DynDocumentStore`].
pub trait IntoDynDocumentStore {
    /// Converts this store into a dynamically dispatched store.
    fn into_dyn(self) -> DynDocumentStore;
}

impl<B: StoreBackend + 'static> IntoDynDocumentStore for DocumentStore<B> {
    fn into_dyn(self) -> DynDocumentStore {
        DynDocumentStore::new(Box::new(self.backend))
    }
}

impl IntoDynDocumentStore for DynDocumentStore {
    fn into_dyn(self) -> DynDocumentStore {
        self
    }
}
