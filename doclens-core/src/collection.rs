//! Collection handles that issue distinct queries.
//!
//! A collection handle pairs a collection name with a backend reference. Both the
//! statically and the dynamically dispatched stores hand out two flavors of handle:
//!
//! - [`Collection`] / [`DynCollection`] - Untyped handles, seeded with explicit BSON documents
//! - [`TypedCollection`] / [`DynTypedCollection`] - Handles bound to a [`Document`] type
//!
//! Every handle exposes `distinct::<T>(field, filter)`, which runs the distinct command on the
//! backend and returns a [`DistinctIterator`] converting each raw value into `T`. The target
//! type `T` is independent of the collection's document type.
//!
//! # Example
//!
//! ```ignore
//! use doclens::prelude::*;
//!
//! #[derive(Debug, Default, FromRawValue)]
//! pub struct Coordinate {
//!     pub lat: i32,
//!     pub lon: i32,
//! }
//!
//! let users = store.typed_collection::<User>();
//! users.insert(vec![user]).await?;
//!
//! let mut coordinates = users
//!     .distinct::<Coordinate>("coordinate", r#"{"address": {"$exists": true}}"#)
//!     .await?;
//! while coordinates.has_next()? {
//!     let coordinate = coordinates.next_value()?;
//! }
//! ```

use bson::{Bson, Uuid};
use std::marker::PhantomData;

use crate::{
    backend::{DynStoreBackend, StoreBackend},
    convert::FromRawValue,
    cursor::DistinctIterator,
    document::{Document, DocumentExt},
    error::DocumentStoreResult,
    query::{DistinctFilter, QueryFilter},
};

/// Resolves the caller's filter and records the request.
fn prepare<T: FromRawValue>(
    collection: &str,
    field: &str,
    filter: DistinctFilter,
) -> DocumentStoreResult<Option<QueryFilter>> {
    let filter = filter.resolve()?;

    tracing::debug!(
        collection,
        field,
        filtered = filter.is_some(),
        target = %T::target_type(),
        "issuing distinct request"
    );

    Ok(filter)
}

fn entries<D: Document>(documents: Vec<D>) -> DocumentStoreResult<Vec<(Uuid, Bson)>> {
    documents
        .iter()
        .map(DocumentExt::to_entry)
        .collect()
}

/// An untyped collection with a reference to a storage backend.
///
/// # Type Parameters
///
/// * `'a` - Lifetime of the backend reference
/// * `B` - The storage backend type
#[derive(Debug)]
pub struct Collection<'a, B: StoreBackend> {
    name: String,
    backend: &'a B,
}

impl<'a, B: StoreBackend> Collection<'a, B> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts documents into the collection.
    ///
    /// # Arguments
    ///
    /// * `documents` - A vector of (ID, BSON document) pairs to insert
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if the operation fails.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, self.name())
            .await
    }

    /// Runs a distinct query for `field` and returns its values typed as `T`.
    ///
    /// # Arguments
    ///
    /// * `field` - The field path, possibly dotted
    /// * `filter` - Anything convertible into a [`DistinctFilter`]: `""`, filter text,
    ///   a native filter document or an [`Expr`](crate::query::Expr)
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::InvalidFilter`](crate::error::DocumentStoreError::InvalidFilter)
    ///   if the filter text cannot be parsed, or the backend cannot run the filter.
    /// - [`DocumentStoreError::Backend`](crate::error::DocumentStoreError::Backend) if the
    ///   distinct command fails.
    ///
    /// Conversion failures are reported per element by the returned iterator.
    pub async fn distinct<T: FromRawValue>(
        &self,
        field: &str,
        filter: impl Into<DistinctFilter>,
    ) -> DocumentStoreResult<DistinctIterator<T>> {
        let filter = prepare::<T>(self.name(), field, filter.into())?;
        let values = self
            .backend
            .distinct_values(field, filter, self.name())
            .await?;

        Ok(DistinctIterator::new(field, values))
    }
}

/// A collection handle over a dynamically dispatched backend.
///
/// Behaves exactly like [`Collection`].
#[derive(Debug)]
pub struct DynCollection<'a> {
    name: String,
    backend: &'a dyn DynStoreBackend,
}

impl<'a> DynCollection<'a> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts documents into the collection.
    pub async fn insert(&self, documents: Vec<(Uuid, Bson)>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(documents, self.name())
            .await
    }

    /// Runs a distinct query for `field` and returns its values typed as `T`.
    ///
    /// See [`Collection::distinct`].
    pub async fn distinct<T: FromRawValue>(
        &self,
        field: &str,
        filter: impl Into<DistinctFilter>,
    ) -> DocumentStoreResult<DistinctIterator<T>> {
        let filter = prepare::<T>(self.name(), field, filter.into())?;
        let values = self
            .backend
            .distinct_values(field, filter, self.name())
            .await?;

        Ok(DistinctIterator::new(field, values))
    }
}

/// A collection handle bound to the document type `D`.
///
/// The collection name comes from [`Document::collection_name`].
#[derive(Debug)]
pub struct TypedCollection<'a, B: StoreBackend, D: Document> {
    name: String,
    backend: &'a B,
    _marker: PhantomData<D>,
}

impl<'a, B: StoreBackend, D: Document> TypedCollection<'a, B, D> {
    pub(crate) fn new(name: String, backend: &'a B) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rebinds this handle to a different document type for the same collection.
    pub fn with_type<T: Document>(&self) -> TypedCollection<'a, B, T> {
        TypedCollection {
            name: self.name.clone(),
            backend: self.backend,
            _marker: PhantomData,
        }
    }

    /// Serializes and inserts documents into the collection.
    ///
    /// # Errors
    ///
    /// Returns a [`DocumentStoreError`](crate::error::DocumentStoreError) if serialization or insertion fails.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(entries(documents)?, self.name())
            .await
    }

    /// Runs a distinct query for `field` and returns its values typed as `T`.
    ///
    /// See [`Collection::distinct`].
    pub async fn distinct<T: FromRawValue>(
        &self,
        field: &str,
        filter: impl Into<DistinctFilter>,
    ) -> DocumentStoreResult<DistinctIterator<T>> {
        let filter = prepare::<T>(self.name(), field, filter.into())?;
        let values = self
            .backend
            .distinct_values(field, filter, self.name())
            .await?;

        Ok(DistinctIterator::new(field, values))
    }
}

#[derive(Debug)]
pub struct DynTypedCollection<'a, D: Document> {
    name: String,
    backend: &'a dyn DynStoreBackend,
    _marker: PhantomData<D>,
}

impl<'a, D: Document> DynTypedCollection<'a, D> {
    pub(crate) fn new(name: String, backend: &'a dyn DynStoreBackend) -> Self {
        Self { name, backend, _marker: PhantomData }
    }

    /// Returns the name of this collection.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Rebinds this handle to a different document type for the same collection.
    pub fn with_type<T: Document>(&self) -> DynTypedCollection<'a, T> {
        DynTypedCollection {
            name: self.name.clone(),
            backend: self.backend,
            _marker: PhantomData,
        }
    }

    /// Serializes and inserts documents into the collection.
    pub async fn insert(&self, documents: Vec<D>) -> DocumentStoreResult<()> {
        self.backend
            .insert_documents(entries(documents)?, self.name())
            .await
    }

    /// Runs a distinct query for `field` and returns its values typed as `T`.
    ///
    /// See [`Collection::distinct`].
    pub async fn distinct<T: FromRawValue>(
        &self,
        field: &str,
        filter: impl Into<DistinctFilter>,
    ) -> DocumentStoreResult<DistinctIterator<T>> {
        let filter = prepare::<T>(self.name(), field, filter.into())?;
        let values = self
            .backend
            .distinct_values(field, filter, self.name())
            .await?;

        Ok(DistinctIterator::new(field, values))
    }
}
