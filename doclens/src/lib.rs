//! Typed distinct-value queries over document stores.
//!
//! This crate is the primary entry point of the doclens project. It re-exports the core
//! types, the `FromRawValue` derive macro and the storage backends.
//!
//! A distinct query returns the unique values of one field across a collection,
//! optionally restricted by a filter. doclens converts each returned value into a
//! requested Rust type and hands the results out through a lazy, forward-only iterator.
//!
//! # Quick Start
//!
//! ```ignore
//! use doclens::{prelude::*, memory::InMemoryStore};
//! use bson::Uuid;
//! use serde::{Serialize, Deserialize};
//!
//! #[derive(Debug, Default, Clone, Serialize, Deserialize, FromRawValue)]
//! pub struct Coordinate {
//!     pub lat: i32,
//!     pub lon: i32,
//! }
//!
//! #[derive(Debug, Clone, Serialize, Deserialize)]
//! pub struct Poi {
//!     pub id: Uuid,
//!     #[serde(skip_serializing_if = "Option::is_none")]
//!     pub address: Option<String>,
//!     pub coordinate: Coordinate,
//! }
//!
//! impl Document for Poi {
//!     fn id(&self) -> &Uuid { &self.id }
//!     fn collection_name() -> &'static str { "pois" }
//! }
//!
//! #[tokio::main]
//! async fn main() -> DocumentStoreResult<()> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!     let pois = store.typed_collection::<Poi>();
//!
//!     pois.insert(vec![/* ... */]).await?;
//!
//!     // Scalar targets
//!     let mut lats = pois.distinct::<i32>("coordinate.lat", "").await?;
//!     while lats.has_next()? {
//!         println!("{}", lats.next_value()?);
//!     }
//!
//!     // Compound targets, with a filter
//!     let coordinates = pois
//!         .distinct::<Coordinate>("coordinate", r#"{"address": {"$exists": true}}"#)
//!         .await?
//!         .collect::<DocumentStoreResult<Vec<_>>>()?;
//!
//!     store.shutdown().await
//! }
//! ```
//!
//! # Filters
//!
//! The filter argument accepts anything convertible into a [`query::DistinctFilter`]:
//! an empty string for no restriction, filter text in JSON or the shell's relaxed form
//! (`{address:{$exists:true}}`), a native `bson::Document` or a structured [`query::Expr`]
//! built with [`query::Filter`]. Native filters reach the backend untranslated, so the
//! MongoDB backend accepts every operator the server does.
//!
//! # Dynamic Dispatch
//!
//! A `DocumentStore` can be converted into a dynamically dispatched store with
//! `into_dyn`, for runtime backend selection. Its collections offer the same
//! `distinct` operation.
//!
//! # Backends
//!
//! - [`memory`] - In-memory storage for development and testing
//! - `mongodb` - Persistent MongoDB backend (requires the `mongodb` feature)

#[allow(unused_extern_crates)]
extern crate self as doclens;

pub mod prelude;

pub use doclens_core::{backend, collection, convert, cursor, document, error, query, store, value};
pub use doclens_macros::FromRawValue;

// Re-export BSON types for convenience
pub use bson;

/// In-memory storage backend implementations.
pub mod memory {
    pub use doclens_memory::{InMemoryStore, InMemoryStoreBuilder};
}

/// MongoDB storage backend implementations.
///
/// This module is only available when the `mongodb` feature is enabled.
#[cfg(feature = "mongodb")]
pub mod mongodb {
    pub use doclens_mongodb::{MongoDbStore, MongoDbStoreBuilder};
}
