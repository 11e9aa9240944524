//! MongoDB backend implementation for doclens.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Distinct queries run as MongoDB's native `distinct` command, with filters
//! translated into MongoDB query documents.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! doclens = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Example
//!
//! ```ignore
//! use doclens::{prelude::*, mongodb::MongoDbStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let backend = MongoDbStore::builder("mongodb://localhost:27017", "my_database")
//!         .app_name("distinct-report")
//!         .build()
//!         .await?;
//!     let store = DocumentStore::new(backend);
//!
//!     let lats = store
//!         .collection("pois")
//!         .distinct::<i32>("coordinate.lat", "")
//!         .await?
//!         .collect::<DocumentStoreResult<Vec<_>>>()?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclens_mongodb;

pub mod store;
pub mod query;
pub mod sanitizer;

pub use store::{MongoDbStore, MongoDbStoreBuilder};
