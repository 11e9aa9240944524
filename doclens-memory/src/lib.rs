//! In-memory document storage backend for doclens.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and is ideal for development
//! and testing.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Deterministic distinct results** - Values come back in document insertion order
//! - **Dotted field paths** - Nested documents and arrays of documents are traversed
//! - **Filter evaluation** - Every filter expression operator is supported
//!
//! # Quick Start
//!
//! ```ignore
//! use doclens::{prelude::*, memory::InMemoryStore};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::new(InMemoryStore::builder().build().await?);
//!
//!     let mut names = store
//!         .collection("users")
//!         .distinct::<String>("name", "")
//!         .await?;
//!
//!     while names.has_next()? {
//!         println!("{}", names.next_value()?);
//!     }
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclens_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
