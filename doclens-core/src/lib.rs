//! Typed distinct-value queries over document stores.
//!
//! A distinct query returns the unique values of one field across a collection,
//! optionally restricted by a filter. This crate turns the untyped values a store
//! returns into a lazily consumed sequence of typed values:
//!
//! - **Raw value model** ([`value`]) - The untyped values a store returns, with ordered maps
//! - **Value conversion** ([`convert`]) - Scalar coercion and compound attribute mapping
//! - **Distinct iterator** ([`cursor`]) - The lazy, forward-only sequence of typed values
//! - **Filters** ([`query`]) - The filter expression AST and native filter translation
//! - **Store backend abstraction** ([`backend`]) - The distinct command every backend implements
//! - **Collections and stores** ([`collection`], [`store`]) - The caller-facing handles
//! - **Documents** ([`document`]) - Typed records used to seed collections
//! - **Error handling** ([`error`]) - Store and conversion errors
//!
//! # Example
//!
//! ```ignore
//! use doclens::prelude::*;
//!
//! let mut addresses = store
//!     .collection("users")
//!     .distinct::<String>("address", "")
//!     .await?;
//!
//! while addresses.has_next()? {
//!     println!("{}", addresses.next_value()?);
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as doclens_core;

pub mod backend;
pub mod collection;
pub mod convert;
pub mod cursor;
pub mod document;
pub mod error;
pub mod query;
pub mod store;
pub mod value;
