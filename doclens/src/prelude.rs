//! Convenient re-exports of commonly used types from doclens.
//!
//! ```ignore
//! use doclens::prelude::*;
//! ```
//!
//! This provides access to:
//! - Stores, collections and backend traits
//! - Filters and the distinct iterator
//! - Conversion traits and the `FromRawValue` derive
//! - Error types

pub use doclens_core::{
    collection::{Collection, DynCollection, TypedCollection, DynTypedCollection},
    store::{DocumentStore, DynDocumentStore, IntoDynDocumentStore},
    document::{Document, DocumentExt},
    backend::{StoreBackend, DynStoreBackend, StoreBackendBuilder},
    query::{DistinctFilter, Expr, FieldOp, Filter, QueryFilter, QueryVisitor},
    cursor::DistinctIterator,
    convert::{Compound, FromRawValue, SerdeValue, TargetType, ValueConverter},
    value::{RawMap, RawValue},
    error::{ConversionError, DocumentStoreError, DocumentStoreResult},
};
pub use doclens_macros::FromRawValue;
