//! Typed documents that can be saved into a collection.
//!
//! Distinct queries read untyped values, but seeding a collection is usually done with
//! typed records. A type implementing [`Document`] knows its identifier and the collection
//! it is saved in; [`DocumentExt`] turns it into the `(id, BSON)` entry a backend stores.

use bson::{Bson, Uuid, de::deserialize_from_bson, ser::serialize_to_bson};
use serde::{Deserialize, Serialize};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// A record stored in a document collection.
///
/// # Example
///
/// ```ignore
/// use doclens::document::Document;
/// use bson::Uuid;
/// use serde::{Serialize, Deserialize};
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// pub struct User {
///     pub id: Uuid,
///     pub name: String,
///     #[serde(skip_serializing_if = "Option::is_none")]
///     pub address: Option<String>,
/// }
///
/// impl Document for User {
///     fn id(&self) -> &Uuid {
///         &self.id
///     }
///
///     fn collection_name() -> &'static str {
///         "users"
///     }
/// }
/// ```
///
/// Fields serialized as `null` are present in the stored document. Skip them during
/// serialization if `$exists` filters should treat them as missing.
pub trait Document: Serialize + for<'de> Deserialize<'de> + Send + Sync + Clone + 'static {
    /// Returns a reference to this document's unique identifier.
    fn id(&self) -> &Uuid;

    /// Returns the name of the collection this document belongs to.
    fn collection_name() -> &'static str;
}

/// BSON conversions for [`Document`] types, implemented for every document.
pub trait DocumentExt: Document {
    /// Serializes this document into a BSON value.
    fn to_bson(&self) -> DocumentStoreResult<Bson>;

    /// Deserializes a document from a BSON value.
    fn from_bson(bson: Bson) -> DocumentStoreResult<Self>;

    /// Serializes this document into the `(id, document)` entry stored by a backend.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidDocument`] if the document does not serialize
    /// into a BSON document (for example a newtype around a string).
    fn to_entry(&self) -> DocumentStoreResult<(Uuid, Bson)>;
}

impl<D: Document> DocumentExt for D {
    fn to_bson(&self) -> DocumentStoreResult<Bson> {
        Ok(serialize_to_bson(self)?)
    }

    fn from_bson(bson: Bson) -> DocumentStoreResult<Self> {
        Ok(deserialize_from_bson(bson)?)
    }

    fn to_entry(&self) -> DocumentStoreResult<(Uuid, Bson)> {
        match self.to_bson()? {
            bson @ Bson::Document(_) => Ok((*self.id(), bson)),
            other => Err(DocumentStoreError::InvalidDocument(format!(
                "{} serialized to {:?} instead of a document",
                Self::collection_name(),
                other.element_type()
            ))),
        }
    }
}
