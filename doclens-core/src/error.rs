//! Error types and result types for document store operations.
//!
//! This module provides error handling for all store operations and for the typed
//! conversion of raw values. Use [`DocumentStoreResult<T>`] as the return type for
//! fallible operations.

use bson::error::Error as BsonError;
use serde_json::Error as SerdeJsonError;
use thiserror::Error;

/// Represents all possible errors that can occur when interacting with a document store.
///
/// This enum covers serialization errors, collection management, backend failures and
/// the errors raised while traversing a typed distinct result.
#[derive(Error, Debug)]
pub enum DocumentStoreError {
    /// Serialization/deserialization error when converting between document formats (BSON, JSON).
    #[error("Serialization error: {0}")]
    Serialization(String),
    /// Error during store initialization or connection setup.
    #[error("Initialization error: {0}")]
    Initialization(String),
    /// A document with the given ID already exists in the collection.
    /// The first argument is the document ID, the second is the collection name.
    #[error("Document {0} already exists in collection {1}")]
    DocumentAlreadyExists(String, String),
    /// The requested collection does not exist in the store.
    #[error("Collection not found: {0}")]
    CollectionNotFound(String),
    /// The document violates schema constraints or has invalid structure.
    #[error("Invalid document: {0}")]
    InvalidDocument(String),
    /// The filter could not be translated into a filter expression.
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// An error occurred in the underlying storage backend, either while executing
    /// a command or while continuing to read its results.
    #[error("Backend error: {0}")]
    Backend(String),
    /// A raw value could not be converted into the requested target type.
    ///
    /// `position` is the zero-based index of the raw value in the result sequence.
    #[error("Conversion error at position {position}: {source}")]
    Conversion {
        position: usize,
        #[source]
        source: ConversionError,
    },
    /// A value was requested from a result sequence that has no more elements.
    #[error("No such element: the result sequence is exhausted")]
    NoSuchElement,
    /// An unknown error occurred.
    #[error("Unknown error: {0}")]
    Unknown(String),
}

/// A specialized `Result` type for document store operations.
///
/// This type alias is used throughout the crate to indicate operations that may fail
/// with a [`DocumentStoreError`].
pub type DocumentStoreResult<T> = Result<T, DocumentStoreError>;

impl From<BsonError> for DocumentStoreError {
    fn from(err: BsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

impl From<SerdeJsonError> for DocumentStoreError {
    fn from(err: SerdeJsonError) -> Self {
        DocumentStoreError::Serialization(err.to_string())
    }
}

/// Describes why a single raw value could not be converted into a target type.
///
/// Conversion errors are never recovered from internally; they carry enough context
/// (the offending kinds, the attribute path) to diagnose the stored data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConversionError {
    /// The raw value has a shape that cannot be used for the target.
    #[error("expected {expected}, found {found}")]
    TypeMismatch {
        expected: String,
        found: &'static str,
    },
    /// A numeric value does not fit into the target type.
    #[error("value {value} does not fit into {target}")]
    Overflow {
        value: String,
        target: &'static str,
    },
    /// A null raw value was given to a target that has no null representative.
    #[error("unexpected null for {expected}")]
    UnexpectedNull { expected: String },
    /// A required attribute is absent from the raw field-mapping.
    #[error("missing required attribute `{attribute}` of {type_name}")]
    MissingAttribute {
        type_name: &'static str,
        attribute: String,
    },
    /// Converting a named attribute failed.
    #[error("attribute `{attribute}`: {source}")]
    Attribute {
        attribute: String,
        #[source]
        source: Box<ConversionError>,
    },
    /// Converting an element of a sequence failed.
    #[error("element {index}: {source}")]
    Element {
        index: usize,
        #[source]
        source: Box<ConversionError>,
    },
    /// The store delivered a value kind this crate does not model.
    #[error("unsupported raw value: {0}")]
    Unsupported(String),
    /// A serde based target rejected the value.
    #[error("deserialization failed: {0}")]
    Deserialize(String),
}

impl ConversionError {
    pub(crate) fn mismatch(expected: impl ToString, found: &'static str) -> Self {
        ConversionError::TypeMismatch {
            expected: expected.to_string(),
            found,
        }
    }

    pub(crate) fn overflow(value: impl ToString, target: &'static str) -> Self {
        ConversionError::Overflow {
            value: value.to_string(),
            target,
        }
    }

    /// Wraps this error with the name of the attribute it occurred in.
    pub fn within(self, attribute: impl Into<String>) -> Self {
        ConversionError::Attribute {
            attribute: attribute.into(),
            source: Box::new(self),
        }
    }

    /// Tags this error with the position of the raw value it occurred at.
    pub fn at(self, position: usize) -> DocumentStoreError {
        DocumentStoreError::Conversion { position, source: self }
    }
}
