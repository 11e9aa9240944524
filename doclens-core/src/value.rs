//! Untyped raw values as delivered by a document store.
//!
//! A [`RawValue`] is the schema-less representation of a stored value before any
//! language-level typing is applied. Nested documents are modeled as a [`RawMap`], an
//! ordered sequence of `(key, value)` pairs: key order is kept exactly as stored and
//! duplicate keys are not collapsed.

use bson::{Bson, Document};
use std::fmt;

use crate::error::ConversionError;

/// An untyped value returned by a store.
#[derive(Debug, Clone, PartialEq)]
pub enum RawValue {
    Null,
    Bool(bool),
    Int32(i32),
    Int64(i64),
    Double(f64),
    String(String),
    /// A nested document.
    Map(RawMap),
    Array(Vec<RawValue>),
}

impl RawValue {
    /// Returns a short name for the kind of this value, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            RawValue::Null => "null",
            RawValue::Bool(_) => "boolean",
            RawValue::Int32(_) => "int32",
            RawValue::Int64(_) => "int64",
            RawValue::Double(_) => "double",
            RawValue::String(_) => "string",
            RawValue::Map(_) => "field-mapping",
            RawValue::Array(_) => "array",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, RawValue::Null)
    }

    pub fn as_map(&self) -> Option<&RawMap> {
        match self {
            RawValue::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            RawValue::String(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", Bson::from(self.clone()))
    }
}

/// An ordered field-mapping, the raw form of a nested document.
///
/// Unlike [`bson::Document`], inserting a key that is already present appends a second
/// entry instead of replacing the first one.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawMap {
    entries: Vec<(String, RawValue)>,
}

impl RawMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry, keeping any earlier entry with the same key.
    pub fn push(&mut self, key: impl Into<String>, value: RawValue) {
        self.entries.push((key.into(), value));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the value of the last entry with the given key.
    pub fn get(&self, key: &str) -> Option<&RawValue> {
        self.entries
            .iter()
            .rev()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Removes every entry with the given key and returns the value of the last one.
    pub fn take(&mut self, key: &str) -> Option<RawValue> {
        let mut found = None;

        self.entries.retain_mut(|(k, v)| {
            if k == key {
                found = Some(std::mem::replace(v, RawValue::Null));
                false
            } else {
                true
            }
        });

        found
    }

    /// Returns the entry at the given position, in stored order.
    pub fn entry(&self, position: usize) -> Option<(&str, &RawValue)> {
        self.entries
            .get(position)
            .map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RawValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Consumes the map, returning its values in stored order.
    pub fn into_values(self) -> Vec<RawValue> {
        self.entries
            .into_iter()
            .map(|(_, v)| v)
            .collect()
    }
}

impl IntoIterator for RawMap {
    type Item = (String, RawValue);
    type IntoIter = std::vec::IntoIter<(String, RawValue)>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

impl<K: Into<String>> FromIterator<(K, RawValue)> for RawMap {
    fn from_iter<I: IntoIterator<Item = (K, RawValue)>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v))
                .collect(),
        }
    }
}

impl TryFrom<Document> for RawMap {
    type Error = ConversionError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        document
            .into_iter()
            .map(|(k, v)| RawValue::try_from(v).map(|v| (k, v)))
            .collect()
    }
}

impl TryFrom<Bson> for RawValue {
    type Error = ConversionError;

    fn try_from(bson: Bson) -> Result<Self, Self::Error> {
        Ok(match bson {
            Bson::Null | Bson::Undefined => RawValue::Null,
            Bson::Boolean(value) => RawValue::Bool(value),
            Bson::Int32(value) => RawValue::Int32(value),
            Bson::Int64(value) => RawValue::Int64(value),
            Bson::Double(value) => RawValue::Double(value),
            Bson::String(value) => RawValue::String(value),
            Bson::Symbol(value) => RawValue::String(value),
            Bson::ObjectId(oid) => RawValue::String(oid.to_hex()),
            Bson::DateTime(dt) => RawValue::Int64(dt.timestamp_millis()),
            Bson::Decimal128(dec) => RawValue::String(dec.to_string()),
            Bson::Document(doc) => RawValue::Map(RawMap::try_from(doc)?),
            Bson::Array(arr) => RawValue::Array(
                arr
                    .into_iter()
                    .map(RawValue::try_from)
                    .collect::<Result<Vec<_>, _>>()?,
            ),
            other => {
                return Err(ConversionError::Unsupported(format!(
                    "{:?}",
                    other.element_type()
                )));
            }
        })
    }
}

impl From<RawValue> for Bson {
    fn from(value: RawValue) -> Self {
        match value {
            RawValue::Null => Bson::Null,
            RawValue::Bool(value) => Bson::Boolean(value),
            RawValue::Int32(value) => Bson::Int32(value),
            RawValue::Int64(value) => Bson::Int64(value),
            RawValue::Double(value) => Bson::Double(value),
            RawValue::String(value) => Bson::String(value),
            // Duplicate keys collapse here: the last entry wins.
            RawValue::Map(map) => Bson::Document(
                map
                    .into_iter()
                    .map(|(k, v)| (k, Bson::from(v)))
                    .collect::<Document>(),
            ),
            RawValue::Array(arr) => Bson::Array(
                arr
                    .into_iter()
                    .map(Bson::from)
                    .collect(),
            ),
        }
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<i32> for RawValue {
    fn from(value: i32) -> Self {
        RawValue::Int32(value)
    }
}

impl From<i64> for RawValue {
    fn from(value: i64) -> Self {
        RawValue::Int64(value)
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Double(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::String(value.to_string())
    }
}

impl From<String> for RawValue {
    fn from(value: String) -> Self {
        RawValue::String(value)
    }
}

impl From<RawMap> for RawValue {
    fn from(value: RawMap) -> Self {
        RawValue::Map(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bson::{doc, oid::ObjectId, Binary, spec::BinarySubtype};

    #[test]
    fn document_keys_keep_stored_order() {
        let raw =
            RawValue::try_from(Bson::Document(doc! { "lng": 2, "lat": 1, "alt": 0.5 })).unwrap();
        let map = raw.as_map().unwrap();

        assert_eq!(map.keys().collect::<Vec<_>>(), vec!["lng", "lat", "alt"]);
        assert_eq!(map.get("lat"), Some(&RawValue::Int32(1)));
    }

    #[test]
    fn duplicate_keys_are_preserved_and_last_wins_on_lookup() {
        let mut map = RawMap::new();
        map.push("a", RawValue::Int32(1));
        map.push("b", RawValue::Int32(2));
        map.push("a", RawValue::Int32(3));

        assert_eq!(map.len(), 3);
        assert_eq!(map.get("a"), Some(&RawValue::Int32(3)));
        assert_eq!(map.entry(0), Some(("a", &RawValue::Int32(1))));

        assert_eq!(map.take("a"), Some(RawValue::Int32(3)));
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), None);
    }

    #[test]
    fn nested_arrays_and_documents_convert() {
        let raw = RawValue::try_from(Bson::Array(vec![
            Bson::Null,
            Bson::Document(doc! { "tags": ["x", "y"] }),
        ]))
        .unwrap();

        let expected = RawValue::Array(vec![
            RawValue::Null,
            RawValue::Map(RawMap::from_iter([(
                "tags",
                RawValue::Array(vec!["x".into(), "y".into()]),
            )])),
        ]);

        assert_eq!(raw, expected);
    }

    #[test]
    fn object_id_becomes_hex_string() {
        let oid = ObjectId::new();
        let raw = RawValue::try_from(Bson::ObjectId(oid)).unwrap();

        assert_eq!(raw, RawValue::String(oid.to_hex()));
    }

    #[test]
    fn binary_is_unsupported() {
        let err = RawValue::try_from(Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: vec![1, 2, 3],
        }))
        .unwrap_err();

        assert!(matches!(err, ConversionError::Unsupported(_)));
    }

    #[test]
    fn converts_back_to_bson() {
        let map = RawMap::from_iter([("lat", RawValue::Int32(1)), ("lng", RawValue::Int64(2))]);

        assert_eq!(
            Bson::from(RawValue::Map(map)),
            Bson::Document(doc! { "lat": 1, "lng": 2_i64 })
        );
    }
}
