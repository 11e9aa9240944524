//! Conversion of untyped raw values into statically typed values.
//!
//! Every type that can be produced from a [`RawValue`] implements [`FromRawValue`] and
//! describes its shape with a [`TargetType`]:
//!
//! - [`TargetType::Scalar`] - strings, booleans, integers, floats and pass-through values.
//!   The raw value is used directly when its kind matches, or coerced (numeric widening,
//!   checked narrowing). Unrelated kinds are never coerced into each other.
//! - [`TargetType::Compound`] - structured types with a fixed, ordered set of attributes.
//!   The raw value must be a field-mapping; each attribute is looked up by name (or by
//!   position for tuple types) and converted with its own target type.
//! - [`TargetType::Sequence`] - `Vec<T>`, converted element by element.
//!
//! Compound types register a static [`CompoundDescriptor`] once per type, usually through
//! `#[derive(FromRawValue)]`:
//!
//! ```ignore
//! use doclens::FromRawValue;
//!
//! #[derive(Debug, Default, FromRawValue)]
//! pub struct Coordinate {
//!     pub lat: i32,
//!     pub lng: i32,
//! }
//!
//! let coordinate: Coordinate = ValueConverter::convert(raw)?;
//! ```

use bson::{Bson, de::deserialize_from_bson};
use serde::de::DeserializeOwned;
use std::fmt;

use crate::{
    error::ConversionError,
    value::{RawMap, RawValue},
};

/// The kinds of scalar targets understood by the converter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    Bool,
    I8,
    I16,
    I32,
    I64,
    Isize,
    U8,
    U16,
    U32,
    U64,
    Usize,
    F32,
    F64,
    String,
    Char,
    /// Any field-mapping, kept untyped.
    Map,
    /// Any raw value, kept untyped.
    Raw,
    /// A value handed to a serde deserializer.
    Serde,
}

impl ScalarKind {
    pub fn name(&self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I8 => "i8",
            ScalarKind::I16 => "i16",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::Isize => "isize",
            ScalarKind::U8 => "u8",
            ScalarKind::U16 => "u16",
            ScalarKind::U32 => "u32",
            ScalarKind::U64 => "u64",
            ScalarKind::Usize => "usize",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
            ScalarKind::Char => "char",
            ScalarKind::Map => "field-mapping",
            ScalarKind::Raw => "raw value",
            ScalarKind::Serde => "serde value",
        }
    }
}

/// Describes the shape of a conversion target.
#[derive(Debug, Clone, Copy)]
pub enum TargetType {
    Scalar(ScalarKind),
    Compound(&'static CompoundDescriptor),
    /// A sequence whose elements have the given target type.
    Sequence(fn() -> TargetType),
}

impl TargetType {
    pub fn is_scalar(&self) -> bool {
        matches!(self, TargetType::Scalar(_))
    }

    pub fn is_compound(&self) -> bool {
        matches!(self, TargetType::Compound(_))
    }
}

impl fmt::Display for TargetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetType::Scalar(kind) => f.write_str(kind.name()),
            TargetType::Compound(descriptor) => f.write_str(descriptor.name),
            TargetType::Sequence(element) => write!(f, "[{}]", element()),
        }
    }
}

/// The attribute table of a compound target type.
///
/// Descriptors are `static` data, built once per type at declaration time.
#[derive(Debug)]
pub struct CompoundDescriptor {
    /// The type name, used in error messages.
    pub name: &'static str,
    /// The attributes in declaration order.
    pub attributes: &'static [AttributeDescriptor],
}

/// A single attribute of a compound target type.
#[derive(Debug)]
pub struct AttributeDescriptor {
    /// The key looked up in the raw field-mapping. `None` for positional attributes,
    /// which take the raw entry at the attribute's declaration index.
    pub key: Option<&'static str>,
    /// Whether a missing (or null) raw entry is an error rather than a zero value.
    pub required: bool,
    /// The attribute's own target type.
    pub target: fn() -> TargetType,
}

impl AttributeDescriptor {
    fn label(&self, index: usize) -> String {
        match self.key {
            Some(key) => key.to_string(),
            None => index.to_string(),
        }
    }
}

/// A type that can be produced from a raw value.
pub trait FromRawValue: Sized {
    /// Returns the shape of this target type.
    fn target_type() -> TargetType;

    /// Converts a non-null raw value.
    fn from_raw(raw: RawValue) -> Result<Self, ConversionError>;

    /// Returns the null representative of this type.
    ///
    /// Types without one (the default) fail with [`ConversionError::UnexpectedNull`].
    fn from_null() -> Result<Self, ConversionError> {
        Err(ConversionError::UnexpectedNull {
            expected: Self::target_type().to_string(),
        })
    }
}

/// A compound target type: a structured type populated attribute by attribute.
///
/// Attributes absent from the raw field-mapping keep the value they have in
/// `Self::default()`.
pub trait Compound: FromRawValue + Default {
    /// Returns the static attribute table of this type.
    fn descriptor() -> &'static CompoundDescriptor;

    /// Converts `raw` and stores it in the attribute at `index` of the descriptor.
    fn set_attribute(&mut self, index: usize, raw: RawValue) -> Result<(), ConversionError>;
}

/// Converts raw values into typed values.
pub struct ValueConverter;

impl ValueConverter {
    /// Converts a raw value into `T`.
    ///
    /// Null raw values produce `T`'s null representative; everything else is
    /// dispatched on `T`'s target type.
    pub fn convert<T: FromRawValue>(raw: RawValue) -> Result<T, ConversionError> {
        match raw {
            RawValue::Null => T::from_null(),
            raw => T::from_raw(raw),
        }
    }

    /// Converts a BSON value as delivered by a store into `T`.
    pub fn convert_bson<T: FromRawValue>(bson: Bson) -> Result<T, ConversionError> {
        Self::convert(RawValue::try_from(bson)?)
    }

    /// Populates a compound type from a raw field-mapping.
    ///
    /// Attributes are visited in declaration order. Named attributes are looked up by key
    /// (the last duplicate wins), positional attributes by entry position. Raw keys that
    /// match no attribute are ignored.
    pub fn convert_compound<T: Compound>(raw: RawValue) -> Result<T, ConversionError> {
        let descriptor = T::descriptor();
        let mut map = match raw {
            RawValue::Map(map) => map,
            other => return Err(ConversionError::mismatch(descriptor.name, other.kind())),
        };
        let mut value = T::default();

        for (index, attribute) in descriptor.attributes.iter().enumerate() {
            let entry = match attribute.key {
                Some(key) => map.take(key),
                None => map.entry(index).map(|(_, v)| v.clone()),
            };

            match entry {
                None | Some(RawValue::Null) if attribute.required => {
                    return Err(ConversionError::MissingAttribute {
                        type_name: descriptor.name,
                        attribute: attribute.label(index),
                    });
                }
                None | Some(RawValue::Null) => {}
                Some(raw) => value
                    .set_attribute(index, raw)
                    .map_err(|e| e.within(attribute.label(index)))?,
            }
        }

        Ok(value)
    }
}

macro_rules! integer_targets {
    ($($ty:ty => $kind:ident),* $(,)?) => {
        $(
            impl FromRawValue for $ty {
                fn target_type() -> TargetType {
                    TargetType::Scalar(ScalarKind::$kind)
                }

                fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
                    match raw {
                        RawValue::Int32(v) => <$ty>::try_from(v)
                            .map_err(|_| ConversionError::overflow(v, stringify!($ty))),
                        RawValue::Int64(v) => <$ty>::try_from(v)
                            .map_err(|_| ConversionError::overflow(v, stringify!($ty))),
                        RawValue::Double(v) => integral(v, stringify!($ty)).and_then(|i| {
                            <$ty>::try_from(i)
                                .map_err(|_| ConversionError::overflow(v, stringify!($ty)))
                        }),
                        other => Err(ConversionError::mismatch(stringify!($ty), other.kind())),
                    }
                }
            }
        )*
    };
}

integer_targets! {
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
    isize => Isize,
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    usize => Usize,
}

/// Accepts a double as an integer only when it is finite, integral and within
/// `i64::MIN..=u64::MAX`; the target type narrows further.
fn integral(value: f64, target: &'static str) -> Result<i128, ConversionError> {
    if !value.is_finite() || value.fract() != 0.0 {
        return Err(ConversionError::mismatch(target, "non-integral double"));
    }
    if value < -9_223_372_036_854_775_808.0 || value >= 18_446_744_073_709_551_616.0 {
        return Err(ConversionError::overflow(value, target));
    }

    Ok(value as i128)
}

impl FromRawValue for f64 {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::F64)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Double(v) => Ok(v),
            RawValue::Int32(v) => Ok(f64::from(v)),
            RawValue::Int64(v) => Ok(v as f64),
            other => Err(ConversionError::mismatch("f64", other.kind())),
        }
    }
}

impl FromRawValue for f32 {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::F32)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Double(v) if v.is_finite() && v.abs() > f64::from(f32::MAX) => {
                Err(ConversionError::overflow(v, "f32"))
            }
            RawValue::Double(v) => Ok(v as f32),
            RawValue::Int32(v) => Ok(v as f32),
            RawValue::Int64(v) => Ok(v as f32),
            other => Err(ConversionError::mismatch("f32", other.kind())),
        }
    }
}

impl FromRawValue for bool {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Bool)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Bool(v) => Ok(v),
            other => Err(ConversionError::mismatch("bool", other.kind())),
        }
    }
}

impl FromRawValue for String {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::String)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::String(v) => Ok(v),
            other => Err(ConversionError::mismatch("string", other.kind())),
        }
    }
}

impl FromRawValue for char {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Char)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::String(v) => {
                let mut chars = v.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Ok(c),
                    _ => Err(ConversionError::mismatch("char", "multi-character string")),
                }
            }
            other => Err(ConversionError::mismatch("char", other.kind())),
        }
    }
}

impl<T: FromRawValue> FromRawValue for Option<T> {
    fn target_type() -> TargetType {
        T::target_type()
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        ValueConverter::convert(raw).map(Some)
    }

    fn from_null() -> Result<Self, ConversionError> {
        Ok(None)
    }
}

impl<T: FromRawValue> FromRawValue for Vec<T> {
    fn target_type() -> TargetType {
        TargetType::Sequence(T::target_type)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(index, item)| {
                    ValueConverter::convert(item).map_err(|e| ConversionError::Element {
                        index,
                        source: Box::new(e),
                    })
                })
                .collect(),
            other => Err(ConversionError::mismatch(Self::target_type(), other.kind())),
        }
    }
}

impl FromRawValue for RawValue {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Raw)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        Ok(raw)
    }

    fn from_null() -> Result<Self, ConversionError> {
        Ok(RawValue::Null)
    }
}

impl FromRawValue for RawMap {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Map)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        match raw {
            RawValue::Map(map) => Ok(map),
            other => Err(ConversionError::mismatch("field-mapping", other.kind())),
        }
    }
}

impl FromRawValue for Bson {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Raw)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        Ok(Bson::from(raw))
    }

    fn from_null() -> Result<Self, ConversionError> {
        Ok(Bson::Null)
    }
}

/// Adapter target for types mapped with serde instead of a descriptor table.
///
/// The raw value is rebuilt as BSON and handed to the BSON deserializer, so the usual
/// `#[serde(...)]` attributes apply.
#[derive(Debug, Clone, PartialEq)]
pub struct SerdeValue<T>(pub T);

impl<T> SerdeValue<T> {
    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T: DeserializeOwned> FromRawValue for SerdeValue<T> {
    fn target_type() -> TargetType {
        TargetType::Scalar(ScalarKind::Serde)
    }

    fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
        deserialize_from_bson(Bson::from(raw))
            .map(SerdeValue)
            .map_err(|e| ConversionError::Deserialize(e.to_string()))
    }

    fn from_null() -> Result<Self, ConversionError> {
        deserialize_from_bson(Bson::Null)
            .map(SerdeValue)
            .map_err(|e| ConversionError::Deserialize(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, PartialEq)]
    struct Coordinate {
        lat: i32,
        lng: i32,
    }

    static COORDINATE: CompoundDescriptor = CompoundDescriptor {
        name: "Coordinate",
        attributes: &[
            AttributeDescriptor {
                key: Some("lat"),
                required: false,
                target: <i32 as FromRawValue>::target_type,
            },
            AttributeDescriptor {
                key: Some("lng"),
                required: false,
                target: <i32 as FromRawValue>::target_type,
            },
        ],
    };

    impl FromRawValue for Coordinate {
        fn target_type() -> TargetType {
            TargetType::Compound(&COORDINATE)
        }

        fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
            ValueConverter::convert_compound(raw)
        }
    }

    impl Compound for Coordinate {
        fn descriptor() -> &'static CompoundDescriptor {
            &COORDINATE
        }

        fn set_attribute(&mut self, index: usize, raw: RawValue) -> Result<(), ConversionError> {
            match index {
                0 => self.lat = ValueConverter::convert(raw)?,
                1 => self.lng = ValueConverter::convert(raw)?,
                _ => {}
            }
            Ok(())
        }
    }

    #[derive(Debug, Default, PartialEq)]
    struct Poi {
        address: Option<String>,
        coordinate: Coordinate,
    }

    static POI: CompoundDescriptor = CompoundDescriptor {
        name: "Poi",
        attributes: &[
            AttributeDescriptor {
                key: Some("address"),
                required: false,
                target: <Option<String> as FromRawValue>::target_type,
            },
            AttributeDescriptor {
                key: Some("coordinate"),
                required: true,
                target: <Coordinate as FromRawValue>::target_type,
            },
        ],
    };

    impl FromRawValue for Poi {
        fn target_type() -> TargetType {
            TargetType::Compound(&POI)
        }

        fn from_raw(raw: RawValue) -> Result<Self, ConversionError> {
            ValueConverter::convert_compound(raw)
        }
    }

    impl Compound for Poi {
        fn descriptor() -> &'static CompoundDescriptor {
            &POI
        }

        fn set_attribute(&mut self, index: usize, raw: RawValue) -> Result<(), ConversionError> {
            match index {
                0 => self.address = ValueConverter::convert(raw)?,
                1 => self.coordinate = ValueConverter::convert(raw)?,
                _ => {}
            }
            Ok(())
        }
    }

    fn map(entries: Vec<(&str, RawValue)>) -> RawValue {
        RawValue::Map(RawMap::from_iter(entries))
    }

    #[test]
    fn scalar_values_are_used_directly() {
        assert_eq!(
            ValueConverter::convert::<String>("22 Wall Street Avenue".into()).unwrap(),
            "22 Wall Street Avenue"
        );
        assert_eq!(ValueConverter::convert::<i32>(RawValue::Int32(125)).unwrap(), 125);
        assert!(ValueConverter::convert::<bool>(RawValue::Bool(true)).unwrap());
    }

    #[test]
    fn integers_widen() {
        assert_eq!(ValueConverter::convert::<i64>(RawValue::Int32(-7)).unwrap(), -7_i64);
        assert_eq!(ValueConverter::convert::<f64>(RawValue::Int64(3)).unwrap(), 3.0);
    }

    #[test]
    fn narrowing_overflow_fails() {
        let err =
            ValueConverter::convert::<i32>(RawValue::Int64(i64::from(i32::MAX) + 1)).unwrap_err();
        assert!(matches!(err, ConversionError::Overflow { target: "i32", .. }));

        let err = ValueConverter::convert::<u8>(RawValue::Int32(-1)).unwrap_err();
        assert!(matches!(err, ConversionError::Overflow { target: "u8", .. }));

        let err = ValueConverter::convert::<f32>(RawValue::Double(1e300)).unwrap_err();
        assert!(matches!(err, ConversionError::Overflow { target: "f32", .. }));
    }

    #[test]
    fn integral_doubles_convert_to_integers() {
        assert_eq!(ValueConverter::convert::<i32>(RawValue::Double(72.0)).unwrap(), 72);
        assert!(ValueConverter::convert::<i32>(RawValue::Double(72.5)).is_err());
        assert!(ValueConverter::convert::<i64>(RawValue::Double(f64::NAN)).is_err());
    }

    #[test]
    fn doubles_past_i64_fit_unsigned_targets() {
        let big = 1.5e19;

        assert_eq!(
            ValueConverter::convert::<u64>(RawValue::Double(big)).unwrap(),
            15_000_000_000_000_000_000
        );
        assert!(matches!(
            ValueConverter::convert::<i64>(RawValue::Double(big)),
            Err(ConversionError::Overflow { target: "i64", .. })
        ));
        assert!(matches!(
            ValueConverter::convert::<u64>(RawValue::Double(2e19)),
            Err(ConversionError::Overflow { target: "u64", .. })
        ));
    }

    #[test]
    fn unrelated_kinds_are_not_coerced() {
        let err =
            ValueConverter::convert::<String>(map(vec![("lat", RawValue::Int32(1))])).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch { expected: "string".into(), found: "field-mapping" }
        );

        let err =
            ValueConverter::convert::<i32>(map(vec![("lat", RawValue::Int32(1))])).unwrap_err();
        assert!(matches!(err, ConversionError::TypeMismatch { .. }));

        assert!(ValueConverter::convert::<i32>("1".into()).is_err());
        assert!(ValueConverter::convert::<bool>(RawValue::Int32(1)).is_err());
    }

    #[test]
    fn null_becomes_none_or_fails() {
        assert_eq!(ValueConverter::convert::<Option<i32>>(RawValue::Null).unwrap(), None);
        assert_eq!(ValueConverter::convert::<Option<Coordinate>>(RawValue::Null).unwrap(), None);
        assert_eq!(ValueConverter::convert::<Bson>(RawValue::Null).unwrap(), Bson::Null);

        let err = ValueConverter::convert::<i32>(RawValue::Null).unwrap_err();
        assert_eq!(err, ConversionError::UnexpectedNull { expected: "i32".into() });
    }

    #[test]
    fn compound_attributes_match_by_name_regardless_of_order() {
        let forward = map(vec![("lat", RawValue::Int32(1)), ("lng", RawValue::Int32(2))]);
        let backward = map(vec![("lng", RawValue::Int32(2)), ("lat", RawValue::Int32(1))]);

        let expected = Coordinate { lat: 1, lng: 2 };
        assert_eq!(ValueConverter::convert::<Coordinate>(forward).unwrap(), expected);
        assert_eq!(ValueConverter::convert::<Coordinate>(backward).unwrap(), expected);
    }

    #[test]
    fn missing_attributes_keep_zero_value() {
        let raw = map(vec![("lng", RawValue::Int64(72)), ("alt", RawValue::Double(3.5))]);

        assert_eq!(
            ValueConverter::convert::<Coordinate>(raw).unwrap(),
            Coordinate { lat: 0, lng: 72 }
        );
    }

    #[test]
    fn required_attribute_must_be_present() {
        let raw = map(vec![("address", "24 Wall Street Avenue".into())]);

        let err = ValueConverter::convert::<Poi>(raw).unwrap_err();
        assert_eq!(
            err,
            ConversionError::MissingAttribute { type_name: "Poi", attribute: "coordinate".into() }
        );
    }

    #[test]
    fn nested_compound_errors_name_the_attribute() {
        let raw = map(vec![("coordinate", map(vec![("lat", RawValue::Int64(i64::MAX))]))]);

        match ValueConverter::convert::<Poi>(raw).unwrap_err() {
            ConversionError::Attribute { attribute, source } => {
                assert_eq!(attribute, "coordinate");
                assert!(matches!(
                    *source,
                    ConversionError::Attribute { ref attribute, .. } if attribute == "lat"
                ));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn nested_compound_converts() {
        let raw = map(vec![
            ("address", "22 Wall Street Avenue".into()),
            (
                "coordinate",
                map(vec![("lat", RawValue::Int32(125)), ("lng", RawValue::Int32(72))]),
            ),
        ]);

        assert_eq!(
            ValueConverter::convert::<Poi>(raw).unwrap(),
            Poi {
                address: Some("22 Wall Street Avenue".into()),
                coordinate: Coordinate { lat: 125, lng: 72 },
            }
        );
    }

    #[test]
    fn compound_from_scalar_fails() {
        let err = ValueConverter::convert::<Coordinate>(RawValue::Int32(1)).unwrap_err();
        assert_eq!(
            err,
            ConversionError::TypeMismatch { expected: "Coordinate".into(), found: "int32" }
        );
    }

    #[test]
    fn sequences_convert_element_wise() {
        let raw = RawValue::Array(vec![RawValue::Int32(1), RawValue::Int64(2)]);
        assert_eq!(ValueConverter::convert::<Vec<i16>>(raw).unwrap(), vec![1, 2]);

        let raw = RawValue::Array(vec![RawValue::Int32(1), "two".into()]);
        let err = ValueConverter::convert::<Vec<i16>>(raw).unwrap_err();
        assert!(matches!(err, ConversionError::Element { index: 1, .. }));
    }

    #[test]
    fn serde_targets_deserialize_through_bson() {
        #[derive(Debug, Deserialize, PartialEq)]
        struct Point {
            lat: i32,
            lng: i32,
        }

        let raw = map(vec![("lng", RawValue::Int32(2)), ("lat", RawValue::Int32(1))]);
        let SerdeValue(point) = ValueConverter::convert::<SerdeValue<Point>>(raw).unwrap();

        assert_eq!(point, Point { lat: 1, lng: 2 });
    }

    #[test]
    fn target_types_display() {
        assert_eq!(<Coordinate as FromRawValue>::target_type().to_string(), "Coordinate");
        assert_eq!(<Vec<String> as FromRawValue>::target_type().to_string(), "[string]");
        assert!(<Option<u32> as FromRawValue>::target_type().is_scalar());
        assert!(<Poi as FromRawValue>::target_type().is_compound());
    }
}
