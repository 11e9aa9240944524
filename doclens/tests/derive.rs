use bson::{Bson, doc};
use doclens::prelude::*;

#[derive(Debug, Default, PartialEq, FromRawValue)]
struct Coordinate {
    lat: i32,
    lng: i32,
}

#[derive(Debug, Default, PartialEq, FromRawValue)]
struct Place {
    #[doclens(rename = "label")]
    name: String,
    address: Option<String>,
    #[doclens(required)]
    coordinate: Coordinate,
    tags: Vec<String>,
}

#[derive(Debug, Default, PartialEq, FromRawValue)]
struct Pair(i64, String);

fn convert<T: FromRawValue>(document: bson::Document) -> Result<T, ConversionError> {
    ValueConverter::convert_bson(Bson::Document(document))
}

#[test]
fn registers_a_compound_descriptor() {
    match Place::target_type() {
        TargetType::Compound(descriptor) => {
            assert_eq!(descriptor.name, "Place");
            let keys = descriptor
                .attributes
                .iter()
                .map(|a| a.key)
                .collect::<Vec<_>>();
            assert_eq!(
                keys,
                vec![Some("label"), Some("address"), Some("coordinate"), Some("tags")]
            );
            assert!(descriptor.attributes[2].required);
            assert!((descriptor.attributes[2].target)().is_compound());
        }
        other => panic!("expected a compound target, got {other}"),
    }
}

#[test]
fn maps_attributes_regardless_of_key_order() {
    let coordinate: Coordinate = convert(doc! { "lng": 2, "lat": 1 }).unwrap();

    assert_eq!(coordinate, Coordinate { lat: 1, lng: 2 });
}

#[test]
fn converts_nested_renamed_and_sequence_attributes() {
    let place: Place = convert(doc! {
        "label": "Wall Street",
        "coordinate": { "lat": 1, "lng": 2 },
        "tags": ["finance", "nyc"],
        "unknown": true,
    })
    .unwrap();

    assert_eq!(
        place,
        Place {
            name: "Wall Street".to_string(),
            address: None,
            coordinate: Coordinate { lat: 1, lng: 2 },
            tags: vec!["finance".to_string(), "nyc".to_string()],
        }
    );
}

#[test]
fn absent_attributes_keep_their_default() {
    let coordinate: Coordinate = convert(doc! { "lat": 125 }).unwrap();

    assert_eq!(coordinate, Coordinate { lat: 125, lng: 0 });
}

#[test]
fn required_attribute_must_be_present() {
    let error = convert::<Place>(doc! { "label": "nowhere" }).unwrap_err();

    assert_eq!(
        error,
        ConversionError::MissingAttribute {
            type_name: "Place",
            attribute: "coordinate".to_string(),
        }
    );
}

#[test]
fn attribute_errors_name_the_attribute() {
    let error = convert::<Place>(doc! {
        "coordinate": { "lat": "north", "lng": 2 },
    })
    .unwrap_err();

    match error {
        ConversionError::Attribute { attribute, source } => {
            assert_eq!(attribute, "coordinate");
            assert!(matches!(
                *source,
                ConversionError::Attribute { ref attribute, .. } if attribute == "lat"
            ));
        }
        other => panic!("expected an attribute error, got {other:?}"),
    }
}

#[test]
fn tuple_structs_map_by_position() {
    let pair: Pair = convert(doc! { "first": 7_i64, "second": "seven" }).unwrap();

    assert_eq!(pair, Pair(7, "seven".to_string()));
}

#[test]
fn null_compound_needs_an_option_target() {
    assert_eq!(ValueConverter::convert::<Option<Coordinate>>(RawValue::Null).unwrap(), None);
    assert!(matches!(
        ValueConverter::convert::<Coordinate>(RawValue::Null),
        Err(ConversionError::UnexpectedNull { .. })
    ));
}
