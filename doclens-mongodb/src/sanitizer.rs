//! Field name escaping for MongoDB compatibility.
//!
//! MongoDB restricts field names from containing dots and dollar signs, which
//! its query syntax reserves. Document keys are escaped on the way in and
//! restored in distinct results. Values are never rewritten: a string is stored,
//! compared and returned exactly as written.

use bson::{Bson, Document};


/// Escapes and restores field names to handle MongoDB field name restrictions.
///
/// MongoDB does not allow field names (document keys) to contain:
/// - Dots (`.`) - used for nested field access in queries
/// - Dollar signs (`$`) - used for operators in queries
/// - Null bytes (`\0`) - field name terminators
///
/// Each is replaced by a percent escape, and `%` itself is escaped too, so
/// distinct keys stay distinct and restoring is exact.
pub(crate) struct ValueSanitizer;

impl ValueSanitizer {
    const ESCAPES: [(char, &'static str); 4] = [
        ('%', "%25"),
        ('.', "%2E"),
        ('$', "%24"),
        ('\0', "%00"),
    ];

    /// Recursively escapes the document keys inside a BSON value.
    pub(crate) fn sanitize_value(value: &Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .iter()
                    .map(Self::sanitize_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (Self::sanitize_string(k), Self::sanitize_value(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    pub(crate) fn sanitize_string(input: &str) -> String {
        let mut sanitized = String::with_capacity(input.len());

        for c in input.chars() {
            match Self::ESCAPES.iter().find(|(target, _)| *target == c) {
                Some((_, escape)) => sanitized.push_str(escape),
                None => sanitized.push(c),
            }
        }

        sanitized
    }

    /// Escapes each segment of a dotted field path, keeping the dots as separators.
    pub(crate) fn sanitize_path(path: &str) -> String {
        path.split('.')
            .map(Self::sanitize_string)
            .collect::<Vec<_>>()
            .join(".")
    }

    /// Escapes the field paths of a native filter document.
    ///
    /// Operator keys are kept; the filter documents under `$and`, `$or` and `$nor`
    /// are escaped in turn. Operands are left as written.
    pub(crate) fn sanitize_filter(filter: &Document) -> Document {
        filter
            .iter()
            .map(|(key, value)| match (key.as_str(), value) {
                ("$and" | "$or" | "$nor", Bson::Array(items)) => (
                    key.clone(),
                    Bson::Array(
                        items
                            .iter()
                            .map(|item| match item {
                                Bson::Document(doc) => Bson::Document(Self::sanitize_filter(doc)),
                                other => other.clone(),
                            })
                            .collect(),
                    ),
                ),
                (op, _) if op.starts_with('$') => (key.clone(), value.clone()),
                (path, _) => (Self::sanitize_path(path), value.clone()),
            })
            .collect()
    }

    /// Recursively restores the document keys inside a BSON value read back from MongoDB.
    pub(crate) fn restore_value(value: &Bson) -> Bson {
        match value {
            Bson::Array(arr) => Bson::Array(
                arr
                    .iter()
                    .map(Self::restore_value)
                    .collect(),
            ),
            Bson::Document(doc) => Bson::Document(
                doc.iter()
                    .map(|(k, v)| (Self::restore_string(k), Self::restore_value(v)))
                    .collect(),
            ),
            _ => value.clone(),
        }
    }

    pub(crate) fn restore_string(input: &str) -> String {
        let mut restored = String::with_capacity(input.len());
        let mut rest = input;

        while let Some(index) = rest.find('%') {
            restored.push_str(&rest[..index]);
            rest = &rest[index..];

            match Self::ESCAPES.iter().find(|(_, escape)| rest.starts_with(*escape)) {
                Some((target, escape)) => {
                    restored.push(*target);
                    rest = &rest[escape.len()..];
                }
                None => {
                    restored.push('%');
                    rest = &rest[1..];
                }
            }
        }

        restored.push_str(rest);
        restored
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;

    #[test]
    fn paths_keep_their_separators() {
        assert_eq!(ValueSanitizer::sanitize_path("coordinate.lat"), "coordinate.lat");
        assert_eq!(ValueSanitizer::sanitize_path("price.$usd"), "price.%24usd");
    }

    #[test]
    fn keys_are_escaped_and_restored() {
        let original = Bson::Document(doc! {
            "a.b": { "$c": "x.y" },
            "50%": ["1.0", 2],
        });

        let sanitized = ValueSanitizer::sanitize_value(&original);
        assert_eq!(
            sanitized,
            Bson::Document(doc! {
                "a%2Eb": { "%24c": "x.y" },
                "50%25": ["1.0", 2],
            })
        );
        assert_eq!(ValueSanitizer::restore_value(&sanitized), original);
    }

    #[test]
    fn string_values_are_never_rewritten() {
        let dotted = Bson::String("a.b".into());
        let escaped = Bson::String("a%2Eb".into());

        assert_ne!(
            ValueSanitizer::sanitize_value(&dotted),
            ValueSanitizer::sanitize_value(&escaped)
        );
        assert_eq!(ValueSanitizer::sanitize_value(&escaped), escaped);
        assert_eq!(ValueSanitizer::restore_value(&escaped), escaped);
    }

    #[test]
    fn distinct_keys_stay_distinct() {
        let dotted = ValueSanitizer::sanitize_string("a.b");
        let literal = ValueSanitizer::sanitize_string("a%2Eb");

        assert_ne!(dotted, literal);
        assert_eq!(ValueSanitizer::restore_string(&dotted), "a.b");
        assert_eq!(ValueSanitizer::restore_string(&literal), "a%2Eb");
        assert_eq!(ValueSanitizer::restore_string("100%"), "100%");
    }

    #[test]
    fn native_filters_escape_paths_only() {
        let filter = doc! {
            "price.$usd": { "$gt": 1 },
            "$or": [ { "host": "example.com" }, { "tags": { "$size": 2 } } ],
        };

        assert_eq!(
            ValueSanitizer::sanitize_filter(&filter),
            doc! {
                "price.%24usd": { "$gt": 1 },
                "$or": [ { "host": "example.com" }, { "tags": { "$size": 2 } } ],
            }
        );
    }
}
