//! Filter evaluation and field path resolution over BSON documents.
//!
//! [`DocumentEvaluator`] decides whether a document matches a filter [`Expr`];
//! [`resolve_path`] finds the values a dotted field path addresses, the way the
//! distinct command and the filter evaluator both need them.

use std::{
    cmp::Ordering,
    hash::{Hash, Hasher},
    mem,
};
use bson::{Bson, datetime::DateTime};

use doclens_core::{
    query::{QueryVisitor, Expr, FieldOp},
    error::{DocumentStoreError, DocumentStoreResult},
};


/// Collects every value `path` addresses inside `value`.
///
/// Segments are separated by dots. A document is entered by key; an array is
/// entered by numeric index when the segment is one, and otherwise each of its
/// document elements is searched with the same remaining path. Values the path does not
/// reach contribute nothing.
pub(crate) fn resolve_path<'a>(value: &'a Bson, path: &str) -> Vec<&'a Bson> {
    let segments = path.split('.').collect::<Vec<_>>();
    let mut found = Vec::new();

    collect(value, &segments, &mut found);
    found
}

fn collect<'a>(value: &'a Bson, segments: &[&str], found: &mut Vec<&'a Bson>) {
    let Some((head, rest)) = segments.split_first() else {
        found.push(value);
        return;
    };

    match value {
        Bson::Document(doc) => {
            if let Some(child) = doc.get(*head) {
                collect(child, rest, found);
            }
        }
        Bson::Array(items) => match head.parse::<usize>() {
            Ok(index) => {
                if let Some(child) = items.get(index) {
                    collect(child, rest, found);
                }
            }
            Err(_) => {
                for item in items {
                    if matches!(item, Bson::Document(_)) {
                        collect(item, segments, found);
                    }
                }
            }
        },
        _ => {}
    }
}


/// A BSON number, compared exactly across widths.
///
/// Integers compare as `i64`; an integer equals a double only when the double
/// holds exactly that integer. `NaN` equals `NaN`.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Number {
    Int(i64),
    Float(f64),
}

/// 2^63, the first double past `i64::MAX`.
const I64_BOUND: f64 = 9_223_372_036_854_775_808.0;

impl Number {
    /// The integer a double holds exactly, if any.
    fn exact_int(value: f64) -> Option<i64> {
        (value.fract() == 0.0 && (-I64_BOUND..I64_BOUND).contains(&value)).then(|| value as i64)
    }

    fn cmp_int_float(int: i64, float: f64) -> Option<Ordering> {
        if float.is_nan() {
            return None;
        }
        if float >= I64_BOUND {
            return Some(Ordering::Less);
        }
        if float < -I64_BOUND {
            return Some(Ordering::Greater);
        }

        let whole = float.trunc();
        Some(int.cmp(&(whole as i64)).then_with(|| {
            let fraction = float - whole;
            if fraction > 0.0 {
                Ordering::Less
            } else if fraction < 0.0 {
                Ordering::Greater
            } else {
                Ordering::Equal
            }
        }))
    }
}

impl PartialEq for Number {
    fn eq(&self, other: &Self) -> bool {
        self.partial_cmp(other) == Some(Ordering::Equal)
    }
}

impl PartialOrd for Number {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (*self, *other) {
            (Number::Int(a), Number::Int(b)) => Some(a.cmp(&b)),
            (Number::Float(a), Number::Float(b)) if a.is_nan() && b.is_nan() => {
                Some(Ordering::Equal)
            }
            (Number::Float(a), Number::Float(b)) => a.partial_cmp(&b),
            (Number::Int(a), Number::Float(b)) => Number::cmp_int_float(a, b),
            (Number::Float(a), Number::Int(b)) => {
                Number::cmp_int_float(b, a).map(Ordering::reverse)
            }
        }
    }
}

impl Hash for Number {
    fn hash<H: Hasher>(&self, state: &mut H) {
        match *self {
            Number::Int(value) => value.hash(state),
            Number::Float(value) => match Number::exact_int(value) {
                Some(int) => int.hash(state),
                None if value.is_nan() => f64::NAN.to_bits().hash(state),
                None => value.to_bits().hash(state),
            },
        }
    }
}

/// Comparable view of a BSON value.
///
/// Numbers of every width compare as [`Number`], so `Int32(1)`, `Int64(1)` and
/// `Double(1.0)` are equal. Documents compare field by field in order. Hashing
/// agrees with equality, so values can be deduplicated through a hash set.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Number(Number),
    DateTime(DateTime),
    String(&'a str),
    Array(Vec<Comparable<'a>>),
    Map(Vec<(&'a str, Comparable<'a>)>),
    /// Any other BSON type, compared by exact equality.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null | Bson::Undefined => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Number(Number::Int(i64::from(*value))),
            Bson::Int64(value) => Comparable::Number(Number::Int(*value)),
            Bson::Double(value) => Comparable::Number(Number::Float(*value)),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<Vec<_>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> Eq for Comparable<'a> {}

impl<'a> Hash for Comparable<'a> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        mem::discriminant(self).hash(state);

        match self {
            Comparable::Null => {}
            Comparable::Bool(value) => value.hash(state),
            Comparable::Number(value) => value.hash(state),
            Comparable::DateTime(value) => value.timestamp_millis().hash(state),
            Comparable::String(value) => value.hash(state),
            Comparable::Array(items) => items.hash(state),
            Comparable::Map(entries) => entries.hash(state),
            // equal values share an element type; equality settles the rest
            Comparable::Other(value) => (value.element_type() as u8).hash(state),
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Bson,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Bson) -> Self {
        Self { document }
    }

    pub fn evaluate(&mut self, expr: &Expr) -> DocumentStoreResult<bool> {
        self.visit_expr(expr)
    }

    /// Returns the documents matching `expr`, in their original order.
    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Bson>,
        expr: &Expr,
    ) -> DocumentStoreResult<Vec<&'a Bson>> {
        let mut matching = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(expr)? {
                matching.push(document);
            }
        }

        Ok(matching)
    }

    fn lookup(&self, field: &str) -> Option<&'a Bson> {
        resolve_path(self.document, field)
            .into_iter()
            .next()
    }
}

fn any_of(array: &[Comparable<'_>], candidates: &Comparable<'_>) -> bool {
    match candidates {
        Comparable::Array(values) => values
            .iter()
            .any(|value| array.contains(value)),
        single => array.contains(single),
    }
}

impl<'a> QueryVisitor for DocumentEvaluator<'a> {
    type Output = bool;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if !self.visit_expr(expr)? {
                return Ok(false);
            }
        }

        Ok(true)
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        for expr in exprs {
            if self.visit_expr(expr)? {
                return Ok(true);
            }
        }

        Ok(false)
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        Ok(!self.visit_expr(expr)?)
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        Ok(self.lookup(field).is_some() == should_exist)
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let Some(field_value) = self.lookup(field) else {
            // A missing field only satisfies the negative operators.
            return Ok(matches!(op, FieldOp::Ne | FieldOp::NotContains | FieldOp::NoneOf));
        };

        let left = Comparable::from(field_value);
        let right = Comparable::from(value);

        Ok(match op {
            FieldOp::Eq => left == right,
            FieldOp::Ne => left != right,
            FieldOp::Gt => left.partial_cmp(&right) == Some(Ordering::Greater),
            FieldOp::Gte => {
                matches!(left.partial_cmp(&right), Some(Ordering::Greater | Ordering::Equal))
            }
            FieldOp::Lt => left.partial_cmp(&right) == Some(Ordering::Less),
            FieldOp::Lte => {
                matches!(left.partial_cmp(&right), Some(Ordering::Less | Ordering::Equal))
            }
            FieldOp::Contains | FieldOp::NotContains => {
                let contains = match (&left, &right) {
                    (Comparable::Array(array), item) => array.contains(item),
                    (Comparable::String(text), Comparable::String(part)) => text.contains(part),
                    _ => false,
                };
                contains == matches!(op, FieldOp::Contains)
            },
            FieldOp::StartsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(prefix)) => text.starts_with(prefix),
                _ => false,
            },
            FieldOp::EndsWith => match (&left, &right) {
                (Comparable::String(text), Comparable::String(suffix)) => text.ends_with(suffix),
                _ => false,
            },
            FieldOp::AnyOf | FieldOp::NoneOf => {
                let found = match &left {
                    Comparable::Array(array) => any_of(array, &right),
                    single => match &right {
                        Comparable::Array(values) => values.contains(single),
                        other => other == single,
                    },
                };
                found == matches!(op, FieldOp::AnyOf)
            },
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use bson::doc;
    use doclens_core::query::Filter;

    fn document(doc: bson::Document) -> Bson {
        Bson::Document(doc)
    }

    #[test]
    fn resolves_nested_paths() {
        let poi = document(doc! { "coordinate": { "lat": 1, "lon": 2 } });

        assert_eq!(resolve_path(&poi, "coordinate.lat"), vec![&Bson::Int32(1)]);
        assert!(resolve_path(&poi, "coordinate.alt").is_empty());
        assert!(resolve_path(&poi, "coordinate.lat.deg").is_empty());
    }

    #[test]
    fn resolves_through_arrays_of_documents() {
        let route = document(doc! {
            "stops": [ { "lat": 1 }, { "lat": 125 }, { "lon": 3 } ]
        });

        assert_eq!(
            resolve_path(&route, "stops.lat"),
            vec![&Bson::Int32(1), &Bson::Int32(125)]
        );
        assert_eq!(resolve_path(&route, "stops.1.lat"), vec![&Bson::Int32(125)]);
    }

    #[test]
    fn numbers_compare_across_widths() {
        let a = Bson::Int32(1);
        let b = Bson::Int64(1);
        let c = Bson::Double(1.0);

        assert_eq!(Comparable::from(&a), Comparable::from(&b));
        assert_eq!(Comparable::from(&b), Comparable::from(&c));
    }

    #[test]
    fn large_integers_compare_exactly() {
        let a = Bson::Int64(9_007_199_254_740_992);
        let b = Bson::Int64(9_007_199_254_740_993);
        let c = Bson::Double(9_007_199_254_740_992.0);

        assert_ne!(Comparable::from(&a), Comparable::from(&b));
        assert_eq!(Comparable::from(&a), Comparable::from(&c));
        assert_ne!(Comparable::from(&b), Comparable::from(&c));
        assert_eq!(
            Comparable::from(&b).partial_cmp(&Comparable::from(&c)),
            Some(Ordering::Greater)
        );
        assert_eq!(
            Comparable::from(&Bson::Int32(1)).partial_cmp(&Comparable::from(&Bson::Double(1.5))),
            Some(Ordering::Less)
        );
    }

    #[test]
    fn nan_equals_nan() {
        let nan = Bson::Double(f64::NAN);

        assert_eq!(Comparable::from(&nan), Comparable::from(&nan));
        assert_ne!(Comparable::from(&nan), Comparable::from(&Bson::Double(0.0)));
    }

    #[test]
    fn equal_values_hash_alike() {
        use std::collections::HashSet;

        let values = [
            Bson::Int32(1),
            Bson::Int64(1),
            Bson::Double(1.0),
            Bson::Double(-0.0),
            Bson::Int32(0),
            Bson::Double(f64::NAN),
            Bson::Double(-f64::NAN),
        ];
        let distinct = values.iter().map(Comparable::from).collect::<HashSet<_>>();

        assert_eq!(distinct.len(), 3);
    }

    #[test]
    fn documents_compare_in_field_order() {
        let ab = Bson::Document(doc! { "a": 1, "b": 2 });
        let ba = Bson::Document(doc! { "b": 2, "a": 1 });

        assert_ne!(Comparable::from(&ab), Comparable::from(&ba));
    }

    #[test]
    fn exists_checks_nested_fields() {
        let with = document(doc! {
            "address": "22 Wall Street Avenue",
            "coordinate": { "lat": 1 },
        });
        let without = document(doc! { "coordinate": { "lat": 125 } });

        let expr = Filter::exists("address");
        assert!(DocumentEvaluator::new(&with).evaluate(&expr).unwrap());
        assert!(!DocumentEvaluator::new(&without).evaluate(&expr).unwrap());

        let nested = Filter::gt("coordinate.lat", 100);
        assert!(!DocumentEvaluator::new(&with).evaluate(&nested).unwrap());
        assert!(DocumentEvaluator::new(&without).evaluate(&nested).unwrap());
    }

    #[test]
    fn non_documents_never_match_positive_operators() {
        let scalar = Bson::Int32(5);

        assert!(!DocumentEvaluator::new(&scalar).evaluate(&Filter::eq("a", 5)).unwrap());
        assert!(DocumentEvaluator::new(&scalar).evaluate(&Filter::ne("a", 5)).unwrap());
    }

    #[test]
    fn membership_operators() {
        let doc = document(doc! { "tags": ["a", "b"], "kind": "x" });

        let mut evaluator = DocumentEvaluator::new(&doc);

        assert!(evaluator.evaluate(&Filter::any_of("tags", vec!["b", "c"])).unwrap());
        assert!(evaluator.evaluate(&Filter::none_of("tags", vec!["c"])).unwrap());
        assert!(evaluator.evaluate(&Filter::any_of("kind", vec!["x", "y"])).unwrap());
        assert!(evaluator.evaluate(&Filter::contains("tags", "a")).unwrap());
    }
}
