//! Filter translation from the doclens AST to MongoDB query syntax.
//!
//! Field paths are escaped by the [`ValueSanitizer`] the same way stored keys
//! are; values are compared as written. Native filter documents need no
//! translation and are sent as they are, apart from that path escaping.

use bson::{Document, Bson, doc};

use doclens_core::{
    query::{QueryVisitor, QueryFilter, Expr, FieldOp},
    error::DocumentStoreError,
};

use crate::sanitizer::ValueSanitizer;


/// Translates filter expressions into MongoDB query documents.
pub(crate) struct MongoQueryTranslator;

impl MongoQueryTranslator {
    /// Translates an optional filter; `None` matches every document.
    pub(crate) fn translate(filter: Option<&QueryFilter>) -> Result<Document, DocumentStoreError> {
        match filter {
            Some(QueryFilter::Expr(expr)) => MongoQueryTranslator.visit_expr(expr),
            Some(QueryFilter::Native(document)) => Ok(ValueSanitizer::sanitize_filter(document)),
            None => Ok(doc! {}),
        }
    }
}

fn escape_regex(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());

    for c in input.chars() {
        if "\\^$.|?*+()[]{}".contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }

    escaped
}

fn requires(op: &str, expected: &str) -> DocumentStoreError {
    DocumentStoreError::InvalidFilter(format!("{op} operator requires {expected} value"))
}

impl QueryVisitor for MongoQueryTranslator {
    type Output = Document;
    type Error = DocumentStoreError;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$and": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error> {
        Ok(doc! {
            "$or": exprs
                .iter()
                .map(|expr| self.visit_expr(expr))
                .collect::<Result<Vec<_>, _>>()?,
        })
    }

    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        // `$not` is only valid inside a field predicate.
        Ok(doc! {
            "$nor": [self.visit_expr(expr)?],
        })
    }

    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error> {
        let path = ValueSanitizer::sanitize_path(field);

        Ok(doc! {
            path: { "$exists": should_exist },
        })
    }

    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error> {
        let path = ValueSanitizer::sanitize_path(field);
        let value = value.clone();

        Ok(doc! {
            path: match op {
                FieldOp::Eq => doc! { "$eq": value },
                FieldOp::Ne => doc! { "$ne": value },
                FieldOp::Gt => doc! { "$gt": value },
                FieldOp::Gte => doc! { "$gte": value },
                FieldOp::Lt => doc! { "$lt": value },
                FieldOp::Lte => doc! { "$lte": value },
                FieldOp::Contains => match value {
                    Bson::String(s) => doc! { "$regex": escape_regex(&s) },
                    Bson::Array(arr) => doc! { "$all": arr },
                    other => doc! { "$all": [other] },
                },
                FieldOp::NotContains => match value {
                    Bson::String(s) => doc! { "$not": { "$regex": escape_regex(&s) } },
                    Bson::Array(arr) => doc! { "$nin": arr },
                    other => doc! { "$nin": [other] },
                },
                FieldOp::StartsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("^{}", escape_regex(&s)) },
                    _ => return Err(requires("StartsWith", "a string")),
                },
                FieldOp::EndsWith => match value {
                    Bson::String(s) => doc! { "$regex": format!("{}$", escape_regex(&s)) },
                    _ => return Err(requires("EndsWith", "a string")),
                },
                FieldOp::AnyOf => match value {
                    Bson::Array(arr) => doc! { "$in": arr },
                    other => doc! { "$in": [other] },
                },
                FieldOp::NoneOf => match value {
                    Bson::Array(arr) => doc! { "$nin": arr },
                    other => doc! { "$nin": [other] },
                },
            }
        })
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use doclens_core::query::Filter;

    fn translate(expr: Expr) -> Document {
        MongoQueryTranslator::translate(Some(&QueryFilter::Expr(expr))).unwrap()
    }

    #[test]
    fn empty_filter_matches_everything() {
        assert_eq!(MongoQueryTranslator::translate(None).unwrap(), doc! {});
    }

    #[test]
    fn exists_filter_on_nested_path() {
        assert_eq!(
            translate(Filter::exists("coordinate.lat")),
            doc! { "coordinate.lat": { "$exists": true } }
        );
    }

    #[test]
    fn negation_uses_nor() {
        assert_eq!(
            translate(Filter::eq("address", "22 Wall Street Avenue").not()),
            doc! { "$nor": [ { "address": { "$eq": "22 Wall Street Avenue" } } ] }
        );
    }

    #[test]
    fn values_are_compared_as_written() {
        assert_eq!(
            translate(Filter::eq("host", "example.com")),
            doc! { "host": { "$eq": "example.com" } }
        );
        assert_eq!(
            translate(Filter::eq("price.$usd", "a%2Eb")),
            doc! { "price.%24usd": { "$eq": "a%2Eb" } }
        );
    }

    #[test]
    fn native_filters_pass_through() {
        let native = doc! {
            "name": { "$regex": "^J" },
            "stops": { "$elemMatch": { "lat": { "$gt": 100 } } },
            "tags": { "$size": 2 },
        };

        assert_eq!(
            MongoQueryTranslator::translate(Some(&QueryFilter::Native(native.clone()))).unwrap(),
            native
        );
    }

    #[test]
    fn regex_metacharacters_are_escaped() {
        assert_eq!(
            translate(Filter::starts_with("name", "a.b")),
            doc! { "name": { "$regex": "^a\\.b" } }
        );
        assert_eq!(escape_regex("1+1"), "1\\+1");
    }

    #[test]
    fn starts_with_requires_a_string() {
        let filter = QueryFilter::Expr(Filter::starts_with("name", 3));

        assert!(matches!(
            MongoQueryTranslator::translate(Some(&filter)),
            Err(DocumentStoreError::InvalidFilter(_))
        ));
    }
}
