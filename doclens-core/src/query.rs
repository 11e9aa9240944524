//! Filter expressions narrowing which documents contribute distinct values.
//!
//! This module provides the filter expression AST, a fluent constructor API, a visitor
//! pattern used by backends to evaluate or translate filters, and [`DistinctFilter`], the
//! filter argument accepted by `distinct`.
//!
//! # Filter Expression API
//!
//! The [`Filter`] struct provides a collection of static methods for building filter expressions:
//!
//! - Comparison: `eq`, `ne`, `gt`, `gte`, `lt`, `lte`
//! - String: `starts_with`, `ends_with`, `contains`, `not_contains`
//! - Existence: `exists`, `not_exists`
//! - Array: `any_of`, `none_of`
//! - Logical: `and`, `or`
//!
//! Expressions can be combined using chainable methods for more complex queries.
//!
//! # Native filters
//!
//! Filters can also be given in the store's native syntax, either as a document or as its
//! text. Text is read as JSON5, so the shell form with bare keys is accepted:
//!
//! ```ignore
//! use doclens::query::{DistinctFilter, QueryFilter};
//!
//! let filter = DistinctFilter::from("{address:{$exists:true}}").resolve()?;
//! // Some(QueryFilter::Native(doc! { "address": { "$exists": true } }))
//! ```
//!
//! Native documents are handed to the backend as they are. Backends with their own query
//! engine run them directly; the others translate them into an [`Expr`] with
//! [`QueryFilter::to_expr`].
//!
//! An empty filter (`""`, `{}` or [`DistinctFilter::All`]) applies no restriction.

use bson::{Bson, Document};

use crate::error::{DocumentStoreError, DocumentStoreResult};

/// Field comparison operators for filter expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOp {
    /// Equal to (exact match).
    Eq,
    /// Not equal to.
    Ne,
    /// Greater than.
    Gt,
    /// Greater than or equal to.
    Gte,
    /// Less than.
    Lt,
    /// Less than or equal to.
    Lte,
    /// String or array contains value.
    Contains,
    /// String or array does not contain value.
    NotContains,
    /// String starts with value.
    StartsWith,
    /// String ends with value.
    EndsWith,
    /// Field value is any of the values.
    AnyOf,
    /// Field value is none of the values.
    NoneOf,
}

/// A filter expression for selecting documents.
///
/// Expressions can be combined using logical operators (`And`, `Or`, `Not`)
/// to build complex filter predicates. Field names may be dotted paths into
/// nested documents.
///
/// # Example
///
/// ```ignore
/// use doclens::query::{Expr, Filter};
///
/// // Simple equality check
/// let expr1 = Filter::eq("status", "active");
///
/// // Complex nested expression
/// let expr2 = Filter::and(vec![
///     Filter::eq("status", "active"),
///     Filter::gt("coordinate.lat", 18)
/// ]);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Logical AND of multiple expressions (all must match).
    And(Vec<Expr>),
    /// Logical OR of multiple expressions (any must match).
    Or(Vec<Expr>),
    /// Logical NOT of an expression (inverts the result).
    Not(Box<Expr>),
    /// Checks if a field exists or doesn't exist.
    Exists(String, bool),
    /// Field comparison expression.
    Field {
        /// The field name to compare.
        field: String,
        /// The comparison operator.
        op: FieldOp,
        /// The value to compare against.
        value: Bson,
    },
}

impl Expr {
    /// Creates a field comparison expression.
    pub fn field(field: String, op: FieldOp, value: Bson) -> Self {
        Expr::Field { field, op, value }
    }

    /// Combines this expression with another using logical AND.
    ///
    /// If this expression is already an AND, the other expression is appended
    /// to the list. Otherwise, a new AND expression is created.
    pub fn and(self, other: Expr) -> Self {
        match self {
            Expr::And(mut list) => {
                list.push(other);
                Expr::And(list)
            }
            _ => Expr::And(vec![self, other]),
        }
    }

    /// Combines this expression with another using logical OR.
    ///
    /// If this expression is already an OR, the other expression is appended
    /// to the list. Otherwise, a new OR expression is created.
    pub fn or(self, other: Expr) -> Self {
        match self {
            Expr::Or(mut list) => {
                list.push(other);
                Expr::Or(list)
            }
            _ => Expr::Or(vec![self, other]),
        }
    }

    /// Negates this expression (logical NOT).
    pub fn not(self) -> Self {
        Expr::Not(Box::new(self))
    }

    /// Translates a filter document in the store's native query syntax.
    ///
    /// Supported: implicit equality (`{ field: value }`), the comparison operators
    /// `$eq`, `$ne`, `$gt`, `$gte`, `$lt`, `$lte`, `$in`, `$nin`, `$exists`, field-level
    /// `$not`, and the logical operators `$and`, `$or`, `$nor`. Several entries in one
    /// document are combined with AND. Returns `None` for an empty document.
    pub fn from_native(document: &Document) -> DocumentStoreResult<Option<Expr>> {
        let mut exprs = document
            .iter()
            .map(|(key, value)| native_entry(key, value))
            .collect::<DocumentStoreResult<Vec<_>>>()?;

        Ok(match exprs.len() {
            0 => None,
            1 => exprs.pop(),
            _ => Some(Expr::And(exprs)),
        })
    }
}

fn invalid(message: impl Into<String>) -> DocumentStoreError {
    DocumentStoreError::InvalidFilter(message.into())
}

fn native_entry(key: &str, value: &Bson) -> DocumentStoreResult<Expr> {
    match key {
        "$and" => Ok(Expr::And(native_list(key, value)?)),
        "$or" => Ok(Expr::Or(native_list(key, value)?)),
        "$nor" => Ok(Expr::Or(native_list(key, value)?).not()),
        op if op.starts_with('$') => Err(invalid(format!("unsupported top-level operator {op}"))),
        field => match value {
            Bson::Document(ops) if ops.keys().next().is_some_and(|k| k.starts_with('$')) => {
                native_operators(field, ops)
            }
            value => Ok(Filter::eq(field, value.clone())),
        },
    }
}

fn native_list(op: &str, value: &Bson) -> DocumentStoreResult<Vec<Expr>> {
    let Bson::Array(items) = value else {
        return Err(invalid(format!("{op} expects an array of filter documents")));
    };

    items
        .iter()
        .map(|item| match item {
            Bson::Document(doc) => Ok(Expr::from_native(doc)?.unwrap_or_else(|| Expr::And(vec![]))),
            _ => Err(invalid(format!("{op} expects an array of filter documents"))),
        })
        .collect()
}

fn native_operators(field: &str, ops: &Document) -> DocumentStoreResult<Expr> {
    let mut exprs = ops
        .iter()
        .map(|(op, value)| {
            Ok(match op.as_str() {
                "$eq" => Filter::eq(field, value.clone()),
                "$ne" => Filter::ne(field, value.clone()),
                "$gt" => Filter::gt(field, value.clone()),
                "$gte" => Filter::gte(field, value.clone()),
                "$lt" => Filter::lt(field, value.clone()),
                "$lte" => Filter::lte(field, value.clone()),
                "$in" => Filter::any_of(field, value.clone()),
                "$nin" => Filter::none_of(field, value.clone()),
                "$exists" => Expr::Exists(field.to_string(), truthy(value)),
                "$not" => match value {
                    Bson::Document(inner) => native_operators(field, inner)?.not(),
                    _ => return Err(invalid("$not expects an operator document")),
                },
                other => return Err(invalid(format!("unsupported operator {other} on {field}"))),
            })
        })
        .collect::<DocumentStoreResult<Vec<_>>>()?;

    Ok(match exprs.len() {
        1 => exprs.remove(0),
        _ => Expr::And(exprs),
    })
}

fn truthy(value: &Bson) -> bool {
    match value {
        Bson::Boolean(b) => *b,
        Bson::Int32(i) => *i != 0,
        Bson::Int64(i) => *i != 0,
        Bson::Double(d) => *d != 0.0,
        Bson::Null | Bson::Undefined => false,
        _ => true,
    }
}

/// A resolved filter, as handed to [`StoreBackend::distinct_values`](crate::backend::StoreBackend::distinct_values).
#[derive(Debug, Clone, PartialEq)]
pub enum QueryFilter {
    Expr(Expr),
    /// A document in the store's native query syntax, passed through unchanged.
    Native(Document),
}

impl QueryFilter {
    /// Translates this filter into an expression, for backends that evaluate filters
    /// themselves.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] if a native document uses operators
    /// [`Expr::from_native`] does not know.
    pub fn to_expr(&self) -> DocumentStoreResult<Option<Expr>> {
        match self {
            QueryFilter::Expr(expr) => Ok(Some(expr.clone())),
            QueryFilter::Native(document) => Expr::from_native(document),
        }
    }
}

/// The filter argument of a distinct request.
///
/// Converts from the forms callers usually hold: a structured [`Expr`], a native filter
/// document, or the text of one. Text is parsed when the request is issued, so malformed
/// text is reported by `distinct` itself.
#[derive(Debug, Clone, Default)]
pub enum DistinctFilter {
    /// No restriction.
    #[default]
    All,
    Expr(Expr),
    Native(Document),
    Text(String),
}

impl DistinctFilter {
    /// Resolves this filter into what a backend receives; `None` applies no restriction.
    ///
    /// # Errors
    ///
    /// Returns [`DocumentStoreError::InvalidFilter`] if the text is not a JSON5 document.
    pub fn resolve(self) -> DocumentStoreResult<Option<QueryFilter>> {
        let document = match self {
            DistinctFilter::All => return Ok(None),
            DistinctFilter::Expr(expr) => return Ok(Some(QueryFilter::Expr(expr))),
            DistinctFilter::Native(document) => document,
            DistinctFilter::Text(text) if text.trim().is_empty() => return Ok(None),
            DistinctFilter::Text(text) => {
                json5::from_str::<Document>(&text).map_err(|e| invalid(format!("{text}: {e}")))?
            }
        };

        Ok((!document.is_empty()).then_some(QueryFilter::Native(document)))
    }
}

impl From<&str> for DistinctFilter {
    fn from(text: &str) -> Self {
        DistinctFilter::Text(text.to_string())
    }
}

impl From<String> for DistinctFilter {
    fn from(text: String) -> Self {
        DistinctFilter::Text(text)
    }
}

impl From<Expr> for DistinctFilter {
    fn from(expr: Expr) -> Self {
        DistinctFilter::Expr(expr)
    }
}

impl From<Option<Expr>> for DistinctFilter {
    fn from(expr: Option<Expr>) -> Self {
        expr.map_or(DistinctFilter::All, DistinctFilter::Expr)
    }
}

impl From<Document> for DistinctFilter {
    fn from(document: Document) -> Self {
        DistinctFilter::Native(document)
    }
}

/// Helper struct for constructing filter expressions.
///
/// Provides static methods to construct common filter expressions in a type-safe manner.
/// All methods accept field names and values as `Into<String>` and `Into<Bson>` for ergonomics.
///
/// # Example
///
/// ```ignore
/// use doclens::query::Filter;
///
/// let expr = Filter::eq("name", "Alice")
///     .and(Filter::gt("age", 18));
/// ```
pub struct Filter;

impl Filter {
    /// Creates an equality filter expression.
    pub fn eq(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Eq, value.into())
    }

    /// Creates a not-equal filter expression.
    pub fn ne(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Ne, value.into())
    }

    /// Creates a greater-than filter expression.
    pub fn gt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gt, value.into())
    }

    /// Creates a greater-than-or-equal filter expression.
    pub fn gte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Gte, value.into())
    }

    /// Creates a less-than filter expression.
    pub fn lt(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lt, value.into())
    }

    /// Creates a less-than-or-equal filter expression.
    pub fn lte(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Lte, value.into())
    }

    /// Creates a string prefix filter expression.
    pub fn starts_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::StartsWith, value.into())
    }

    /// Creates a string suffix filter expression.
    pub fn ends_with(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::EndsWith, value.into())
    }

    /// Creates a contains filter expression.
    ///
    /// Matches documents where the field (string or array) contains the specified value.
    pub fn contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::Contains, value.into())
    }

    /// Creates a not-contains filter expression.
    pub fn not_contains(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NotContains, value.into())
    }

    /// Creates an existence filter expression.
    ///
    /// Matches documents where the field is present.
    pub fn exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), true)
    }

    /// Creates a non-existence filter expression.
    pub fn not_exists(field: impl Into<String>) -> Expr {
        Expr::Exists(field.into(), false)
    }

    /// Creates a logical AND filter expression.
    pub fn and(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::And(exprs.into_iter().collect())
    }

    /// Creates a logical OR filter expression.
    pub fn or(exprs: impl IntoIterator<Item = Expr>) -> Expr {
        Expr::Or(exprs.into_iter().collect())
    }

    /// Creates a membership filter expression.
    ///
    /// Matches documents where the field (or any element of an array field) equals one of
    /// the specified values.
    pub fn any_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::AnyOf, value.into())
    }

    /// Creates an exclusion filter expression.
    pub fn none_of(field: impl Into<String>, value: impl Into<Bson>) -> Expr {
        Expr::field(field.into(), FieldOp::NoneOf, value.into())
    }
}

pub trait QueryVisitor {
    type Output;
    type Error: Into<DocumentStoreError>;

    fn visit_and(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_or(&mut self, exprs: &[Expr]) -> Result<Self::Output, Self::Error>;
    fn visit_not(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error>;
    fn visit_exists(
        &mut self,
        field: &str,
        should_exist: bool,
    ) -> Result<Self::Output, Self::Error>;
    fn visit_field(
        &mut self,
        field: &str,
        op: &FieldOp,
        value: &Bson,
    ) -> Result<Self::Output, Self::Error>;

    fn visit_expr(&mut self, expr: &Expr) -> Result<Self::Output, Self::Error> {
        match expr {
            Expr::And(exprs) => self.visit_and(exprs),
            Expr::Or(exprs) => self.visit_or(exprs),
            Expr::Not(expr) => self.visit_not(expr),
            Expr::Exists(field, should_exist) => self.visit_exists(field, *should_exist),
            Expr::Field { field, op, value } => self.visit_field(field, op, value),
        }
    }
}
