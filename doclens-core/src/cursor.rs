//! Lazy, typed traversal of distinct query results.
//!
//! A backend answers a distinct request with [`RawValues`], an ordered sequence of untyped
//! BSON values. [`DistinctIterator`] pulls one raw value at a time from that sequence and
//! converts it into the requested target type with the [`ValueConverter`].
//!
//! The iterator is forward-only and single-pass. It is `Open` until the source reports no
//! more elements (`Exhausted`) or fails (`Failed`); both terminal states behave the same:
//! [`DistinctIterator::has_next`] is `false` and [`DistinctIterator::next_value`] fails with
//! [`DocumentStoreError::NoSuchElement`]. The raw source is owned by the iterator and
//! released when it is dropped, whether or not it was exhausted.
//!
//! # Example
//!
//! ```ignore
//! let mut addresses = store
//!     .collection("users")
//!     .distinct::<String>("address", "")
//!     .await?;
//!
//! while addresses.has_next()? {
//!     println!("{}", addresses.next_value()?);
//! }
//! ```

use bson::Bson;
use std::{fmt, iter::FusedIterator, marker::PhantomData};

use crate::{
    convert::{FromRawValue, ValueConverter},
    error::{DocumentStoreError, DocumentStoreResult},
    value::RawValue,
};

/// The raw result sequence of a distinct command, in the order the store delivered it.
///
/// Each item is either the next raw value or the failure that prevented reading it.
pub type RawValues = Box<dyn Iterator<Item = DocumentStoreResult<Bson>> + Send>;

/// Wraps an already materialized list of values as a raw result sequence.
pub fn raw_values(values: Vec<Bson>) -> RawValues {
    Box::new(values.into_iter().map(Ok))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CursorState {
    Open,
    Exhausted,
    Failed,
}

/// A lazy, forward-only sequence of typed distinct values.
pub struct DistinctIterator<T> {
    source: RawValues,
    peeked: Option<Bson>,
    state: CursorState,
    position: usize,
    field: String,
    _marker: PhantomData<fn() -> T>,
}

impl<T: FromRawValue> DistinctIterator<T> {
    /// Creates an iterator over the raw values of a distinct request on `field`.
    pub fn new(field: impl Into<String>, source: RawValues) -> Self {
        Self {
            source,
            peeked: None,
            state: CursorState::Open,
            position: 0,
            field: field.into(),
            _marker: PhantomData,
        }
    }

    /// Returns the field path this iterator yields values of.
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Returns the number of raw values consumed so far, including failed conversions.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Returns `true` if at least one more raw value remains.
    ///
    /// The value is buffered, not consumed: repeated calls return the same answer until
    /// [`next_value`](Self::next_value) is called.
    ///
    /// # Errors
    ///
    /// Returns the source's error if reading ahead fails. The iterator is unusable
    /// afterwards.
    pub fn has_next(&mut self) -> DocumentStoreResult<bool> {
        if self.peeked.is_some() {
            return Ok(true);
        }
        if self.state != CursorState::Open {
            return Ok(false);
        }

        match self.source.next() {
            Some(Ok(raw)) => {
                self.peeked = Some(raw);
                Ok(true)
            }
            Some(Err(err)) => {
                tracing::warn!(
                    field = %self.field,
                    position = self.position,
                    error = %err,
                    "distinct source failed"
                );
                self.state = CursorState::Failed;
                Err(err)
            }
            None => {
                tracing::debug!(
                    field = %self.field,
                    count = self.position,
                    "distinct values exhausted"
                );
                self.state = CursorState::Exhausted;
                Ok(false)
            }
        }
    }

    /// Consumes the next raw value and converts it into `T`.
    ///
    /// # Errors
    ///
    /// - [`DocumentStoreError::NoSuchElement`] if no value remains.
    /// - [`DocumentStoreError::Conversion`] if the value cannot be converted; the iterator
    ///   stays positioned after the failed value.
    /// - The source's error if reading the value fails.
    pub fn next_value(&mut self) -> DocumentStoreResult<T> {
        if !self.has_next()? {
            return Err(DocumentStoreError::NoSuchElement);
        }

        let position = self.position;
        let raw = self
            .peeked
            .take()
            .ok_or(DocumentStoreError::NoSuchElement)?;
        self.position += 1;

        let converted = RawValue::try_from(raw).and_then(ValueConverter::convert::<T>);

        match converted {
            Ok(value) => {
                tracing::trace!(field = %self.field, position, "converted distinct value");
                Ok(value)
            }
            Err(err) => {
                tracing::warn!(
                    field = %self.field,
                    position,
                    target = %T::target_type(),
                    error = %err,
                    "distinct value conversion failed"
                );
                Err(err.at(position))
            }
        }
    }
}

impl<T: FromRawValue> Iterator for DistinctIterator<T> {
    type Item = DocumentStoreResult<T>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.has_next() {
            Ok(true) => Some(self.next_value()),
            Ok(false) => None,
            Err(err) => Some(Err(err)),
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.state {
            CursorState::Open => {
                let buffered = usize::from(self.peeked.is_some());
                let (lower, upper) = self.source.size_hint();
                (
                    lower.saturating_add(buffered),
                    upper.and_then(|u| u.checked_add(buffered)),
                )
            }
            _ => {
                let buffered = usize::from(self.peeked.is_some());
                (buffered, Some(buffered))
            }
        }
    }
}

impl<T: FromRawValue> FusedIterator for DistinctIterator<T> {}

impl<T> fmt::Debug for DistinctIterator<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DistinctIterator")
            .field("field", &self.field)
            .field("state", &self.state)
            .field("position", &self.position)
            .finish_non_exhaustive()
    }
}
