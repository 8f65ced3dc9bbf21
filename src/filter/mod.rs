//! Filter evaluation protocol
//!
//! A filter is a small per-record state machine the store drives once per
//! candidate during a scan, in three phases:
//!
//! 1. [`Filter::begin`] resets per-record state; returning false aborts the
//!    whole scan (how "find one" stops after its match).
//! 2. [`Filter::consider`] is called first with no key to request the
//!    filter's first field path; each answer is resolved by the store and
//!    supplied back in the next call, until the filter returns no further
//!    path. A path that resolves to "key not found" is surfaced as a null
//!    value. The empty path designates the record itself.
//! 3. [`Filter::end`] returns the verdict; the driving scan appends the
//!    record's offset to the query result when it is true.
//!
//! Filters never see raw bytes: field values arrive as [`FieldValue`],
//! which is either null, scalar text, or a lazy view of a nested node.

mod combine;
mod comparison;
mod count;
mod null;
mod within;

pub use combine::{AndFilter, FirstMatchFilter, OrFilter};
pub use comparison::{CompareOp, ComparisonFilter, Operand};
pub use count::CountFilter;
pub use null::{NotNullFilter, NullFilter};
pub use within::WithinFilter;

use crate::store::{StoreResult, View};

/// A field value handed to a filter during evaluation.
#[derive(Clone)]
pub enum FieldValue<'s> {
    /// Stored null, or a path that did not resolve.
    Null,
    /// Scalar token text.
    Scalar(String),
    /// A nested object or collection, unmaterialized.
    Node(View<'s>),
}

/// The three-phase per-record evaluation contract.
pub trait Filter {
    /// Resets per-record state. Returning false aborts the scan.
    fn begin(&mut self) -> bool;

    /// Requests and receives fields one at a time.
    ///
    /// Called first with `key = None` to obtain the first requested path;
    /// afterwards with the resolved `(key, value)` pair. Returns the next
    /// path the filter still needs, or `None` when it has enough.
    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>>;

    /// Final verdict for the record at `offset`.
    fn end(&mut self, offset: u64) -> bool;
}

impl<F: Filter + ?Sized> Filter for &mut F {
    fn begin(&mut self) -> bool {
        (**self).begin()
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        (**self).consider(key, value)
    }

    fn end(&mut self, offset: u64) -> bool {
        (**self).end(offset)
    }
}

impl<F: Filter + ?Sized> Filter for Box<F> {
    fn begin(&mut self) -> bool {
        (**self).begin()
    }

    fn consider(
        &mut self,
        key: Option<&str>,
        value: Option<FieldValue<'_>>,
    ) -> StoreResult<Option<String>> {
        (**self).consider(key, value)
    }

    fn end(&mut self, offset: u64) -> bool {
        (**self).end(offset)
    }
}
