//! Document value model for nestdb
//!
//! In-memory representation of stored documents. The value space is a
//! closed, recursive four-way tag set:
//!
//! - `Null`
//! - `Scalar` — a numeric-or-string token, kept as text and parsed on demand
//! - `Object` — a map from validated key to value
//! - `Collection` — an ordered sequence of values
//!
//! Pure data, no I/O. The textual JSON adapter (serde_json conversions)
//! lives in [`json`]; the store consumes and produces these types without
//! ever touching JSON text itself.

mod errors;
pub mod json;
mod value;

pub use errors::{DocumentError, ValueTypeError};
pub use value::{validate_key, Document, Value};
