//! Document-level error types
//!
//! These are local, recoverable errors: an invalid key or value is rejected
//! before anything is written, and a failed scalar conversion is reported
//! per accessor call.

use thiserror::Error;

/// Errors raised while building or converting documents.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DocumentError {
    /// Key does not match the permitted `[a-zA-Z0-9_]+` format.
    #[error("invalid key {0:?}: keys must match [a-zA-Z0-9_]+")]
    InvalidKey(String),

    /// A document root must be an object.
    #[error("document root must be a JSON object")]
    NotAnObject,
}

/// A requested scalar conversion does not fit the stored value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("value {value:?} cannot be read as {requested}")]
pub struct ValueTypeError {
    /// The conversion that was requested (e.g. "i64").
    pub requested: &'static str,
    /// Display form of the offending value.
    pub value: String,
}

impl ValueTypeError {
    pub(crate) fn new(requested: &'static str, value: impl Into<String>) -> Self {
        Self {
            requested,
            value: value.into(),
        }
    }
}
