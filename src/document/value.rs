//! Value and Document types
//!
//! Scalars are stored as text and parsed on demand, which keeps the model
//! free of numeric-precision policy: `12`, `12.0` and `"12"` are all the
//! token the caller wrote, until an accessor asks for a number.

use std::collections::btree_map;
use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;

use super::errors::{DocumentError, ValueTypeError};

static KEY_PATTERN: OnceLock<Regex> = OnceLock::new();

fn key_pattern() -> &'static Regex {
    KEY_PATTERN.get_or_init(|| Regex::new("^[a-zA-Z0-9_]+$").expect("key pattern is valid"))
}

/// Validates an object key against the permitted `[a-zA-Z0-9_]+` format.
pub fn validate_key(key: &str) -> Result<(), DocumentError> {
    if key_pattern().is_match(key) {
        Ok(())
    } else {
        Err(DocumentError::InvalidKey(key.to_string()))
    }
}

/// A stored value: the closed, recursive four-way tag set.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Scalar(String),
    Object(Document),
    Collection(Vec<Value>),
}

impl Value {
    /// Returns true for `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Returns the scalar text, if this is a scalar.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Scalar(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Returns the nested document, if this is an object.
    pub fn as_object(&self) -> Option<&Document> {
        match self {
            Value::Object(doc) => Some(doc),
            _ => None,
        }
    }

    /// Returns the nested elements, if this is a collection.
    pub fn as_collection(&self) -> Option<&[Value]> {
        match self {
            Value::Collection(items) => Some(items),
            _ => None,
        }
    }

    /// Parses the scalar text as an `i64`.
    pub fn as_i64(&self) -> Result<i64, ValueTypeError> {
        let text = self.scalar_for("i64")?;
        text.parse::<i64>()
            .map_err(|_| ValueTypeError::new("i64", text))
    }

    /// Parses the scalar text as an `f64`.
    pub fn as_f64(&self) -> Result<f64, ValueTypeError> {
        let text = self.scalar_for("f64")?;
        text.parse::<f64>()
            .map_err(|_| ValueTypeError::new("f64", text))
    }

    /// Parses the scalar text as a `bool` (`true` / `false`).
    pub fn as_bool(&self) -> Result<bool, ValueTypeError> {
        let text = self.scalar_for("bool")?;
        match text {
            "true" => Ok(true),
            "false" => Ok(false),
            other => Err(ValueTypeError::new("bool", other)),
        }
    }

    fn scalar_for(&self, requested: &'static str) -> Result<&str, ValueTypeError> {
        self.as_text()
            .ok_or_else(|| ValueTypeError::new(requested, format!("{:?}", self)))
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Scalar(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Scalar(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Scalar(n.to_string())
    }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self {
        Value::Scalar(n.to_string())
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Scalar(n.to_string())
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Scalar(b.to_string())
    }
}

impl From<Document> for Value {
    fn from(doc: Document) -> Self {
        Value::Object(doc)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Collection(items)
    }
}

/// An object value: a map from validated key to [`Value`].
///
/// Field order is deterministic (sorted by key); insertion order is not
/// preserved and is not part of the stored format's contract.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Document {
    fields: BTreeMap<String, Value>,
}

impl Document {
    /// Creates an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a field, validating the key format.
    pub fn set(
        &mut self,
        key: impl Into<String>,
        value: impl Into<Value>,
    ) -> Result<(), DocumentError> {
        let key = key.into();
        validate_key(&key)?;
        self.fields.insert(key, value.into());
        Ok(())
    }

    /// Returns the value for a key, if present.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Returns whether the key is present.
    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    /// Number of fields.
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Returns true when the document has no fields.
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Iterates fields in key order.
    pub fn iter(&self) -> btree_map::Iter<'_, String, Value> {
        self.fields.iter()
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = (&'a String, &'a Value);
    type IntoIter = btree_map::Iter<'a, String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.iter()
    }
}
