//! JSON adapter for the document value model
//!
//! Converts between `serde_json::Value` and [`Value`]. This is the only
//! place JSON text semantics appear; the store itself never sees JSON.
//!
//! Mapping:
//! - JSON null → `Value::Null`
//! - JSON number / bool / string → `Value::Scalar` (token text)
//! - JSON array → `Value::Collection`
//! - JSON object → `Value::Object` (keys validated)
//!
//! Going back out, scalar tokens that read as JSON numbers or booleans are
//! emitted as such, so `from_json(to_json(v)) == v` for every valid value.

use serde_json::{Map, Number, Value as Json};

use super::errors::DocumentError;
use super::value::{Document, Value};

/// Converts a JSON value into a document value.
pub fn from_json(json: &Json) -> Result<Value, DocumentError> {
    match json {
        Json::Null => Ok(Value::Null),
        Json::Bool(b) => Ok(Value::Scalar(b.to_string())),
        Json::Number(n) => Ok(Value::Scalar(n.to_string())),
        Json::String(s) => Ok(Value::Scalar(s.clone())),
        Json::Array(items) => {
            let mut out = Vec::with_capacity(items.len());
            for item in items {
                out.push(from_json(item)?);
            }
            Ok(Value::Collection(out))
        }
        Json::Object(map) => {
            let mut doc = Document::new();
            for (key, value) in map {
                doc.set(key.clone(), from_json(value)?)?;
            }
            Ok(Value::Object(doc))
        }
    }
}

/// Converts a JSON object into a [`Document`].
///
/// The root of an insertable record must be an object.
pub fn document_from_json(json: &Json) -> Result<Document, DocumentError> {
    match from_json(json)? {
        Value::Object(doc) => Ok(doc),
        _ => Err(DocumentError::NotAnObject),
    }
}

/// Converts a document value into a JSON value.
pub fn to_json(value: &Value) -> Json {
    match value {
        Value::Null => Json::Null,
        Value::Scalar(text) => scalar_to_json(text),
        Value::Object(doc) => {
            let mut map = Map::new();
            for (key, value) in doc {
                map.insert(key.clone(), to_json(value));
            }
            Json::Object(map)
        }
        Value::Collection(items) => Json::Array(items.iter().map(to_json).collect()),
    }
}

/// Converts a [`Document`] into a JSON object.
pub fn document_to_json(doc: &Document) -> Json {
    to_json(&Value::Object(doc.clone()))
}

fn scalar_to_json(text: &str) -> Json {
    match text {
        "true" => return Json::Bool(true),
        "false" => return Json::Bool(false),
        _ => {}
    }

    // Only tokens that survive a JSON-number round trip come back out as
    // numbers; anything else stays a string.
    if let Ok(n) = text.parse::<Number>() {
        if n.to_string() == text {
            return Json::Number(n);
        }
    }

    Json::String(text.to_string())
}
