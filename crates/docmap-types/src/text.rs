//! Generic text format: a pure JSON rendering of a [`Document`].
//!
//! Rendering rules for values JSON has no native form for:
//!
//! - [`Value::Id`] renders as its 24-character hex string
//! - [`Value::DateTime`] renders as epoch milliseconds
//! - [`Value::Binary`] renders as a standard base64 string
//! - [`Value::Reference`] renders as its marker document
//!
//! Parsing is the plain JSON grammar. Integers become [`Value::Int`], other
//! numbers [`Value::Float`]. No key is given extra meaning, so the decoder
//! coerces strings and numbers into ids and dates.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::{Map, Number};

use crate::document::Document;
use crate::error::TypeError;
use crate::value::Value;

/// Parse JSON text into a document.
pub fn parse_document(text: &str) -> Result<Document, TypeError> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| TypeError::InvalidText(e.to_string()))?;
    match from_json(json) {
        Value::Document(doc) => Ok(doc),
        other => Err(TypeError::NotADocument(other.kind_name())),
    }
}

/// Parse JSON text into a value of any kind.
pub fn parse_value(text: &str) -> Result<Value, TypeError> {
    let json: serde_json::Value =
        serde_json::from_str(text).map_err(|e| TypeError::InvalidText(e.to_string()))?;
    Ok(from_json(json))
}

/// Render a document as compact JSON text.
pub fn render_document(doc: &Document) -> String {
    document_to_json(doc).to_string()
}

/// Render a document as indented JSON text.
pub fn render_document_pretty(doc: &Document) -> String {
    let json = document_to_json(doc);
    serde_json::to_string_pretty(&json).unwrap_or_else(|_| json.to_string())
}

/// Convert a value into its JSON form.
pub fn to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => serde_json::Value::Bool(*b),
        Value::Int(i) => serde_json::Value::Number(Number::from(*i)),
        Value::Float(f) => Number::from_f64(*f)
            .map(serde_json::Value::Number)
            .unwrap_or(serde_json::Value::Null),
        Value::String(s) => serde_json::Value::String(s.clone()),
        Value::Id(id) => serde_json::Value::String(id.to_hex()),
        Value::DateTime(dt) => serde_json::Value::Number(Number::from(dt.timestamp_millis())),
        Value::Binary(bytes) => serde_json::Value::String(STANDARD.encode(bytes)),
        Value::Document(doc) => document_to_json(doc),
        Value::List(items) => serde_json::Value::Array(items.iter().map(to_json).collect()),
        Value::Reference(marker) => document_to_json(&marker.to_document()),
    }
}

/// Convert parsed JSON into a value.
pub fn from_json(json: serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => n.as_f64().map_or(Value::Null, Value::Float),
        },
        serde_json::Value::String(s) => Value::String(s),
        serde_json::Value::Array(items) => Value::List(items.into_iter().map(from_json).collect()),
        serde_json::Value::Object(map) => Value::Document(
            map.into_iter()
                .map(|(k, v)| (k, from_json(v)))
                .collect(),
        ),
    }
}

fn document_to_json(doc: &Document) -> serde_json::Value {
    let mut map = Map::with_capacity(doc.len());
    for (key, value) in doc.iter() {
        map.insert(key.to_string(), to_json(value));
    }
    serde_json::Value::Object(map)
}

impl Document {
    /// Parse a document from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, TypeError> {
        parse_document(text)
    }

    /// Render this document as compact JSON text.
    pub fn to_json_string(&self) -> String {
        render_document(self)
    }
}
