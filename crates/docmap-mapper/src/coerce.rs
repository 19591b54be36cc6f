//! Scalar coercion table.
//!
//! Stored values do not always have the kind their field declares: numbers
//! are written by other clients with a different width, dates arrive as
//! strings or epoch milliseconds, ids as hex text. Every function here
//! returns the canonical stored form for the declared kind, or `None` when
//! no conversion exists.
//!
//! Date strings are recognized by their literal shape:
//!
//! - 8 digits -- `yyyyMMdd`
//! - contains `-` -- `yyyy-MM-dd`, or an RFC 3339 timestamp
//! - contains `.` -- `dd.MM.yyyy`
//! - any other run of digits -- epoch milliseconds

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use docmap_model::{IdRepr, ScalarKind};
use docmap_types::{EntityId, Value};

/// Convert `value` into the stored form of `kind`.
///
/// Null passes through for every kind.
pub fn coerce_scalar(value: &Value, kind: ScalarKind) -> Option<Value> {
    if value.is_null() {
        return Some(Value::Null);
    }
    match kind {
        ScalarKind::Bool => to_bool(value).map(Value::Bool),
        ScalarKind::I32 => to_integer(value)
            .filter(|i| i32::try_from(*i).is_ok())
            .map(Value::Int),
        ScalarKind::I64 => to_integer(value).map(Value::Int),
        ScalarKind::F32 => to_float(value)
            .filter(|f| !f.is_finite() || f.abs() <= f64::from(f32::MAX))
            .map(Value::Float),
        ScalarKind::F64 => to_float(value).map(Value::Float),
        ScalarKind::String => to_text(value).map(Value::String),
        ScalarKind::DateTime => to_datetime(value).map(Value::DateTime),
        ScalarKind::Date => to_datetime(value)
            .map(|dt| Utc.from_utc_datetime(&dt.date_naive().and_time(NaiveTime::default())))
            .map(Value::DateTime),
        ScalarKind::Binary => to_binary(value).map(Value::Binary),
    }
}

/// Convert a stored id into the representation an id field declares.
pub fn coerce_id(value: &Value, repr: IdRepr) -> Option<Value> {
    match (repr, value) {
        (_, Value::Null) => Some(Value::Null),
        (IdRepr::Opaque, Value::Id(id)) => Some(Value::Id(*id)),
        (IdRepr::Opaque, Value::String(text)) => EntityId::from_hex(text).ok().map(Value::Id),
        (IdRepr::Text, Value::Id(id)) => Some(Value::String(id.to_hex())),
        (IdRepr::Text, Value::String(text)) => Some(Value::String(text.clone())),
        (IdRepr::Text, Value::Int(i)) => Some(Value::String(i.to_string())),
        _ => None,
    }
}

fn to_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            _ => None,
        },
        _ => None,
    }
}

/// Integral values only: `8.0` narrows to `8`, `8.5` does not.
fn to_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Int(i) => Some(*i),
        Value::Float(f) => integral_float(*f),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral_float))
        }
        _ => None,
    }
}

fn integral_float(f: f64) -> Option<i64> {
    let in_range = f >= i64::MIN as f64 && f <= i64::MAX as f64;
    (f.is_finite() && f.fract() == 0.0 && in_range).then_some(f as i64)
}

fn to_float(value: &Value) -> Option<f64> {
    match value {
        Value::Float(f) => Some(*f),
        Value::Int(i) => Some(*i as f64),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn to_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Int(i) => Some(i.to_string()),
        Value::Float(f) => Some(f.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Id(id) => Some(id.to_hex()),
        _ => None,
    }
}

fn to_binary(value: &Value) -> Option<Vec<u8>> {
    match value {
        Value::Binary(bytes) => Some(bytes.clone()),
        Value::String(s) => STANDARD.decode(s).ok(),
        _ => None,
    }
}

fn to_datetime(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::DateTime(dt) => Some(*dt),
        Value::Int(millis) => Utc.timestamp_millis_opt(*millis).single(),
        Value::String(s) => parse_date(s.trim()),
        _ => None,
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn at_midnight(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

/// Parse a date string by its literal shape.
pub fn parse_date(text: &str) -> Option<DateTime<Utc>> {
    if text.len() == 8 && all_digits(text) {
        return NaiveDate::parse_from_str(text, "%Y%m%d").ok().map(at_midnight);
    }
    if let Some(rest) = text.strip_prefix('-') {
        if all_digits(rest) {
            return text
                .parse::<i64>()
                .ok()
                .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
        }
    }
    if text.contains('-') {
        return NaiveDate::parse_from_str(text, "%Y-%m-%d")
            .ok()
            .map(at_midnight)
            .or_else(|| {
                DateTime::parse_from_rfc3339(text)
                    .ok()
                    .map(|dt| dt.with_timezone(&Utc))
            });
    }
    if text.contains('.') {
        return NaiveDate::parse_from_str(text, "%d.%m.%Y").ok().map(at_midnight);
    }
    if all_digits(text) {
        return text
            .parse::<i64>()
            .ok()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single());
    }
    None
}
