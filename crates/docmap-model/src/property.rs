//! Conversions between Rust field types and [`FieldValue`].
//!
//! `from_field` expects values the decoder has already coerced to the
//! declared field kind. It only performs the lossless widenings the
//! decoder relies on (integers into floats, integral floats into integers).

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use docmap_types::{Document, EntityId, IdValue, Value};

use crate::error::{ModelError, ModelResult};
use crate::model::{AnyModel, FieldValue};
use crate::reference::ReferenceCell;

/// A Rust type usable as a model field.
pub trait Property: Sized {
    fn to_field(&self) -> FieldValue;

    fn from_field(value: FieldValue) -> ModelResult<Self>;
}

/// Byte string stored as a binary value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct Bytes(pub Vec<u8>);

fn mismatch(expected: &'static str, found: &FieldValue) -> ModelError {
    ModelError::TypeMismatch {
        expected,
        found: found.kind_name(),
    }
}

impl Property for bool {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Bool(*self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::Bool(b)) => Ok(b),
            other => Err(mismatch("bool", &other)),
        }
    }
}

fn integral(value: &FieldValue, target: &'static str) -> ModelResult<i64> {
    match value {
        FieldValue::Scalar(Value::Int(i)) => Ok(*i),
        FieldValue::Scalar(Value::Float(f)) if f.fract() == 0.0 && f.is_finite() => {
            if *f >= i64::MIN as f64 && *f <= i64::MAX as f64 {
                Ok(*f as i64)
            } else {
                Err(ModelError::OutOfRange {
                    value: f.to_string(),
                    target,
                })
            }
        }
        other => Err(mismatch(target, other)),
    }
}

impl Property for i32 {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Int(i64::from(*self)))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        let wide = integral(&value, "i32")?;
        i32::try_from(wide).map_err(|_| ModelError::OutOfRange {
            value: wide.to_string(),
            target: "i32",
        })
    }
}

impl Property for i64 {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Int(*self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        integral(&value, "i64")
    }
}

impl Property for f64 {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Float(*self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        value
            .as_scalar()
            .and_then(Value::as_f64)
            .ok_or_else(|| mismatch("f64", &value))
    }
}

impl Property for f32 {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Float(f64::from(*self)))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        let wide = f64::from_field(value)?;
        if wide.is_finite() && wide.abs() > f64::from(f32::MAX) {
            return Err(ModelError::OutOfRange {
                value: wide.to_string(),
                target: "f32",
            });
        }
        Ok(wide as f32)
    }
}

impl Property for String {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::String(self.clone()))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::String(s)) => Ok(s),
            other => Err(mismatch("string", &other)),
        }
    }
}

impl Property for DateTime<Utc> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::DateTime(*self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::DateTime(dt)) => Ok(dt),
            other => Err(mismatch("datetime", &other)),
        }
    }
}

impl Property for NaiveDate {
    fn to_field(&self) -> FieldValue {
        let midnight = self.and_time(NaiveTime::default());
        FieldValue::Scalar(Value::DateTime(Utc.from_utc_datetime(&midnight)))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::DateTime(dt)) => Ok(dt.date_naive()),
            other => Err(mismatch("date", &other)),
        }
    }
}

impl Property for EntityId {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Id(*self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::Id(id)) => Ok(id),
            other => Err(mismatch("id", &other)),
        }
    }
}

impl Property for IdValue {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(self.to_value())
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match &value {
            FieldValue::Scalar(v) => IdValue::from_value(v).ok_or_else(|| mismatch("id", &value)),
            other => Err(mismatch("id", other)),
        }
    }
}

impl Property for Bytes {
    fn to_field(&self) -> FieldValue {
        FieldValue::Scalar(Value::Binary(self.0.clone()))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Scalar(Value::Binary(bytes)) => Ok(Bytes(bytes)),
            other => Err(mismatch("binary", &other)),
        }
    }
}

impl Property for Document {
    fn to_field(&self) -> FieldValue {
        FieldValue::Document(self.clone())
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Document(doc) => Ok(doc),
            FieldValue::Scalar(Value::Document(doc)) => Ok(doc),
            other => Err(mismatch("document", &other)),
        }
    }
}

impl Property for FieldValue {
    fn to_field(&self) -> FieldValue {
        self.clone()
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        Ok(value)
    }
}

impl Property for Box<dyn AnyModel> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Object(self.clone())
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Object(obj) => Ok(obj),
            other => Err(mismatch("object", &other)),
        }
    }
}

impl Property for Arc<ReferenceCell> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Reference(Arc::clone(self))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Reference(cell) => Ok(cell),
            FieldValue::Object(obj) => Ok(Arc::new(ReferenceCell::from_model(obj))),
            other => Err(mismatch("reference", &other)),
        }
    }
}

impl<T: Property> Property for Option<T> {
    fn to_field(&self) -> FieldValue {
        match self {
            Some(value) => value.to_field(),
            None => FieldValue::Null,
        }
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_field(value).map(Some)
        }
    }
}

impl<T: Property> Property for Vec<T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::List(self.iter().map(Property::to_field).collect())
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::List(items) => items.into_iter().map(T::from_field).collect(),
            other => Err(mismatch("list", &other)),
        }
    }
}

impl<T: Property> Property for BTreeMap<String, T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Map(
            self.iter()
                .map(|(k, v)| (k.clone(), v.to_field()))
                .collect(),
        )
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_field(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}

impl<T: Property> Property for HashMap<String, T> {
    fn to_field(&self) -> FieldValue {
        let mut entries: Vec<(String, FieldValue)> = self
            .iter()
            .map(|(k, v)| (k.clone(), v.to_field()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        FieldValue::Map(entries)
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Map(entries) => entries
                .into_iter()
                .map(|(k, v)| T::from_field(v).map(|v| (k, v)))
                .collect(),
            other => Err(mismatch("map", &other)),
        }
    }
}
