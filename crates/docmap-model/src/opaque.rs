//! Binary-fallback values.
//!
//! Types with no field-level mapping can opt into being stored as an opaque
//! byte payload by wrapping them in [`Opaque`]. Serialization uses bincode.

use std::any::Any;
use std::fmt;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{ModelError, ModelResult};
use crate::model::FieldValue;
use crate::property::Property;

/// A value stored as a byte payload tagged with its type path.
pub trait OpaqueValue: Send + Sync + fmt::Debug {
    fn type_path(&self) -> &'static str;

    fn to_bytes(&self) -> ModelResult<Vec<u8>>;

    fn clone_opaque(&self) -> Box<dyn OpaqueValue>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl Clone for Box<dyn OpaqueValue> {
    fn clone(&self) -> Self {
        (**self).clone_opaque()
    }
}

/// Decoder for one opaque type, as kept by the type registry.
pub type OpaqueDecodeFn = fn(&[u8]) -> ModelResult<Box<dyn OpaqueValue>>;

/// Serde-backed opaque wrapper.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct Opaque<T>(pub T);

impl<T> Opaque<T>
where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
{
    /// Type path recorded alongside the payload.
    pub fn type_name() -> &'static str {
        std::any::type_name::<T>()
    }

    pub fn from_bytes(bytes: &[u8]) -> ModelResult<Self> {
        bincode::deserialize(bytes)
            .map(Opaque)
            .map_err(|e| ModelError::Serialization(e.to_string()))
    }

    pub fn into_inner(self) -> T {
        self.0
    }
}

impl<T> OpaqueValue for Opaque<T>
where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn type_path(&self) -> &'static str {
        Self::type_name()
    }

    fn to_bytes(&self) -> ModelResult<Vec<u8>> {
        bincode::serialize(&self.0).map_err(|e| ModelError::Serialization(e.to_string()))
    }

    fn clone_opaque(&self) -> Box<dyn OpaqueValue> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

/// Registry entry point: decode an `Opaque<T>` payload.
pub fn decode_opaque<T>(bytes: &[u8]) -> ModelResult<Box<dyn OpaqueValue>>
where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
{
    Ok(Box::new(Opaque::<T>::from_bytes(bytes)?))
}

impl<T> Property for Opaque<T>
where
    T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
{
    fn to_field(&self) -> FieldValue {
        FieldValue::Opaque(Box::new(self.clone()))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        match value {
            FieldValue::Opaque(boxed) => {
                if boxed.as_any().is::<Self>() {
                    boxed
                        .into_any()
                        .downcast::<Self>()
                        .map(|b| *b)
                        .map_err(|_| ModelError::TypeMismatch {
                            expected: Self::type_name(),
                            found: "opaque",
                        })
                } else {
                    let bytes = boxed.to_bytes()?;
                    Self::from_bytes(&bytes)
                }
            }
            other => Err(ModelError::TypeMismatch {
                expected: Self::type_name(),
                found: other.kind_name(),
            }),
        }
    }
}
