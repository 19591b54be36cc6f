use std::any::Any;
use std::fmt;
use std::sync::Arc;

use docmap_types::{Document, Value};

use crate::error::{ModelError, ModelResult};
use crate::opaque::OpaqueValue;
use crate::reference::ReferenceCell;
use crate::schema::TypeSchema;

/// A persistable type.
///
/// Implementations declare their schema once and expose their fields by
/// name. `get_field` returns `None` only for unknown names; a field that
/// holds nothing returns `Some(FieldValue::Null)`.
pub trait Model: Clone + Send + Sync + fmt::Debug + 'static {
    /// Fully-qualified type path, e.g. `shop::Order`.
    const TYPE_PATH: &'static str;

    fn schema() -> TypeSchema;

    fn get_field(&self, name: &str) -> Option<FieldValue>;

    fn set_field(&mut self, name: &str, value: FieldValue) -> ModelResult<()>;
}

/// Object-safe view of a [`Model`].
pub trait AnyModel: Send + Sync + fmt::Debug + 'static {
    fn type_path(&self) -> &'static str;

    fn field(&self, name: &str) -> Option<FieldValue>;

    fn set(&mut self, name: &str, value: FieldValue) -> ModelResult<()>;

    fn clone_model(&self) -> Box<dyn AnyModel>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Model> AnyModel for T {
    fn type_path(&self) -> &'static str {
        T::TYPE_PATH
    }

    fn field(&self, name: &str) -> Option<FieldValue> {
        self.get_field(name)
    }

    fn set(&mut self, name: &str, value: FieldValue) -> ModelResult<()> {
        self.set_field(name, value)
    }

    fn clone_model(&self) -> Box<dyn AnyModel> {
        Box::new(self.clone())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

impl dyn AnyModel {
    pub fn is<T: Model>(&self) -> bool {
        self.as_any().is::<T>()
    }

    pub fn downcast_ref<T: Model>(&self) -> Option<&T> {
        self.as_any().downcast_ref::<T>()
    }

    pub fn downcast_mut<T: Model>(&mut self) -> Option<&mut T> {
        self.as_any_mut().downcast_mut::<T>()
    }

    /// Unbox into the concrete type.
    pub fn take<T: Model>(self: Box<Self>) -> Option<T> {
        self.into_any().downcast::<T>().ok().map(|boxed| *boxed)
    }
}

impl Clone for Box<dyn AnyModel> {
    fn clone(&self) -> Self {
        (**self).clone_model()
    }
}

/// An enum stored by the symbolic name of its variant.
pub trait EnumModel: Copy + Send + Sync + fmt::Debug + 'static {
    const TYPE_PATH: &'static str;
    const VARIANTS: &'static [&'static str];

    fn variant_name(&self) -> &'static str;

    fn from_variant_name(name: &str) -> Option<Self>;
}

/// Type-erased enum value.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EnumValue {
    pub type_path: String,
    pub variant: String,
}

/// A field's value in the dynamic object model.
#[derive(Clone, Debug)]
pub enum FieldValue {
    Null,
    /// Bools, numbers, strings, ids, datetimes and bytes.
    Scalar(Value),
    Enum(EnumValue),
    /// Embedded object of any registered model type.
    Object(Box<dyn AnyModel>),
    List(Vec<FieldValue>),
    /// String-keyed map, in insertion order.
    Map(Vec<(String, FieldValue)>),
    Reference(Arc<ReferenceCell>),
    Opaque(Box<dyn OpaqueValue>),
    Document(Document),
}

impl FieldValue {
    pub fn scalar(value: impl Into<Value>) -> Self {
        FieldValue::Scalar(value.into())
    }

    pub fn from_enum<E: EnumModel>(value: &E) -> Self {
        FieldValue::Enum(EnumValue {
            type_path: E::TYPE_PATH.to_string(),
            variant: value.variant_name().to_string(),
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldValue::Null => "null",
            FieldValue::Scalar(v) => v.kind_name(),
            FieldValue::Enum(_) => "enum",
            FieldValue::Object(_) => "object",
            FieldValue::List(_) => "list",
            FieldValue::Map(_) => "map",
            FieldValue::Reference(_) => "reference",
            FieldValue::Opaque(_) => "opaque",
            FieldValue::Document(_) => "document",
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, FieldValue::Null | FieldValue::Scalar(Value::Null))
    }

    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            FieldValue::Scalar(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&dyn AnyModel> {
        match self {
            FieldValue::Object(obj) => Some(obj.as_ref()),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<&Arc<ReferenceCell>> {
        match self {
            FieldValue::Reference(cell) => Some(cell),
            _ => None,
        }
    }
}

/// Extract a concrete model from an object field value.
pub fn take_model<T: Model>(value: FieldValue) -> ModelResult<T> {
    match value {
        FieldValue::Object(obj) => {
            let found = obj.type_path();
            obj.take::<T>().ok_or(ModelError::TypeMismatch {
                expected: T::TYPE_PATH,
                found,
            })
        }
        other => Err(ModelError::TypeMismatch {
            expected: T::TYPE_PATH,
            found: other.kind_name(),
        }),
    }
}

/// Extract a concrete enum from an enum field value.
pub fn take_enum<E: EnumModel>(value: FieldValue) -> ModelResult<E> {
    match value {
        FieldValue::Enum(e) => {
            E::from_variant_name(&e.variant).ok_or(ModelError::UnknownVariant {
                type_path: E::TYPE_PATH.to_string(),
                variant: e.variant,
            })
        }
        FieldValue::Scalar(Value::String(name)) => {
            E::from_variant_name(&name).ok_or(ModelError::UnknownVariant {
                type_path: E::TYPE_PATH.to_string(),
                variant: name,
            })
        }
        other => Err(ModelError::TypeMismatch {
            expected: E::TYPE_PATH,
            found: other.kind_name(),
        }),
    }
}
