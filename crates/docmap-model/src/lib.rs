//! Static type declarations for docmap.
//!
//! docmap does not introspect types at runtime. Instead every persistable
//! type declares itself once:
//!
//! - [`Model`]: implemented by user structs. A type path, an explicit
//!   [`TypeSchema`], and dynamic field access through [`FieldValue`]
//! - [`AnyModel`]: the object-safe, type-erased view of any `Model`
//! - [`EnumModel`]: enums stored by their symbolic variant names
//! - [`Opaque`]: serde values opting into the binary fallback
//! - [`Property`]: conversion between Rust field types and [`FieldValue`]
//!
//! Cross-entity edges are explicit sum types rather than generated proxy
//! subclasses. A [`Reference<T>`] is either resolved (holding a shared
//! target) or unresolved (holding a type and id plus a loader that runs at
//! most once). [`ChangeTracked<T>`] records field-level mutations.

pub mod error;
pub mod model;
pub mod opaque;
pub mod property;
pub mod reference;
pub mod schema;
pub mod tracked;

pub use error::{ModelError, ModelResult, ReferenceError};
pub use model::{take_enum, take_model, AnyModel, EnumModel, EnumValue, FieldValue, Model};
pub use opaque::{decode_opaque, Opaque, OpaqueDecodeFn, OpaqueValue};
pub use property::{Bytes, Property};
pub use reference::{
    Loaded, Reference, ReferenceCell, ReferenceKey, ReferenceLoader, Resolution, SharedModel,
};
pub use schema::{
    FieldFlags, FieldKind, FieldSchema, Hook, HookKind, IdRepr, ModelKind, ScalarKind, TypeSchema,
};
pub use tracked::ChangeTracked;

/// Generate `get_field`/`set_field` for a [`Model`] impl whose schema
/// field names equal the struct field names.
///
/// ```ignore
/// impl Model for Item {
///     const TYPE_PATH: &'static str = "shop::Item";
///     fn schema() -> TypeSchema { /* ... */ }
///     docmap_model::model_fields!(id, name, price);
/// }
/// ```
#[macro_export]
macro_rules! model_fields {
    ($($field:ident),* $(,)?) => {
        fn get_field(&self, name: &str) -> ::std::option::Option<$crate::FieldValue> {
            match name {
                $(stringify!($field) => ::std::option::Option::Some($crate::Property::to_field(&self.$field)),)*
                _ => ::std::option::Option::None,
            }
        }

        fn set_field(&mut self, name: &str, value: $crate::FieldValue) -> $crate::ModelResult<()> {
            match name {
                $(stringify!($field) => {
                    self.$field = $crate::Property::from_field(value)?;
                    ::std::result::Result::Ok(())
                })*
                _ => ::std::result::Result::Err($crate::ModelError::UnknownField {
                    type_path: <Self as $crate::Model>::TYPE_PATH,
                    field: name.to_string(),
                }),
            }
        }
    };
}

/// Implement [`Property`] for [`Model`] types so they can be used as
/// embedded field values.
#[macro_export]
macro_rules! model_property {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Property for $ty {
                fn to_field(&self) -> $crate::FieldValue {
                    $crate::FieldValue::Object(::std::boxed::Box::new(::std::clone::Clone::clone(self)))
                }

                fn from_field(value: $crate::FieldValue) -> $crate::ModelResult<Self> {
                    $crate::take_model::<$ty>(value)
                }
            }
        )*
    };
}

/// Implement [`Property`] for [`EnumModel`] types.
#[macro_export]
macro_rules! enum_property {
    ($($ty:ty),* $(,)?) => {
        $(
            impl $crate::Property for $ty {
                fn to_field(&self) -> $crate::FieldValue {
                    $crate::FieldValue::from_enum(self)
                }

                fn from_field(value: $crate::FieldValue) -> $crate::ModelResult<Self> {
                    $crate::take_enum::<$ty>(value)
                }
            }
        )*
    };
}
