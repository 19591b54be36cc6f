//! Explicit type schemas.
//!
//! A [`TypeSchema`] is what a model declares about itself: whether it is an
//! entity or an embedded value, its supertype and interfaces, its fields
//! with their storage annotations, and its lifecycle hooks. Schemas only
//! describe the declaring type; the metadata resolver merges the hierarchy.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::model::{AnyModel, Model};

/// Scalar field types with a fixed coercion table.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScalarKind {
    Bool,
    I32,
    I64,
    F32,
    F64,
    String,
    /// Calendar date, stored as a datetime at midnight UTC.
    Date,
    DateTime,
    Binary,
}

impl ScalarKind {
    pub fn name(self) -> &'static str {
        match self {
            ScalarKind::Bool => "bool",
            ScalarKind::I32 => "i32",
            ScalarKind::I64 => "i64",
            ScalarKind::F32 => "f32",
            ScalarKind::F64 => "f64",
            ScalarKind::String => "string",
            ScalarKind::Date => "date",
            ScalarKind::DateTime => "datetime",
            ScalarKind::Binary => "binary",
        }
    }
}

/// How an id field holds its value.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IdRepr {
    /// Builtin 12-byte [`EntityId`](docmap_types::EntityId).
    Opaque,
    /// Plain text id.
    Text,
}

/// Declared type of a field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldKind {
    Scalar(ScalarKind),
    Id(IdRepr),
    /// Enum stored by symbolic name; carries the enum type path.
    Enum(&'static str),
    /// Embedded object of the named model type or any of its subtypes.
    Model(&'static str),
    /// Reference to an entity of the named type.
    Reference(&'static str),
    List(Box<FieldKind>),
    /// Fixed-element array of a scalar type.
    Array(ScalarKind),
    /// String-keyed map.
    Map(Box<FieldKind>),
    /// Binary-fallback value; carries the opaque type path.
    Opaque(&'static str),
    /// Statically untyped slot: values carry their own type discriminator.
    Dynamic,
    /// Raw document, stored as-is.
    Document,
}

impl FieldKind {
    pub fn list(element: FieldKind) -> Self {
        FieldKind::List(Box::new(element))
    }

    pub fn map(element: FieldKind) -> Self {
        FieldKind::Map(Box::new(element))
    }

    /// Referenced type when this field, or its collection element, is a
    /// reference.
    pub fn reference_target(&self) -> Option<&'static str> {
        match self {
            FieldKind::Reference(target) => Some(target),
            FieldKind::List(inner) | FieldKind::Map(inner) => inner.reference_target(),
            _ => None,
        }
    }

    /// Short description used in error messages.
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Scalar(s) => s.name().to_string(),
            FieldKind::Id(IdRepr::Opaque) => "id".to_string(),
            FieldKind::Id(IdRepr::Text) => "text id".to_string(),
            FieldKind::Enum(path) => format!("enum {path}"),
            FieldKind::Model(path) => path.to_string(),
            FieldKind::Reference(path) => format!("reference to {path}"),
            FieldKind::List(inner) => format!("list of {}", inner.describe()),
            FieldKind::Array(s) => format!("array of {}", s.name()),
            FieldKind::Map(inner) => format!("map of {}", inner.describe()),
            FieldKind::Opaque(path) => format!("opaque {path}"),
            FieldKind::Dynamic => "dynamic".to_string(),
            FieldKind::Document => "document".to_string(),
        }
    }
}

/// Whether a type participates in mapping and how.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModelKind {
    /// Stored in its own collection; must have an id field.
    Entity,
    /// Stored inline inside its owner.
    Embedded,
}

/// Field-level storage annotations.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FieldFlags {
    pub id: bool,
    /// Catch-all map receiving unmapped document keys.
    pub additional_data: bool,
    /// Read from documents, never written.
    pub read_only: bool,
    /// Never read or written.
    pub transient: bool,
    /// Write explicit nulls and apply stored nulls.
    pub use_if_null: bool,
    /// Resolve the reference on first access.
    pub lazy: bool,
    /// Persist an unsaved reference target during encoding.
    pub auto_store: bool,
}

/// One declared field.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldSchema {
    /// Rust field name, as accepted by `get_field`/`set_field`.
    pub name: &'static str,
    pub kind: FieldKind,
    /// Explicit storage name.
    pub rename: Option<&'static str>,
    /// Alternate keys accepted on decode.
    pub aliases: Vec<&'static str>,
    pub flags: FieldFlags,
}

impl FieldSchema {
    pub fn new(name: &'static str, kind: FieldKind) -> Self {
        Self {
            name,
            kind,
            rename: None,
            aliases: Vec::new(),
            flags: FieldFlags::default(),
        }
    }

    /// Builtin-id field.
    pub fn id(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Id(IdRepr::Opaque));
        field.flags.id = true;
        field
    }

    /// Text id field.
    pub fn id_text(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::Id(IdRepr::Text));
        field.flags.id = true;
        field
    }

    /// Catch-all map for unmapped keys.
    pub fn additional_data(name: &'static str) -> Self {
        let mut field = Self::new(name, FieldKind::map(FieldKind::Dynamic));
        field.flags.additional_data = true;
        field
    }

    pub fn rename(mut self, storage_name: &'static str) -> Self {
        self.rename = Some(storage_name);
        self
    }

    pub fn alias(mut self, alias: &'static str) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn read_only(mut self) -> Self {
        self.flags.read_only = true;
        self
    }

    pub fn transient(mut self) -> Self {
        self.flags.transient = true;
        self
    }

    pub fn use_if_null(mut self) -> Self {
        self.flags.use_if_null = true;
        self
    }

    pub fn lazy(mut self) -> Self {
        self.flags.lazy = true;
        self
    }

    pub fn auto_store(mut self) -> Self {
        self.flags.auto_store = true;
        self
    }
}

/// Lifecycle points at which hooks run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum HookKind {
    PreStore,
    PostStore,
    PostLoad,
    PreRemove,
    PostRemove,
    PreUpdate,
    PostUpdate,
}

/// A lifecycle hook bound to a model type.
#[derive(Clone)]
pub struct Hook {
    name: &'static str,
    call: Arc<dyn Fn(&mut dyn AnyModel) -> bool + Send + Sync>,
}

impl Hook {
    /// Hook bound to the concrete type `T`. It is skipped for instances of
    /// any other type.
    pub fn new<T: Model>(name: &'static str, hook: fn(&mut T)) -> Self {
        Self {
            name,
            call: Arc::new(move |target: &mut dyn AnyModel| {
                match target.as_any_mut().downcast_mut::<T>() {
                    Some(model) => {
                        hook(model);
                        true
                    }
                    None => false,
                }
            }),
        }
    }

    /// Hook working on the type-erased model. Supertypes declare their
    /// hooks this way so that subtype instances receive them.
    pub fn dynamic(name: &'static str, hook: fn(&mut dyn AnyModel)) -> Self {
        Self {
            name,
            call: Arc::new(move |target: &mut dyn AnyModel| {
                hook(target);
                true
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Run the hook. Returns `false` when the target type did not match.
    pub fn invoke(&self, target: &mut dyn AnyModel) -> bool {
        (self.call)(target)
    }
}

impl fmt::Debug for Hook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Hook").field(&self.name).finish()
    }
}

/// Everything a type declares about itself.
#[derive(Clone, Debug)]
pub struct TypeSchema {
    /// Fully-qualified type path, e.g. `shop::Order`.
    pub type_path: &'static str,
    /// Mapping marker. `None` means the type only contributes fields.
    pub kind: Option<ModelKind>,
    /// Direct supertype.
    pub extends: Option<&'static str>,
    /// Interfaces contributing markers but no fields.
    pub implements: Vec<&'static str>,
    /// Always write the type discriminator.
    pub polymorphic: bool,
    /// Derive storage names by snake-casing field names.
    pub snake_case: bool,
    /// Explicit collection name.
    pub collection: Option<&'static str>,
    pub fields: Vec<FieldSchema>,
    pub hooks: Vec<(HookKind, Hook)>,
}

impl TypeSchema {
    /// Schema for a type carrying no mapping marker of its own.
    pub fn new(type_path: &'static str) -> Self {
        Self {
            type_path,
            kind: None,
            extends: None,
            implements: Vec::new(),
            polymorphic: false,
            snake_case: false,
            collection: None,
            fields: Vec::new(),
            hooks: Vec::new(),
        }
    }

    pub fn entity(type_path: &'static str) -> Self {
        Self {
            kind: Some(ModelKind::Entity),
            ..Self::new(type_path)
        }
    }

    pub fn embedded(type_path: &'static str) -> Self {
        Self {
            kind: Some(ModelKind::Embedded),
            ..Self::new(type_path)
        }
    }

    pub fn extends(mut self, supertype: &'static str) -> Self {
        self.extends = Some(supertype);
        self
    }

    pub fn implements(mut self, interface: &'static str) -> Self {
        self.implements.push(interface);
        self
    }

    pub fn polymorphic(mut self) -> Self {
        self.polymorphic = true;
        self
    }

    pub fn snake_case(mut self) -> Self {
        self.snake_case = true;
        self
    }

    pub fn collection(mut self, name: &'static str) -> Self {
        self.collection = Some(name);
        self
    }

    pub fn field(mut self, field: FieldSchema) -> Self {
        self.fields.push(field);
        self
    }

    pub fn hook(mut self, kind: HookKind, hook: Hook) -> Self {
        self.hooks.push((kind, hook));
        self
    }

    /// Last path segment of the type path.
    pub fn short_name(&self) -> &'static str {
        self.type_path
            .rsplit("::")
            .next()
            .unwrap_or(self.type_path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builders_set_flags() {
        let field = FieldSchema::new("items", FieldKind::list(FieldKind::Reference("shop::Item")))
            .rename("lineItems")
            .alias("entries")
            .lazy()
            .auto_store();
        assert_eq!(field.rename, Some("lineItems"));
        assert_eq!(field.aliases, vec!["entries"]);
        assert!(field.flags.lazy && field.flags.auto_store);
        assert!(!field.flags.read_only);
        assert_eq!(field.kind.reference_target(), Some("shop::Item"));
    }

    #[test]
    fn id_constructors() {
        assert!(FieldSchema::id("id").flags.id);
        assert_eq!(FieldSchema::id_text("key").kind, FieldKind::Id(IdRepr::Text));
        let extra = FieldSchema::additional_data("extra");
        assert!(extra.flags.additional_data);
        assert_eq!(extra.kind, FieldKind::map(FieldKind::Dynamic));
    }

    #[test]
    fn schema_short_name() {
        let schema = TypeSchema::entity("shop::orders::Order").collection("orders");
        assert_eq!(schema.short_name(), "Order");
        assert_eq!(schema.kind, Some(ModelKind::Entity));
        assert_eq!(TypeSchema::new("Plain").short_name(), "Plain");
    }

    #[test]
    fn describe_nested_kinds() {
        let kind = FieldKind::map(FieldKind::list(FieldKind::Scalar(ScalarKind::I32)));
        assert_eq!(kind.describe(), "map of list of i32");
        assert_eq!(kind.reference_target(), None);
    }
}
