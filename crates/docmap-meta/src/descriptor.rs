use std::collections::HashMap;

use docmap_model::{FieldFlags, FieldKind, Hook, HookKind, ModelKind};

/// One persistable field, as merged from the declaring type's schema.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Rust-side field name, passed to `get_field`/`set_field`.
    pub name: &'static str,
    /// Key under which the field is stored.
    pub storage_name: String,
    /// Type in the hierarchy that declared the field.
    pub declaring_type: &'static str,
    pub kind: FieldKind,
    pub rename: Option<&'static str>,
    pub aliases: Vec<&'static str>,
    pub flags: FieldFlags,
}

impl FieldDescriptor {
    pub fn is_reference(&self) -> bool {
        self.kind.reference_target().is_some()
    }

    pub fn is_id(&self) -> bool {
        self.flags.id
    }

    /// Whether the field takes part in encoding or decoding at all.
    pub fn is_persistent(&self) -> bool {
        !self.flags.transient
    }

    /// Whether values of this field can contain model instances.
    pub fn may_hold_models(&self) -> bool {
        holds_models(&self.kind)
    }
}

fn holds_models(kind: &FieldKind) -> bool {
    match kind {
        FieldKind::Model(_) | FieldKind::Reference(_) | FieldKind::Dynamic => true,
        FieldKind::List(inner) | FieldKind::Map(inner) => holds_models(inner),
        _ => false,
    }
}

/// Merged metadata for one type and its declared hierarchy.
///
/// Descriptors are immutable once computed and shared through `Arc`.
#[derive(Debug)]
pub struct EntityTypeDescriptor {
    pub type_path: &'static str,
    /// Nearest mapping marker in the hierarchy.
    pub kind: Option<ModelKind>,
    pub polymorphic: bool,
    pub snake_case: bool,
    pub collection: Option<&'static str>,
    /// The type itself, then its supertypes nearest first, then interfaces.
    pub hierarchy: Vec<&'static str>,
    pub(crate) fields: Vec<FieldDescriptor>,
    pub(crate) id_field: Option<usize>,
    pub(crate) additional_data: Option<usize>,
    pub(crate) hooks: HashMap<HookKind, Vec<Hook>>,
}

impl EntityTypeDescriptor {
    pub fn is_entity(&self) -> bool {
        self.kind == Some(ModelKind::Entity)
    }

    pub fn is_embedded(&self) -> bool {
        self.kind == Some(ModelKind::Embedded)
    }

    /// Entity or embedded: the type may be encoded field by field.
    pub fn is_mappable(&self) -> bool {
        self.kind.is_some()
    }

    /// All fields in descriptor order, base-most type first.
    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    /// Fields that are neither transient nor the catch-all.
    pub fn persistent_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields
            .iter()
            .filter(|f| f.is_persistent() && !f.flags.additional_data)
    }

    /// Field by Rust-side name.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn field_at(&self, index: usize) -> Option<&FieldDescriptor> {
        self.fields.get(index)
    }

    pub fn id_field(&self) -> Option<&FieldDescriptor> {
        self.id_field.and_then(|i| self.fields.get(i))
    }

    /// The catch-all map receiving unmapped document keys.
    pub fn additional_data(&self) -> Option<&FieldDescriptor> {
        self.additional_data.and_then(|i| self.fields.get(i))
    }

    /// Hooks of one kind, base-most type first.
    pub fn hooks(&self, kind: HookKind) -> &[Hook] {
        self.hooks.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_subtype_of(&self, type_path: &str) -> bool {
        self.hierarchy.iter().any(|t| *t == type_path)
    }
}
