//! Model to document encoding.

use std::collections::HashSet;
use std::sync::Arc;

use docmap_codec::encode_binary;
use docmap_meta::{EntityTypeDescriptor, FieldDescriptor};
use docmap_model::{
    AnyModel, ChangeTracked, FieldKind, FieldValue, Model, OpaqueValue, ReferenceCell,
    ReferenceError,
};
use docmap_types::{Document, EntityId, IdValue, ReferenceMarker, Value};
use tracing::debug;

use crate::coerce::{coerce_id, coerce_scalar};
use crate::error::{MappingError, MappingResult};
use crate::mapper::{codec_error, field_label, mismatch, read_field, ObjectMapper};

/// Key wrapping a codec result that is not a document.
pub const CODEC_VALUE_KEY: &str = "value";

/// Key holding the variant of an enum stored in a dynamic slot.
pub const ENUM_NAME_KEY: &str = "name";

impl ObjectMapper {
    /// Encode a model into a document.
    pub fn encode<T: Model>(&self, model: &T) -> MappingResult<Document> {
        self.encode_dyn(model)
    }

    pub fn encode_dyn(&self, model: &dyn AnyModel) -> MappingResult<Document> {
        let type_path = model.type_path();
        if let Some(codec) = self.codecs.lookup(type_path) {
            let encoded = codec
                .encode(&FieldValue::Object(model.clone_model()))
                .map_err(|source| codec_error(type_path, source))?;
            return Ok(match encoded {
                Value::Document(document) => document,
                other => Document::from_iter([(CODEC_VALUE_KEY, other)]),
            });
        }

        let descriptor = self.mappable(type_path)?;
        let mut document = Document::new();
        if descriptor.polymorphic {
            document.insert(self.discriminator_key(), type_path);
        }
        self.encode_fields(&descriptor, model, &mut document, false)?;
        Ok(document)
    }

    /// Encode only what changed: the id, the discriminator and the fields
    /// recorded by the tracker. A changed field that is now empty is
    /// written as an explicit null.
    pub fn encode_changes<T: Model>(&self, tracked: &ChangeTracked<T>) -> MappingResult<Document> {
        let descriptor = self.mappable(T::TYPE_PATH)?;
        let mut document = self.encode_dyn(&**tracked)?;

        let mut keep: HashSet<&str> = HashSet::new();
        if let Some(id) = descriptor.id_field() {
            keep.insert(id.storage_name.as_str());
        }
        let mut nulls = Vec::new();
        for name in tracked.changed_fields() {
            let Some(field) = descriptor.field(name) else {
                continue;
            };
            if field.flags.additional_data || !field.is_persistent() || field.flags.read_only {
                continue;
            }
            keep.insert(field.storage_name.as_str());
            if !document.contains_key(&field.storage_name) {
                nulls.push(field.storage_name.clone());
            }
        }
        let extra_changed = descriptor
            .additional_data()
            .is_some_and(|extra| tracked.is_changed(extra.name));
        let declared: HashSet<&str> = descriptor
            .fields()
            .iter()
            .map(|f| f.storage_name.as_str())
            .collect();

        let discriminator = self.discriminator_key();
        document.retain(|key, _| {
            key == discriminator
                || keep.contains(key)
                || (extra_changed && !declared.contains(key))
        });
        for key in nulls {
            document.insert(key, Value::Null);
        }
        Ok(document)
    }

    /// Encode an opaque value as its binary fallback document.
    pub fn encode_opaque(&self, value: &dyn OpaqueValue) -> MappingResult<Document> {
        let type_path = value.type_path();
        if !self.config.allow_binary_fallback {
            return Err(MappingError::NotMappable(type_path.to_string()));
        }
        encode_binary(value, self.discriminator_key()).map_err(|source| codec_error(type_path, source))
    }

    pub(crate) fn mappable(&self, type_path: &str) -> MappingResult<Arc<EntityTypeDescriptor>> {
        let descriptor = self.resolver.descriptor_for(type_path)?;
        if !descriptor.is_mappable() {
            return Err(MappingError::NotMappable(type_path.to_string()));
        }
        Ok(descriptor)
    }

    /// Write every persistable field of `model` into `document`.
    ///
    /// `in_place` strips the id: the entity is embedded in its owner.
    fn encode_fields(
        &self,
        descriptor: &EntityTypeDescriptor,
        model: &dyn AnyModel,
        document: &mut Document,
        in_place: bool,
    ) -> MappingResult<()> {
        for field in descriptor.persistent_fields() {
            if field.flags.read_only || (in_place && field.is_id()) {
                continue;
            }
            let value = read_field(descriptor, model, field)?;
            if value.is_null() {
                if field.flags.use_if_null {
                    document.insert(field.storage_name.clone(), Value::Null);
                }
                continue;
            }
            let encoded = self.encode_value(&field.kind, &value, field, false)?;
            document.insert(field.storage_name.clone(), encoded);
        }

        let Some(extra) = descriptor.additional_data() else {
            return Ok(());
        };
        if !extra.is_persistent() {
            return Ok(());
        }
        match read_field(descriptor, model, extra)? {
            FieldValue::Null => {}
            FieldValue::Map(entries) => {
                for (key, value) in entries {
                    if document.contains_key(&key) {
                        continue;
                    }
                    let encoded = self.encode_value(&FieldKind::Dynamic, &value, extra, true)?;
                    document.insert(key, encoded);
                }
            }
            FieldValue::Document(entries) => {
                for (key, value) in entries {
                    if !document.contains_key(&key) {
                        document.insert(key, value);
                    }
                }
            }
            other => return Err(mismatch(extra, &extra.kind, other.kind_name())),
        }
        Ok(())
    }

    /// Encode one value of declared kind `kind`.
    ///
    /// `nested` is set inside lists and maps, where references are stored
    /// as full markers instead of bare ids.
    fn encode_value(
        &self,
        kind: &FieldKind,
        value: &FieldValue,
        field: &FieldDescriptor,
        nested: bool,
    ) -> MappingResult<Value> {
        if value.is_null() {
            return Ok(Value::Null);
        }
        if !matches!(kind, FieldKind::Reference(_)) {
            if let Some(type_path) = codec_type(kind, value) {
                if let Some(codec) = self.codecs.lookup(type_path) {
                    return codec
                        .encode(value)
                        .map_err(|source| codec_error(type_path, source));
                }
            }
        }

        match (kind, value) {
            (FieldKind::Scalar(scalar), FieldValue::Scalar(v)) => {
                coerce_scalar(v, *scalar).ok_or_else(|| mismatch(field, kind, v.kind_name()))
            }
            (FieldKind::Id(repr), FieldValue::Scalar(v)) => {
                coerce_id(v, *repr).ok_or_else(|| MappingError::IdCoercion {
                    type_path: field.declaring_type.to_string(),
                    found: v.kind_name().to_string(),
                })
            }
            (FieldKind::Enum(_), FieldValue::Enum(e)) => Ok(Value::String(e.variant.clone())),
            (FieldKind::Enum(_), FieldValue::Scalar(Value::String(name))) => {
                Ok(Value::String(name.clone()))
            }
            (FieldKind::Model(declared), FieldValue::Object(object)) => self
                .encode_embedded(Some(*declared), object.as_ref())
                .map(Value::Document),
            (FieldKind::Reference(_), FieldValue::Reference(cell)) => {
                self.encode_reference(cell, field, nested)
            }
            (FieldKind::Reference(_), FieldValue::Object(object)) => {
                let cell = Arc::new(ReferenceCell::from_model(object.clone()));
                self.encode_reference(&cell, field, nested)
            }
            (FieldKind::List(element), FieldValue::List(items)) => items
                .iter()
                .map(|item| self.encode_value(element, item, field, true))
                .collect::<MappingResult<Vec<_>>>()
                .map(Value::List),
            (FieldKind::Array(scalar), FieldValue::List(items)) => items
                .iter()
                .map(|item| match item {
                    FieldValue::Null => Ok(Value::Null),
                    FieldValue::Scalar(v) => coerce_scalar(v, *scalar)
                        .ok_or_else(|| mismatch(field, kind, v.kind_name())),
                    other => Err(mismatch(field, kind, other.kind_name())),
                })
                .collect::<MappingResult<Vec<_>>>()
                .map(Value::List),
            (FieldKind::Map(element), FieldValue::Map(entries)) => {
                let mut document = Document::with_capacity(entries.len());
                for (key, item) in entries {
                    document.insert(key.clone(), self.encode_value(element, item, field, true)?);
                }
                Ok(Value::Document(document))
            }
            (FieldKind::Opaque(_), FieldValue::Opaque(opaque)) => {
                self.encode_opaque(opaque.as_ref()).map(Value::Document)
            }
            (FieldKind::Dynamic, _) => self.encode_dynamic(value, field),
            (FieldKind::Document, FieldValue::Document(document)) => {
                Ok(Value::Document(document.clone()))
            }
            (FieldKind::Document, FieldValue::Scalar(Value::Document(document))) => {
                Ok(Value::Document(document.clone()))
            }
            _ => Err(mismatch(field, kind, value.kind_name())),
        }
    }

    /// Encode a value whose declared type says nothing: everything that is
    /// not a plain scalar carries its own type.
    fn encode_dynamic(&self, value: &FieldValue, field: &FieldDescriptor) -> MappingResult<Value> {
        match value {
            FieldValue::Null => Ok(Value::Null),
            FieldValue::Scalar(v) => Ok(v.clone()),
            FieldValue::Enum(e) => {
                let mut document = Document::with_capacity(2);
                document.insert(self.discriminator_key(), e.type_path.as_str());
                document.insert(ENUM_NAME_KEY, e.variant.as_str());
                Ok(Value::Document(document))
            }
            FieldValue::Object(object) => self
                .encode_embedded(None, object.as_ref())
                .map(Value::Document),
            FieldValue::List(items) => items
                .iter()
                .map(|item| self.encode_value(&FieldKind::Dynamic, item, field, true))
                .collect::<MappingResult<Vec<_>>>()
                .map(Value::List),
            FieldValue::Map(entries) => {
                let mut document = Document::with_capacity(entries.len());
                for (key, item) in entries {
                    let encoded = self.encode_value(&FieldKind::Dynamic, item, field, true)?;
                    document.insert(key.clone(), encoded);
                }
                Ok(Value::Document(document))
            }
            FieldValue::Reference(cell) => self.encode_reference(cell, field, true),
            FieldValue::Opaque(opaque) => self.encode_opaque(opaque.as_ref()).map(Value::Document),
            FieldValue::Document(document) => Ok(Value::Document(document.clone())),
        }
    }

    /// Encode an object stored inside its owner.
    ///
    /// The discriminator is written when the type is polymorphic or its
    /// runtime type differs from the declared one (`None` for dynamic
    /// slots).
    fn encode_embedded(&self, declared: Option<&str>, object: &dyn AnyModel) -> MappingResult<Document> {
        let type_path = object.type_path();
        let descriptor = self.mappable(type_path)?;
        let mut document = Document::new();
        if descriptor.polymorphic || declared != Some(type_path) {
            document.insert(self.discriminator_key(), type_path);
        }
        self.encode_fields(&descriptor, object, &mut document, descriptor.is_entity())?;
        Ok(document)
    }

    fn encode_reference(
        &self,
        cell: &Arc<ReferenceCell>,
        field: &FieldDescriptor,
        as_marker: bool,
    ) -> MappingResult<Value> {
        let id = match self.reference_id(cell)? {
            Some(id) => id,
            None => self.store_reference_target(cell, field)?,
        };
        if !as_marker {
            return Ok(id.to_value());
        }
        let type_path = reference_type(cell);
        let collection = self.collection_for(&type_path)?;
        Ok(Value::Reference(ReferenceMarker::new(
            type_path,
            id,
            Some(collection),
        )))
    }

    /// Id of the reference target: recorded on the cell, or read from an
    /// in-memory target that was stored on its own.
    fn reference_id(&self, cell: &ReferenceCell) -> MappingResult<Option<IdValue>> {
        if let Some(id) = cell.id() {
            return Ok(Some(id));
        }
        let Some(shared) = cell.peek() else {
            return Ok(None);
        };
        let target = shared.read().map_err(|_| ReferenceError::Poisoned)?;
        let id = self.id_of(&**target)?;
        if let Some(id) = &id {
            cell.assign_id(id.clone());
        }
        Ok(id)
    }

    /// Persist an unsaved reference target of an auto-store field.
    ///
    /// An id is reserved on the cell before the target is encoded, so that
    /// a reference cycle back to it encodes as a plain reference. The
    /// reservation is dropped again if the store write fails.
    fn store_reference_target(
        &self,
        cell: &Arc<ReferenceCell>,
        field: &FieldDescriptor,
    ) -> MappingResult<IdValue> {
        let unsaved = || MappingError::UnsavedReference {
            type_path: cell.target_type().to_string(),
            field: field_label(field),
        };
        let Some(shared) = cell.peek() else {
            return Err(unsaved());
        };
        if !(field.flags.auto_store && self.config.auto_store_references) {
            return Err(unsaved());
        }

        let mut target = shared
            .read()
            .map_err(|_| ReferenceError::Poisoned)?
            .clone_model();
        let descriptor = self.resolver.descriptor_for(target.type_path())?;
        self.assign_id(&descriptor, &mut *target, &IdValue::Opaque(EntityId::generate()))?;
        let reserved = self.id_of(&*target)?.ok_or_else(unsaved)?;
        cell.assign_id(reserved);

        debug!(
            type_path = descriptor.type_path,
            field = %field_label(field),
            "auto-storing reference target"
        );
        let id = match self.store_dyn(&mut *target) {
            Ok(id) => id,
            Err(e) => {
                cell.clear_id();
                return Err(e);
            }
        };
        cell.assign_id(id.clone());
        *shared.write().map_err(|_| ReferenceError::Poisoned)? = target;
        Ok(id)
    }
}

/// Type path a codec for `value` would be registered under.
fn codec_type<'a>(kind: &FieldKind, value: &'a FieldValue) -> Option<&'a str> {
    match (kind, value) {
        (_, FieldValue::Object(object)) => Some(object.type_path()),
        (_, FieldValue::Enum(e)) => Some(e.type_path.as_str()),
        (_, FieldValue::Opaque(opaque)) => Some(opaque.type_path()),
        (FieldKind::Scalar(scalar), FieldValue::Scalar(_)) => Some(scalar.name()),
        (FieldKind::Enum(path), FieldValue::Scalar(_)) => Some(*path),
        _ => None,
    }
}

/// Concrete type of a reference target: the loaded target's runtime type
/// when known, else the type the cell was created for.
fn reference_type(cell: &ReferenceCell) -> String {
    cell.peek()
        .and_then(|shared| shared.read().ok().map(|t| t.type_path().to_string()))
        .unwrap_or_else(|| cell.target_type().to_string())
}
