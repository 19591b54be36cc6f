//! Document to model decoding.

use std::collections::HashMap;

use docmap_codec::{decode_binary, is_binary_document};
use docmap_meta::{EntityTypeDescriptor, FieldDescriptor, MetaError};
use docmap_model::{AnyModel, EnumValue, FieldKind, FieldValue, Model, OpaqueValue};
use docmap_types::text::parse_value;
use docmap_types::{Document, IdValue, ReferenceMarker, TypeError, Value};
use tracing::{debug, warn};

use crate::coerce::{coerce_id, coerce_scalar};
use crate::encoder::{CODEC_VALUE_KEY, ENUM_NAME_KEY};
use crate::error::{MappingError, MappingResult};
use crate::mapper::{codec_error, downcast, mismatch, ObjectMapper};

impl ObjectMapper {
    /// Decode a document into a `T`.
    ///
    /// `Ok(None)` when the stored id has no representation the id field
    /// accepts.
    pub fn decode<T: Model>(&self, document: &Document) -> MappingResult<Option<T>> {
        match self.decode_dyn(T::TYPE_PATH, document)? {
            Some(model) => downcast(model).map(Some),
            None => Ok(None),
        }
    }

    /// Decode a document into `type_path`, or into the subtype its
    /// discriminator names.
    pub fn decode_dyn(
        &self,
        type_path: &str,
        document: &Document,
    ) -> MappingResult<Option<Box<dyn AnyModel>>> {
        match self.decode_root(type_path, document) {
            Err(MappingError::IdCoercion { type_path, found }) => {
                debug!(type_path = %type_path, found = %found, "stored id is unusable, decoding to nothing");
                Ok(None)
            }
            other => other,
        }
    }

    /// Decode the generic text form. JSON `null` decodes to `None`.
    pub fn decode_str<T: Model>(&self, text: &str) -> MappingResult<Option<T>> {
        match parse_value(text)? {
            Value::Null => Ok(None),
            Value::Document(document) => self.decode(&document),
            other => Err(TypeError::NotADocument(other.kind_name()).into()),
        }
    }

    /// Decode a binary fallback document into its registered opaque type.
    pub fn decode_opaque(&self, document: &Document) -> MappingResult<Box<dyn OpaqueValue>> {
        let payload = decode_binary(document, self.discriminator_key())
            .map_err(|source| codec_error("binary payload", source))?
            .ok_or(MappingError::Coercion {
                field: "binary payload".to_string(),
                expected: "binary fallback document".to_string(),
                found: "document",
            })?;
        if !self.config.allow_binary_fallback {
            return Err(MappingError::NotMappable(payload.type_path));
        }
        let registration = self
            .registry()
            .opaque_type(&payload.type_path)
            .ok_or_else(|| MappingError::UnknownType(payload.type_path.clone()))?;
        Ok((registration.decode)(&payload.bytes)?)
    }

    fn decode_root(
        &self,
        declared: &str,
        document: &Document,
    ) -> MappingResult<Option<Box<dyn AnyModel>>> {
        let Some(codec) = self.codecs.lookup(declared) else {
            return self.decode_object(declared, document).map(Some);
        };
        let stored = match (document.len(), document.get(CODEC_VALUE_KEY)) {
            (1, Some(value)) => value.clone(),
            _ => Value::Document(document.clone()),
        };
        match codec
            .decode(&stored)
            .map_err(|source| codec_error(declared, source))?
        {
            FieldValue::Null => Ok(None),
            FieldValue::Object(object) => Ok(Some(object)),
            other => Err(MappingError::Coercion {
                field: declared.to_string(),
                expected: declared.to_string(),
                found: other.kind_name(),
            }),
        }
    }

    /// Decode an object document, honoring its discriminator.
    fn decode_object(&self, declared: &str, document: &Document) -> MappingResult<Box<dyn AnyModel>> {
        let type_path = self.concrete_type(declared, document)?;
        if type_path != declared {
            if let Some(codec) = self.codecs.lookup(type_path) {
                let decoded = codec
                    .decode(&Value::Document(document.clone()))
                    .map_err(|source| codec_error(type_path, source))?;
                return match decoded {
                    FieldValue::Object(object) => Ok(object),
                    other => Err(MappingError::Coercion {
                        field: declared.to_string(),
                        expected: type_path.to_string(),
                        found: other.kind_name(),
                    }),
                };
            }
        }

        let descriptor = self.mappable(type_path)?;
        let mut instance = self.registry().instantiate(type_path)?;
        let (matched, extras) = self.match_keys(&descriptor, document)?;

        for field in descriptor.persistent_fields() {
            let Some(stored) = matched.get(field.name) else {
                continue;
            };
            if stored.is_null() {
                if field.flags.use_if_null {
                    instance.set(field.name, FieldValue::Null)?;
                }
                continue;
            }
            let value = self.decode_value(&field.kind, stored, field, type_path)?;
            instance.set(field.name, value)?;
        }

        if let Some(extra) = descriptor.additional_data() {
            if extra.is_persistent() && !extras.is_empty() {
                instance.set(extra.name, FieldValue::Map(extras))?;
            }
        }
        Ok(instance)
    }

    /// The type named by the discriminator, else the declared type.
    fn concrete_type(&self, declared: &str, document: &Document) -> MappingResult<&'static str> {
        let name = match document.get(self.discriminator_key()) {
            Some(Value::String(name)) => name.as_str(),
            _ => declared,
        };
        Ok(self.registry().resolve_name(name)?)
    }

    /// Assign every document key to a field or to the catch-all.
    ///
    /// An exact storage-name match wins over an alias or case-converted
    /// match of the same field.
    #[allow(clippy::type_complexity)]
    fn match_keys<'d>(
        &self,
        descriptor: &EntityTypeDescriptor,
        document: &'d Document,
    ) -> MappingResult<(HashMap<&'static str, &'d Value>, Vec<(String, FieldValue)>)> {
        let mut matched: HashMap<&'static str, &'d Value> = HashMap::new();
        let mut extras = Vec::new();
        for (key, value) in document.iter() {
            if key == self.discriminator_key() {
                continue;
            }
            match self.resolver.resolve_field(descriptor.type_path, key) {
                Ok(Some(field)) => {
                    if key == field.storage_name {
                        matched.insert(field.name, value);
                    } else {
                        matched.entry(field.name).or_insert(value);
                    }
                }
                Ok(None) => {
                    if let Some(extra) = descriptor.additional_data() {
                        let decoded = self.decode_dynamic(value, extra, descriptor.type_path)?;
                        extras.push((key.to_string(), decoded));
                    }
                }
                Err(MetaError::UnresolvedField { type_path, key }) => {
                    if self.config.strict_fields {
                        return Err(MappingError::Lookup { type_path, key });
                    }
                    warn!(type_path = %type_path, key = %key, "skipping document key with no matching field");
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok((matched, extras))
    }

    /// Decode one stored value into declared kind `kind`.
    fn decode_value(
        &self,
        kind: &FieldKind,
        stored: &Value,
        field: &FieldDescriptor,
        owner_type: &str,
    ) -> MappingResult<FieldValue> {
        if stored.is_null() {
            return Ok(FieldValue::Null);
        }
        if let Some(type_path) = declared_codec_type(kind) {
            if let Some(codec) = self.codecs.lookup(type_path) {
                return codec
                    .decode(stored)
                    .map_err(|source| codec_error(type_path, source));
            }
        }

        match kind {
            FieldKind::Scalar(scalar) => coerce_scalar(stored, *scalar)
                .map(FieldValue::Scalar)
                .ok_or_else(|| mismatch(field, kind, stored.kind_name())),
            FieldKind::Id(repr) => coerce_id(stored, *repr)
                .map(FieldValue::Scalar)
                .ok_or_else(|| MappingError::IdCoercion {
                    type_path: owner_type.to_string(),
                    found: stored.kind_name().to_string(),
                }),
            FieldKind::Enum(enum_type) => self.decode_enum(enum_type, stored, field, kind),
            FieldKind::Model(declared) => match stored {
                Value::Document(document) => {
                    self.decode_object(declared, document).map(FieldValue::Object)
                }
                other => Err(mismatch(field, kind, other.kind_name())),
            },
            FieldKind::Reference(target) => self.decode_reference_value(target, stored, field, owner_type),
            FieldKind::List(element) => match stored {
                Value::List(items) => items
                    .iter()
                    .map(|item| self.decode_value(element, item, field, owner_type))
                    .collect::<MappingResult<Vec<_>>>()
                    .map(FieldValue::List),
                single => self
                    .decode_value(element, single, field, owner_type)
                    .map(|value| FieldValue::List(vec![value])),
            },
            FieldKind::Array(scalar) => {
                let items = match stored {
                    Value::List(items) => items.as_slice(),
                    single => std::slice::from_ref(single),
                };
                items
                    .iter()
                    .map(|item| {
                        coerce_scalar(item, *scalar)
                            .map(FieldValue::Scalar)
                            .ok_or_else(|| mismatch(field, kind, item.kind_name()))
                    })
                    .collect::<MappingResult<Vec<_>>>()
                    .map(FieldValue::List)
            }
            FieldKind::Map(element) => match stored {
                Value::Document(document) => document
                    .iter()
                    .map(|(key, item)| {
                        self.decode_value(element, item, field, owner_type)
                            .map(|value| (key.to_string(), value))
                    })
                    .collect::<MappingResult<Vec<_>>>()
                    .map(FieldValue::Map),
                other => Err(mismatch(field, kind, other.kind_name())),
            },
            FieldKind::Opaque(_) => match stored {
                Value::Document(document) => self.decode_opaque(document).map(FieldValue::Opaque),
                other => Err(mismatch(field, kind, other.kind_name())),
            },
            FieldKind::Dynamic => self.decode_dynamic(stored, field, owner_type),
            FieldKind::Document => match stored {
                Value::Document(document) => Ok(FieldValue::Document(document.clone())),
                other => Err(mismatch(field, kind, other.kind_name())),
            },
        }
    }

    fn decode_enum(
        &self,
        enum_type: &str,
        stored: &Value,
        field: &FieldDescriptor,
        kind: &FieldKind,
    ) -> MappingResult<FieldValue> {
        let name = match stored {
            Value::String(name) => name.as_str(),
            Value::Document(document) => document
                .get_str(ENUM_NAME_KEY)
                .ok_or_else(|| mismatch(field, kind, stored.kind_name()))?,
            other => return Err(mismatch(field, kind, other.kind_name())),
        };
        if let Some(registration) = self.registry().enum_type(enum_type) {
            if !registration.has_variant(name) {
                return Err(MappingError::UnknownVariant {
                    type_path: enum_type.to_string(),
                    variant: name.to_string(),
                });
            }
        }
        Ok(FieldValue::Enum(EnumValue {
            type_path: enum_type.to_string(),
            variant: name.to_string(),
        }))
    }

    /// A marker gives the concrete type and collection; a plain id uses
    /// the declared target type and its collection.
    fn decode_reference_value(
        &self,
        target: &str,
        stored: &Value,
        field: &FieldDescriptor,
        owner_type: &str,
    ) -> MappingResult<FieldValue> {
        let lazy = field.flags.lazy;
        let owner = Some(format!("{owner_type}.{}", field.name));
        let cell = match stored {
            Value::Reference(marker) => self.references.from_marker(marker, lazy, owner),
            Value::Document(document) => {
                let marker = ReferenceMarker::from_document(document)
                    .ok_or_else(|| mismatch(field, &field.kind, stored.kind_name()))?;
                self.references.from_marker(&marker, lazy, owner)
            }
            other => {
                let id = IdValue::from_value(other)
                    .ok_or_else(|| mismatch(field, &field.kind, other.kind_name()))?;
                let collection = self.collection_for(target)?;
                self.references
                    .from_id(target, id, Some(collection), lazy, owner)
            }
        };
        Ok(FieldValue::Reference(cell))
    }

    /// Decode a value that carries its own type: discriminated documents
    /// become objects or enums, markers become lazy references, binary
    /// fallback documents become opaque values.
    fn decode_dynamic(
        &self,
        stored: &Value,
        field: &FieldDescriptor,
        owner_type: &str,
    ) -> MappingResult<FieldValue> {
        match stored {
            Value::Null => Ok(FieldValue::Null),
            Value::Reference(marker) => {
                let owner = Some(format!("{owner_type}.{}", field.name));
                Ok(FieldValue::Reference(self.references.from_marker(marker, true, owner)))
            }
            Value::List(items) => items
                .iter()
                .map(|item| self.decode_dynamic(item, field, owner_type))
                .collect::<MappingResult<Vec<_>>>()
                .map(FieldValue::List),
            Value::Document(document) => {
                let key = self.discriminator_key();
                if self.config.allow_binary_fallback && is_binary_document(document, key) {
                    return self.decode_opaque(document).map(FieldValue::Opaque);
                }
                if let Some(marker) = ReferenceMarker::from_document(document) {
                    let owner = Some(format!("{owner_type}.{}", field.name));
                    return Ok(FieldValue::Reference(self.references.from_marker(&marker, true, owner)));
                }
                if let Some(name) = document.get_str(key) {
                    let type_path = self.registry().resolve_name(name)?;
                    if self.registry().enum_type(type_path).is_some() {
                        return self.decode_enum(type_path, stored, field, &FieldKind::Dynamic);
                    }
                    return self.decode_object(type_path, document).map(FieldValue::Object);
                }
                document
                    .iter()
                    .map(|(key, item)| {
                        self.decode_dynamic(item, field, owner_type)
                            .map(|value| (key.to_string(), value))
                    })
                    .collect::<MappingResult<Vec<_>>>()
                    .map(FieldValue::Map)
            }
            scalar => Ok(FieldValue::Scalar(scalar.clone())),
        }
    }
}

/// Type path a codec for values of declared kind `kind` is registered under.
fn declared_codec_type(kind: &FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Scalar(scalar) => Some(scalar.name()),
        FieldKind::Enum(path) | FieldKind::Model(path) | FieldKind::Opaque(path) => Some(path),
        _ => None,
    }
}
