use std::fmt;
use std::sync::{Arc, Weak};

use docmap_codec::CodecRegistry;
use docmap_meta::{EntityTypeDescriptor, FieldDescriptor, MetadataResolver, TypeRegistry};
use docmap_model::{AnyModel, FieldKind, FieldValue, HookKind, IdRepr, Model, ModelError};
use docmap_refs::{DereferenceGuard, DocumentDecoder, ReferenceResolver, StoreLoader};
use docmap_store::{CollectionNaming, DefaultCollectionNaming, DocumentStore, InMemoryDocumentStore};
use docmap_types::{Document, IdValue};
use tracing::debug;

use crate::coerce::coerce_id;
use crate::config::MapperConfig;
use crate::error::{MappingError, MappingResult};

/// Maps models to documents and back.
///
/// An `ObjectMapper` owns everything a mapping call needs: the metadata
/// resolver with its caches, the codec registry, the store references are
/// loaded from, and the collection naming. It is built once and shared
/// behind an `Arc`; all methods take `&self`.
pub struct ObjectMapper {
    pub(crate) config: MapperConfig,
    pub(crate) resolver: Arc<MetadataResolver>,
    pub(crate) codecs: Arc<CodecRegistry>,
    pub(crate) store: Arc<dyn DocumentStore>,
    pub(crate) naming: Arc<dyn CollectionNaming>,
    pub(crate) references: ReferenceResolver,
}

impl ObjectMapper {
    pub fn builder() -> ObjectMapperBuilder {
        ObjectMapperBuilder::default()
    }

    pub fn config(&self) -> &MapperConfig {
        &self.config
    }

    pub fn resolver(&self) -> &Arc<MetadataResolver> {
        &self.resolver
    }

    pub fn registry(&self) -> &TypeRegistry {
        self.resolver.registry()
    }

    pub fn codecs(&self) -> &Arc<CodecRegistry> {
        &self.codecs
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub(crate) fn discriminator_key(&self) -> &str {
        &self.config.discriminator_key
    }

    /// Collection documents of `type_path` are stored in: the collection
    /// declared in the type's hierarchy, else the naming collaborator's
    /// choice.
    pub fn collection_for(&self, type_path: &str) -> MappingResult<String> {
        let descriptor = self.resolver.descriptor_for(type_path)?;
        Ok(self.collection_of(&descriptor))
    }

    pub(crate) fn collection_of(&self, descriptor: &EntityTypeDescriptor) -> String {
        match descriptor.collection {
            Some(name) => name.to_string(),
            None => self.naming.collection_name_for(descriptor.type_path),
        }
    }

    /// Current id of an entity, if it has one.
    pub fn id_of(&self, model: &dyn AnyModel) -> MappingResult<Option<IdValue>> {
        let descriptor = self.resolver.descriptor_for(model.type_path())?;
        let Some(id_field) = descriptor.id_field() else {
            return Ok(None);
        };
        let value = read_field(&descriptor, model, id_field)?;
        Ok(value.as_scalar().and_then(IdValue::from_value))
    }

    /// Write `id` into the model's id field, in the field's representation.
    pub(crate) fn assign_id(
        &self,
        descriptor: &EntityTypeDescriptor,
        model: &mut dyn AnyModel,
        id: &IdValue,
    ) -> MappingResult<()> {
        let id_field = descriptor.id_field().ok_or_else(|| MappingError::MissingId {
            type_path: descriptor.type_path.to_string(),
        })?;
        let repr = match id_field.kind {
            FieldKind::Id(repr) => repr,
            _ => IdRepr::Opaque,
        };
        let value = coerce_id(&id.to_value(), repr).ok_or_else(|| MappingError::IdCoercion {
            type_path: descriptor.type_path.to_string(),
            found: id.to_text(),
        })?;
        model.set(id_field.name, FieldValue::Scalar(value))?;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Store round trips
    // -----------------------------------------------------------------------

    /// Persist an entity and write the assigned id back into it.
    ///
    /// Runs the `PreStore` hooks before encoding and the `PostStore` hooks
    /// after the id is assigned.
    pub fn store_model<T: Model>(&self, model: &mut T) -> MappingResult<IdValue> {
        self.store_dyn(model)
    }

    pub fn store_dyn(&self, model: &mut dyn AnyModel) -> MappingResult<IdValue> {
        let type_path = model.type_path();
        let descriptor = self.resolver.descriptor_for(type_path)?;
        if !descriptor.is_entity() {
            return Err(MappingError::NotMappable(type_path.to_string()));
        }

        self.resolver.call_lifecycle_hook(HookKind::PreStore, model)?;
        let document = self.encode_dyn(&*model)?;
        let collection = self.collection_of(&descriptor);
        let id = self.store.store(type_path, Some(&collection), document)?;
        self.assign_id(&descriptor, model, &id)?;
        self.resolver.call_lifecycle_hook(HookKind::PostStore, model)?;

        debug!(type_path, collection = %collection, id = %id, "stored entity");
        Ok(id)
    }

    /// Find and decode an entity by id.
    pub fn load<T: Model>(&self, id: impl Into<IdValue>) -> MappingResult<Option<T>> {
        match self.load_dyn(T::TYPE_PATH, &id.into())? {
            Some(model) => downcast(model).map(Some),
            None => Ok(None),
        }
    }

    /// Find and decode an entity of `type_path`, or of a subtype recorded
    /// in the stored discriminator.
    pub fn load_dyn(&self, type_path: &str, id: &IdValue) -> MappingResult<Option<Box<dyn AnyModel>>> {
        let type_path = self.registry().resolve_name(type_path)?;
        let collection = self.collection_for(type_path)?;
        match self.store.find(type_path, id, Some(&collection))? {
            Some(document) => self.decode_dyn(type_path, &document),
            None => Ok(None),
        }
    }

    /// Delete an entity by its id. Returns `true` if it existed.
    pub fn remove_dyn(&self, model: &dyn AnyModel) -> MappingResult<bool> {
        let type_path = model.type_path();
        let id = self.id_of(model)?.ok_or_else(|| MappingError::MissingId {
            type_path: type_path.to_string(),
        })?;
        let collection = self.collection_for(type_path)?;
        Ok(self.store.remove(type_path, &id, Some(&collection))?)
    }
}

/// Read a declared field, treating an unknown name as a broken model impl.
pub(crate) fn read_field(
    descriptor: &EntityTypeDescriptor,
    model: &dyn AnyModel,
    field: &FieldDescriptor,
) -> MappingResult<FieldValue> {
    model.field(field.name).ok_or_else(|| {
        MappingError::Model(ModelError::UnknownField {
            type_path: descriptor.type_path,
            field: field.name.to_string(),
        })
    })
}

pub(crate) fn downcast<T: Model>(model: Box<dyn AnyModel>) -> MappingResult<T> {
    let found = model.type_path();
    model.take::<T>().ok_or(MappingError::Model(ModelError::TypeMismatch {
        expected: T::TYPE_PATH,
        found,
    }))
}

impl DocumentDecoder for ObjectMapper {
    fn decode_reference(
        &self,
        type_path: &str,
        document: Document,
    ) -> Result<Option<Box<dyn AnyModel>>, String> {
        self.decode_dyn(type_path, &document).map_err(|e| e.to_string())
    }
}

impl fmt::Debug for ObjectMapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ObjectMapper")
            .field("config", &self.config)
            .field("registry", self.resolver.registry())
            .field("codecs", &self.codecs)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Builder
// ---------------------------------------------------------------------------

/// Assembles an [`ObjectMapper`].
///
/// Everything but the registry has a default: an in-memory store, the
/// default collection naming, an empty codec registry, and
/// [`MapperConfig::default`].
#[derive(Default)]
pub struct ObjectMapperBuilder {
    registry: Option<Arc<TypeRegistry>>,
    config: MapperConfig,
    codecs: Option<Arc<CodecRegistry>>,
    store: Option<Arc<dyn DocumentStore>>,
    naming: Option<Arc<dyn CollectionNaming>>,
    guards: Vec<Arc<dyn DereferenceGuard>>,
}

impl ObjectMapperBuilder {
    pub fn registry(mut self, registry: TypeRegistry) -> Self {
        self.registry = Some(Arc::new(registry));
        self
    }

    pub fn shared_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn config(mut self, config: MapperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn codecs(mut self, codecs: Arc<CodecRegistry>) -> Self {
        self.codecs = Some(codecs);
        self
    }

    pub fn store(mut self, store: Arc<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn naming(mut self, naming: Arc<dyn CollectionNaming>) -> Self {
        self.naming = Some(naming);
        self
    }

    /// Consult `guard` before every reference load.
    pub fn guard(mut self, guard: Arc<dyn DereferenceGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn build(self) -> Arc<ObjectMapper> {
        let registry = self.registry.unwrap_or_default();
        let resolver = Arc::new(MetadataResolver::new(registry));
        let codecs = self.codecs.unwrap_or_default();
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryDocumentStore::new()));
        let naming = self
            .naming
            .unwrap_or_else(|| Arc::new(DefaultCollectionNaming::new()));
        let config = self.config;
        let guards = self.guards;

        Arc::new_cyclic(|mapper: &Weak<ObjectMapper>| {
            let decoder: Weak<dyn DocumentDecoder> = mapper.clone();
            let loader = StoreLoader::new(Arc::clone(&store), decoder)
                .with_guards(guards)
                .with_timeout(config.load_timeout);
            ObjectMapper {
                references: ReferenceResolver::new(Arc::new(loader)),
                config,
                resolver,
                codecs,
                store,
                naming,
            }
        })
    }
}

/// Field label used in error messages: `zoo::Cat.friend`.
pub(crate) fn field_label(field: &FieldDescriptor) -> String {
    format!("{}.{}", field.declaring_type, field.name)
}

pub(crate) fn mismatch(field: &FieldDescriptor, kind: &FieldKind, found: &'static str) -> MappingError {
    MappingError::Coercion {
        field: field_label(field),
        expected: kind.describe(),
        found,
    }
}

pub(crate) fn codec_error(type_path: &str, source: docmap_codec::CodecError) -> MappingError {
    MappingError::Codec {
        type_path: type_path.to_string(),
        source,
    }
}
