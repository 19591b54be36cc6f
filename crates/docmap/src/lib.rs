//! docmap: map Rust models to schemaless documents.
//!
//! This crate is the entry point for applications. It re-exports the
//! pieces of the individual crates and adds [`Datastore`], a session over an
//! [`ObjectMapper`] that runs the lifecycle hooks around saving, loading,
//! updating and removing entities.
//!
//! ```ignore
//! use docmap::prelude::*;
//!
//! let mut registry = TypeRegistry::new();
//! registry.register::<Order>();
//! let store = Datastore::in_memory(registry);
//! let id = store.save(&mut order)?;
//! let loaded: Option<Order> = store.get(id)?;
//! ```

pub mod datastore;
pub mod error;

pub use datastore::Datastore;
pub use error::{DatastoreError, DatastoreResult};

pub use docmap_codec::{CodecError, CodecRegistry, CustomCodec, FnCodec};
pub use docmap_mapper::{MapperConfig, MappingError, MappingResult, ObjectMapper, ObjectMapperBuilder};
pub use docmap_meta::{EntityTypeDescriptor, FieldDescriptor, MetadataResolver, TypeRegistry};
pub use docmap_model::{
    enum_property, model_fields, model_property, AnyModel, ChangeTracked, EnumModel, FieldKind,
    FieldSchema, FieldValue, Hook, HookKind, Model, ModelError, Opaque, Property, Reference,
    ReferenceError, ScalarKind, TypeSchema,
};
pub use docmap_refs::{DereferenceGuard, DereferenceRequest};
pub use docmap_store::{
    CollectionNaming, DefaultCollectionNaming, DocumentStore, InMemoryDocumentStore, StoreError,
};
pub use docmap_types::{Document, EntityId, IdValue, ReferenceMarker, Value};

/// The types most applications need.
pub mod prelude {
    pub use crate::{Datastore, DatastoreError, DatastoreResult};
    pub use docmap_mapper::{MapperConfig, ObjectMapper};
    pub use docmap_meta::TypeRegistry;
    pub use docmap_model::{
        enum_property, model_fields, model_property, ChangeTracked, EnumModel, FieldKind,
        FieldSchema, Hook, HookKind, Model, Property, Reference, ScalarKind, TypeSchema,
    };
    pub use docmap_types::{Document, EntityId, IdValue, Value};
}

#[cfg(test)]
mod scenarios;
#[cfg(test)]
mod testing;
