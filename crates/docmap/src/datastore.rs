use std::sync::Arc;

use docmap_mapper::{MappingError, ObjectMapper};
use docmap_meta::TypeRegistry;
use docmap_model::{AnyModel, ChangeTracked, HookKind, Model};
use docmap_types::{Document, IdValue};
use tracing::debug;

use crate::error::{DatastoreError, DatastoreResult};

/// Entity session over an [`ObjectMapper`].
///
/// Hooks run at every lifecycle point: `PreStore`/`PostStore` on save,
/// `PostLoad` on get, `PreUpdate`/`PostUpdate` on update and
/// `PreRemove`/`PostRemove` on delete. Each call also reaches embedded
/// objects and references that are already loaded.
#[derive(Clone, Debug)]
pub struct Datastore {
    mapper: Arc<ObjectMapper>,
}

impl Datastore {
    pub fn new(mapper: Arc<ObjectMapper>) -> Self {
        Self { mapper }
    }

    /// Session over a default mapper backed by an in-memory store.
    pub fn in_memory(registry: TypeRegistry) -> Self {
        Self::new(ObjectMapper::builder().registry(registry).build())
    }

    pub fn mapper(&self) -> &Arc<ObjectMapper> {
        &self.mapper
    }

    // ---- Saving ----

    /// Store an entity and write its id back.
    pub fn save<T: Model>(&self, model: &mut T) -> DatastoreResult<IdValue> {
        Ok(self.mapper.store_model(model)?)
    }

    pub fn save_all<'a, T: Model>(
        &self,
        models: impl IntoIterator<Item = &'a mut T>,
    ) -> DatastoreResult<Vec<IdValue>> {
        models.into_iter().map(|model| self.save(model)).collect()
    }

    // ---- Loading ----

    pub fn get<T: Model>(&self, id: impl Into<IdValue>) -> DatastoreResult<Option<T>> {
        let Some(mut model) = self.mapper.load::<T>(id)? else {
            return Ok(None);
        };
        self.run_hooks(HookKind::PostLoad, &mut model)?;
        Ok(Some(model))
    }

    /// Load by type path. The result has the concrete type recorded in the
    /// stored discriminator.
    pub fn get_dyn(&self, type_path: &str, id: &IdValue) -> DatastoreResult<Option<Box<dyn AnyModel>>> {
        let Some(mut model) = self.mapper.load_dyn(type_path, id)? else {
            return Ok(None);
        };
        self.run_hooks(HookKind::PostLoad, &mut *model)?;
        Ok(Some(model))
    }

    // ---- Updating ----

    /// Write the recorded changes of an already stored entity.
    ///
    /// Only the changed fields are replaced in the stored document; every
    /// other stored key is kept. Returns `false` when nothing changed.
    pub fn update<T: Model>(&self, tracked: &mut ChangeTracked<T>) -> DatastoreResult<bool> {
        if !tracked.is_dirty() {
            return Ok(false);
        }
        let id = self
            .mapper
            .id_of(&**tracked)?
            .ok_or_else(|| MappingError::MissingId {
                type_path: T::TYPE_PATH.to_string(),
            })?;
        let collection = self.mapper.collection_for(T::TYPE_PATH)?;
        let store = self.mapper.store();
        let mut document = store
            .find(T::TYPE_PATH, &id, Some(&collection))?
            .ok_or_else(|| DatastoreError::NotFound {
                type_path: T::TYPE_PATH.to_string(),
                id: id.to_text(),
            })?;

        let before = self.mapper.encode(&**tracked)?;
        self.run_hooks(HookKind::PreUpdate, tracked.untracked_mut())?;
        self.track_hook_changes(tracked, &before)?;
        let changes = self.mapper.encode_changes(tracked)?;
        let changed = changes.len();
        for (key, value) in changes {
            document.insert(key, value);
        }
        store.store(T::TYPE_PATH, Some(&collection), document)?;
        self.run_hooks(HookKind::PostUpdate, tracked.untracked_mut())?;

        debug!(type_path = T::TYPE_PATH, id = %id, keys = changed, "updated entity");
        tracked.clear();
        Ok(true)
    }

    // ---- Removing ----

    /// Delete a stored entity. Returns `false` if it was not stored.
    pub fn delete<T: Model>(&self, model: &mut T) -> DatastoreResult<bool> {
        self.run_hooks(HookKind::PreRemove, model)?;
        let removed = self.mapper.remove_dyn(&*model)?;
        if removed {
            self.run_hooks(HookKind::PostRemove, model)?;
        }
        debug!(type_path = T::TYPE_PATH, removed, "removed entity");
        Ok(removed)
    }

    /// Mark the persistent fields a hook rewrote as changed, by comparing
    /// encodings taken before and after it ran.
    fn track_hook_changes<T: Model>(
        &self,
        tracked: &mut ChangeTracked<T>,
        before: &Document,
    ) -> DatastoreResult<()> {
        let after = self.mapper.encode(&**tracked)?;
        let descriptor = self
            .mapper
            .resolver()
            .descriptor_for(T::TYPE_PATH)
            .map_err(MappingError::from)?;
        for field in descriptor.persistent_fields() {
            let key = field.storage_name.as_str();
            if before.get(key) != after.get(key) {
                tracked.mark_changed(field.name);
            }
        }
        Ok(())
    }

    fn run_hooks(&self, kind: HookKind, model: &mut dyn AnyModel) -> DatastoreResult<()> {
        self.mapper
            .resolver()
            .call_lifecycle_hook(kind, model)
            .map_err(MappingError::from)?;
        Ok(())
    }
}
