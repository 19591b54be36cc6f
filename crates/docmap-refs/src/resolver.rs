use std::sync::Arc;

use docmap_model::{ReferenceCell, ReferenceKey, ReferenceLoader};
use docmap_types::{IdValue, ReferenceMarker};

use crate::loader::{is_loading, StoreLoader};

/// Builds reference cells for decoded reference fields.
#[derive(Clone, Debug)]
pub struct ReferenceResolver {
    loader: Arc<StoreLoader>,
}

impl ReferenceResolver {
    pub fn new(loader: Arc<StoreLoader>) -> Self {
        Self { loader }
    }

    pub fn loader(&self) -> &Arc<StoreLoader> {
        &self.loader
    }

    /// Cell for a stored marker. The marker names the concrete type and
    /// collection.
    pub fn from_marker(
        &self,
        marker: &ReferenceMarker,
        lazy: bool,
        owner: Option<String>,
    ) -> Arc<ReferenceCell> {
        let key = ReferenceKey {
            type_path: marker.type_path.clone(),
            id: marker.id.clone(),
            collection: marker.collection.clone(),
        };
        self.reference(key, lazy, owner)
    }

    /// Cell for a plain stored id of the declared target type.
    pub fn from_id(
        &self,
        target_type: &str,
        id: IdValue,
        collection: Option<String>,
        lazy: bool,
        owner: Option<String>,
    ) -> Arc<ReferenceCell> {
        let key = ReferenceKey {
            type_path: target_type.to_string(),
            id,
            collection,
        };
        self.reference(key, lazy, owner)
    }

    /// Lazy cells load on first access; eager cells load now. An eager
    /// reference back to a target that is still being decoded is deferred.
    pub fn reference(&self, key: ReferenceKey, lazy: bool, owner: Option<String>) -> Arc<ReferenceCell> {
        let loader: Arc<dyn ReferenceLoader> = self.loader.clone();
        let cell = if lazy || is_loading(&key) {
            ReferenceCell::lazy(key, loader, owner)
        } else {
            ReferenceCell::eager(key, loader, owner)
        };
        Arc::new(cell)
    }
}
