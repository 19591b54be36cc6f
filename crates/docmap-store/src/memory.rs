use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use docmap_types::{Document, EntityId, IdValue, Value, ID_KEY};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::naming::DefaultCollectionNaming;
use crate::traits::{CollectionNaming, DocumentStore};

type Collection = HashMap<String, Document>;

/// In-memory, HashMap-based document store.
///
/// Intended for tests and embedding. Collections are held behind a
/// `RwLock`; documents are cloned on read and write. Documents are keyed
/// by the display form of their id, so an opaque id and its hex text find
/// the same document.
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Collection>>,
    naming: Arc<dyn CollectionNaming>,
    latency: Option<Duration>,
    offline: AtomicBool,
    finds: AtomicUsize,
    stores: AtomicUsize,
}

impl InMemoryDocumentStore {
    /// Create a new empty store using [`DefaultCollectionNaming`].
    pub fn new() -> Self {
        Self::with_naming(Arc::new(DefaultCollectionNaming::new()))
    }

    pub fn with_naming(naming: Arc<dyn CollectionNaming>) -> Self {
        Self {
            collections: RwLock::new(HashMap::new()),
            naming,
            latency: None,
            offline: AtomicBool::new(false),
            finds: AtomicUsize::new(0),
            stores: AtomicUsize::new(0),
        }
    }

    /// Delay every `find` by `latency`.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// While offline, every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Number of `find` calls answered so far.
    pub fn find_count(&self) -> usize {
        self.finds.load(Ordering::SeqCst)
    }

    /// Number of documents written so far.
    pub fn store_count(&self) -> usize {
        self.stores.load(Ordering::SeqCst)
    }

    /// Total number of documents across all collections.
    pub fn len(&self) -> usize {
        self.collections
            .read()
            .expect("lock poisoned")
            .values()
            .map(HashMap::len)
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Names of all collections, sorted.
    pub fn collection_names(&self) -> Vec<String> {
        let map = self.collections.read().expect("lock poisoned");
        let mut names: Vec<String> = map.keys().cloned().collect();
        names.sort();
        names
    }

    /// All documents of one collection, sorted by id.
    pub fn documents(&self, collection: &str) -> Vec<Document> {
        let map = self.collections.read().expect("lock poisoned");
        let Some(docs) = map.get(collection) else {
            return Vec::new();
        };
        let mut entries: Vec<(&String, &Document)> = docs.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, doc)| doc.clone()).collect()
    }

    /// Remove all documents.
    pub fn clear(&self) {
        self.collections.write().expect("lock poisoned").clear();
    }

    fn collection_for(&self, type_path: &str, collection: Option<&str>) -> String {
        match collection {
            Some(name) => name.to_string(),
            None => self.naming.collection_name_for(type_path),
        }
    }

    fn check_online(&self) -> StoreResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        Ok(())
    }
}

impl Default for InMemoryDocumentStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of `document` with `_id` as its first key.
fn with_leading_id(document: Document, id: &IdValue) -> Document {
    let mut out = Document::with_capacity(document.len() + 1);
    out.insert(ID_KEY, id.to_value());
    for (key, value) in document {
        if key != ID_KEY {
            out.insert(key, value);
        }
    }
    out
}

impl DocumentStore for InMemoryDocumentStore {
    fn find(
        &self,
        type_path: &str,
        id: &IdValue,
        collection: Option<&str>,
    ) -> StoreResult<Option<Document>> {
        if let Some(latency) = self.latency {
            thread::sleep(latency);
        }
        self.check_online()?;
        self.finds.fetch_add(1, Ordering::SeqCst);
        let collection = self.collection_for(type_path, collection);
        let map = self.collections.read().expect("lock poisoned");
        Ok(map
            .get(&collection)
            .and_then(|docs| docs.get(&id.to_text()))
            .cloned())
    }

    fn store(
        &self,
        type_path: &str,
        collection: Option<&str>,
        document: Document,
    ) -> StoreResult<IdValue> {
        self.check_online()?;
        let collection = self.collection_for(type_path, collection);
        let (id, document) = match document.get(ID_KEY) {
            None | Some(Value::Null) => {
                let id = IdValue::Opaque(EntityId::generate());
                let document = with_leading_id(document, &id);
                (id, document)
            }
            Some(value) => {
                let id = IdValue::from_value(value).ok_or_else(|| StoreError::InvalidId {
                    collection: collection.clone(),
                    found: value.kind_name().to_string(),
                })?;
                (id, document)
            }
        };

        debug!(collection = %collection, id = %id, "storing document");
        self.stores.fetch_add(1, Ordering::SeqCst);
        let mut map = self.collections.write().expect("lock poisoned");
        map.entry(collection)
            .or_default()
            .insert(id.to_text(), document);
        Ok(id)
    }

    fn remove(&self, type_path: &str, id: &IdValue, collection: Option<&str>) -> StoreResult<bool> {
        self.check_online()?;
        let collection = self.collection_for(type_path, collection);
        let mut map = self.collections.write().expect("lock poisoned");
        Ok(map
            .get_mut(&collection)
            .map(|docs| docs.remove(&id.to_text()).is_some())
            .unwrap_or(false))
    }
}

impl std::fmt::Debug for InMemoryDocumentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryDocumentStore")
            .field("collections", &self.collection_names())
            .field("documents", &self.len())
            .finish()
    }
}
