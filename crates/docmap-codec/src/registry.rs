use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};

use tracing::debug;

use crate::codec::CustomCodec;

/// Type path to codec map.
///
/// Lookups take a read lock; registration takes a short write lock and
/// may happen at any time, also while other threads are mapping.
#[derive(Default)]
pub struct CodecRegistry {
    codecs: RwLock<HashMap<String, Arc<dyn CustomCodec>>>,
}

impl CodecRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `codec` for `type_path`, returning the codec it replaces.
    pub fn register(
        &self,
        type_path: impl Into<String>,
        codec: impl CustomCodec + 'static,
    ) -> Option<Arc<dyn CustomCodec>> {
        self.register_shared(type_path, Arc::new(codec))
    }

    pub fn register_shared(
        &self,
        type_path: impl Into<String>,
        codec: Arc<dyn CustomCodec>,
    ) -> Option<Arc<dyn CustomCodec>> {
        let type_path = type_path.into();
        let previous = self
            .codecs
            .write()
            .expect("lock poisoned")
            .insert(type_path.clone(), codec);
        debug!(
            type_path = %type_path,
            replaced = previous.is_some(),
            "registered custom codec"
        );
        previous
    }

    pub fn lookup(&self, type_path: &str) -> Option<Arc<dyn CustomCodec>> {
        self.codecs
            .read()
            .expect("lock poisoned")
            .get(type_path)
            .cloned()
    }

    pub fn unregister(&self, type_path: &str) -> Option<Arc<dyn CustomCodec>> {
        self.codecs.write().expect("lock poisoned").remove(type_path)
    }

    pub fn contains(&self, type_path: &str) -> bool {
        self.codecs
            .read()
            .expect("lock poisoned")
            .contains_key(type_path)
    }

    pub fn len(&self) -> usize {
        self.codecs.read().expect("lock poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Registered type paths, sorted.
    pub fn type_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .codecs
            .read()
            .expect("lock poisoned")
            .keys()
            .cloned()
            .collect();
        paths.sort();
        paths
    }
}

impl fmt::Debug for CodecRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("type_paths", &self.type_paths())
            .finish()
    }
}
