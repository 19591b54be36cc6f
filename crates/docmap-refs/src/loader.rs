use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::Duration;

use docmap_model::{Loaded, ReferenceError, ReferenceKey, ReferenceLoader};
use docmap_store::DocumentStore;
use docmap_types::Document;
use tracing::{debug, warn};

use crate::decoder::DocumentDecoder;
use crate::guard::{DereferenceGuard, DereferenceRequest};

thread_local! {
    /// Keys whose documents are being decoded on this thread.
    static IN_FLIGHT: RefCell<HashSet<ReferenceKey>> = RefCell::new(HashSet::new());
}

/// Marks a key as in flight until dropped.
struct InFlight(ReferenceKey);

impl InFlight {
    fn enter(key: &ReferenceKey) -> Self {
        IN_FLIGHT.with(|keys| keys.borrow_mut().insert(key.clone()));
        Self(key.clone())
    }
}

impl Drop for InFlight {
    fn drop(&mut self) {
        IN_FLIGHT.with(|keys| keys.borrow_mut().remove(&self.0));
    }
}

/// Whether the current thread is decoding the target of `key`.
///
/// An eager reference met while its own target is being decoded has to be
/// deferred, otherwise a cycle of eager references never terminates.
pub(crate) fn is_loading(key: &ReferenceKey) -> bool {
    IN_FLIGHT.with(|keys| keys.borrow().contains(key))
}

/// Loads reference targets from a [`DocumentStore`].
///
/// Every load consults the registered guards first, then finds the document
/// by type, id and collection, then hands it to the [`DocumentDecoder`].
pub struct StoreLoader {
    store: Arc<dyn DocumentStore>,
    decoder: Weak<dyn DocumentDecoder>,
    guards: Vec<Arc<dyn DereferenceGuard>>,
    timeout: Option<Duration>,
}

impl StoreLoader {
    pub fn new(store: Arc<dyn DocumentStore>, decoder: Weak<dyn DocumentDecoder>) -> Self {
        Self {
            store,
            decoder,
            guards: Vec::new(),
            timeout: None,
        }
    }

    pub fn with_guard(mut self, guard: Arc<dyn DereferenceGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn with_guards(mut self, guards: impl IntoIterator<Item = Arc<dyn DereferenceGuard>>) -> Self {
        self.guards.extend(guards);
        self
    }

    /// Give up on a store lookup after `timeout`.
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    fn find(&self, key: &ReferenceKey) -> Result<Option<Document>, ReferenceError> {
        let Some(timeout) = self.timeout else {
            return self
                .store
                .find(&key.type_path, &key.id, key.collection.as_deref())
                .map_err(|e| load_error(key, e.to_string()));
        };

        let (tx, rx) = mpsc::channel();
        let store = Arc::clone(&self.store);
        let lookup = key.clone();
        thread::spawn(move || {
            let found = store.find(&lookup.type_path, &lookup.id, lookup.collection.as_deref());
            // The receiver is gone once the lookup timed out.
            let _ = tx.send(found);
        });

        match rx.recv_timeout(timeout) {
            Ok(found) => found.map_err(|e| load_error(key, e.to_string())),
            Err(RecvTimeoutError::Timeout) => {
                let millis = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
                warn!(reference = %key, millis, "reference lookup timed out");
                Err(ReferenceError::Timeout {
                    type_path: key.type_path.clone(),
                    id: key.id.to_text(),
                    millis,
                })
            }
            Err(RecvTimeoutError::Disconnected) => {
                Err(load_error(key, "lookup thread exited without an answer"))
            }
        }
    }
}

fn load_error(key: &ReferenceKey, reason: impl Into<String>) -> ReferenceError {
    ReferenceError::Load {
        type_path: key.type_path.clone(),
        id: key.id.to_text(),
        reason: reason.into(),
    }
}

impl ReferenceLoader for StoreLoader {
    fn load(&self, key: &ReferenceKey, owner: Option<&str>) -> Result<Loaded, ReferenceError> {
        let request = DereferenceRequest { key, owner };
        if let Some(guard) = self.guards.iter().find(|g| !g.allow(&request)) {
            warn!(reference = %key, owner, guard = guard.name(), "reference load vetoed");
            return Ok(Loaded::Vetoed);
        }

        let document = match self.find(key) {
            Ok(Some(document)) => document,
            Ok(None) => {
                debug!(reference = %key, "reference target not found");
                return Ok(Loaded::Missing);
            }
            Err(e) => {
                warn!(reference = %key, owner, error = %e, "reference load failed");
                return Err(e);
            }
        };

        let decoder = self
            .decoder
            .upgrade()
            .ok_or_else(|| load_error(key, "the mapper that created this reference is gone"))?;
        let _in_flight = InFlight::enter(key);
        match decoder.decode_reference(&key.type_path, document) {
            Ok(Some(target)) => Ok(Loaded::Found(target)),
            Ok(None) => Ok(Loaded::Missing),
            Err(reason) => {
                warn!(reference = %key, owner, reason = %reason, "reference target failed to decode");
                Err(load_error(key, reason))
            }
        }
    }
}

impl fmt::Debug for StoreLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreLoader")
            .field("guards", &self.guards.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}
