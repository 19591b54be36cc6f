//! Cross-entity references.
//!
//! A [`ReferenceCell`] is the single source of truth for one reference
//! edge. It is either resolved from the start (it was built around an
//! in-memory target) or unresolved, holding the target's type and id plus a
//! [`ReferenceLoader`]. An unresolved cell runs its loader at most once:
//! concurrent first accesses block on the same initialization and all
//! observe the same [`Resolution`].

use std::fmt;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

use docmap_types::IdValue;
use tracing::debug;

use crate::error::{ModelResult, ReferenceError};
use crate::model::{AnyModel, FieldValue, Model};
use crate::property::Property;

/// Target object shared by every holder of a reference.
pub type SharedModel = Arc<RwLock<Box<dyn AnyModel>>>;

/// What a loader needs to find a referenced entity.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ReferenceKey {
    pub type_path: String,
    pub id: IdValue,
    pub collection: Option<String>,
}

impl fmt::Display for ReferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.collection {
            Some(c) => write!(f, "{}#{} in {}", self.type_path, self.id, c),
            None => write!(f, "{}#{}", self.type_path, self.id),
        }
    }
}

/// Outcome of one load attempt.
#[derive(Debug)]
pub enum Loaded {
    Found(Box<dyn AnyModel>),
    Missing,
    /// A dereference guard refused the load.
    Vetoed,
}

/// Collaborator that materializes referenced entities.
pub trait ReferenceLoader: Send + Sync {
    fn load(&self, key: &ReferenceKey, owner: Option<&str>) -> Result<Loaded, ReferenceError>;
}

/// Final state of a reference cell.
#[derive(Clone)]
pub enum Resolution {
    Found(SharedModel),
    Missing,
    Vetoed,
    Failed(ReferenceError),
}

impl Resolution {
    pub fn target(&self) -> Option<&SharedModel> {
        match self {
            Resolution::Found(shared) => Some(shared),
            _ => None,
        }
    }
}

impl fmt::Debug for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolution::Found(shared) => match shared.read() {
                Ok(target) => f.debug_tuple("Found").field(&target.type_path()).finish(),
                Err(_) => f.write_str("Found(<poisoned>)"),
            },
            Resolution::Missing => f.write_str("Missing"),
            Resolution::Vetoed => f.write_str("Vetoed"),
            Resolution::Failed(e) => f.debug_tuple("Failed").field(e).finish(),
        }
    }
}

/// One reference edge.
pub struct ReferenceCell {
    target_type: String,
    id: RwLock<Option<IdValue>>,
    collection: Option<String>,
    owner: Option<String>,
    lazy: bool,
    loader: Option<Arc<dyn ReferenceLoader>>,
    resolution: OnceLock<Resolution>,
    loads: AtomicUsize,
}

impl ReferenceCell {
    /// Resolved cell around an in-memory target with no id yet.
    pub fn from_model(target: Box<dyn AnyModel>) -> Self {
        Self::from_shared(Arc::new(RwLock::new(target)))
    }

    /// Resolved cell around an existing shared target.
    pub fn from_shared(target: SharedModel) -> Self {
        let target_type = target
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .type_path()
            .to_string();
        let resolution = OnceLock::new();
        let _ = resolution.set(Resolution::Found(target));
        Self {
            target_type,
            id: RwLock::new(None),
            collection: None,
            owner: None,
            lazy: false,
            loader: None,
            resolution,
            loads: AtomicUsize::new(0),
        }
    }

    /// Unresolved cell that loads on first access.
    pub fn lazy(key: ReferenceKey, loader: Arc<dyn ReferenceLoader>, owner: Option<String>) -> Self {
        Self::unresolved(key, Some(loader), owner, true)
    }

    /// Cell that loads immediately.
    pub fn eager(
        key: ReferenceKey,
        loader: Arc<dyn ReferenceLoader>,
        owner: Option<String>,
    ) -> Self {
        let cell = Self::unresolved(key, Some(loader), owner, false);
        cell.resolution();
        cell
    }

    /// Cell fixed to an outcome decided elsewhere.
    pub fn settled(key: ReferenceKey, resolution: Resolution, owner: Option<String>) -> Self {
        let cell = Self::unresolved(key, None, owner, false);
        let _ = cell.resolution.set(resolution);
        cell
    }

    fn unresolved(
        key: ReferenceKey,
        loader: Option<Arc<dyn ReferenceLoader>>,
        owner: Option<String>,
        lazy: bool,
    ) -> Self {
        Self {
            target_type: key.type_path,
            id: RwLock::new(Some(key.id)),
            collection: key.collection,
            owner,
            lazy,
            loader,
            resolution: OnceLock::new(),
            loads: AtomicUsize::new(0),
        }
    }

    pub fn target_type(&self) -> &str {
        &self.target_type
    }

    pub fn id(&self) -> Option<IdValue> {
        self.id.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Record the id assigned when the target was stored.
    pub fn assign_id(&self, id: IdValue) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = Some(id);
    }

    /// Forget an id that was recorded for a store that did not happen.
    pub fn clear_id(&self) {
        *self.id.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn collection(&self) -> Option<&str> {
        self.collection.as_deref()
    }

    pub fn owner(&self) -> Option<&str> {
        self.owner.as_deref()
    }

    pub fn is_lazy(&self) -> bool {
        self.lazy
    }

    pub fn is_resolved(&self) -> bool {
        self.resolution.get().is_some()
    }

    /// Number of times the loader ran. Never exceeds one.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn key(&self) -> Option<ReferenceKey> {
        self.id().map(|id| ReferenceKey {
            type_path: self.target_type.clone(),
            id,
            collection: self.collection.clone(),
        })
    }

    /// Current target without triggering a load.
    pub fn peek(&self) -> Option<SharedModel> {
        self.resolution.get().and_then(Resolution::target).cloned()
    }

    /// Resolve the cell, loading it if this is the first access.
    pub fn resolution(&self) -> &Resolution {
        self.resolution.get_or_init(|| self.load())
    }

    /// Target after resolution. `Ok(None)` when missing or vetoed.
    pub fn resolve(&self) -> Result<Option<SharedModel>, ReferenceError> {
        match self.resolution() {
            Resolution::Found(shared) => Ok(Some(Arc::clone(shared))),
            Resolution::Missing | Resolution::Vetoed => Ok(None),
            Resolution::Failed(e) => Err(e.clone()),
        }
    }

    fn load(&self) -> Resolution {
        let (Some(loader), Some(key)) = (&self.loader, self.key()) else {
            return Resolution::Missing;
        };
        self.loads.fetch_add(1, Ordering::SeqCst);
        debug!(reference = %key, lazy = self.lazy, "loading reference");
        match loader.load(&key, self.owner.as_deref()) {
            Ok(Loaded::Found(target)) => Resolution::Found(Arc::new(RwLock::new(target))),
            Ok(Loaded::Missing) => Resolution::Missing,
            Ok(Loaded::Vetoed) => Resolution::Vetoed,
            Err(e) => Resolution::Failed(e),
        }
    }
}

impl fmt::Debug for ReferenceCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReferenceCell")
            .field("target_type", &self.target_type)
            .field("id", &self.id())
            .field("lazy", &self.lazy)
            .field("resolution", &self.resolution.get())
            .finish()
    }
}

/// Typed handle over a [`ReferenceCell`].
pub struct Reference<T: Model> {
    cell: Arc<ReferenceCell>,
    _target: PhantomData<fn() -> T>,
}

impl<T: Model> Reference<T> {
    /// Reference to an in-memory, not yet stored target.
    pub fn new(target: T) -> Self {
        Self::from_cell(Arc::new(ReferenceCell::from_model(Box::new(target))))
    }

    pub fn from_cell(cell: Arc<ReferenceCell>) -> Self {
        Self {
            cell,
            _target: PhantomData,
        }
    }

    pub fn cell(&self) -> &Arc<ReferenceCell> {
        &self.cell
    }

    pub fn id(&self) -> Option<IdValue> {
        self.cell.id()
    }

    pub fn is_resolved(&self) -> bool {
        self.cell.is_resolved()
    }

    /// Copy of the target. Loads on first access.
    pub fn get(&self) -> Result<Option<T>, ReferenceError> {
        self.with(T::clone)
    }

    /// Run `f` against the target. Loads on first access.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> Result<Option<R>, ReferenceError> {
        let Some(shared) = self.cell.resolve()? else {
            return Ok(None);
        };
        let guard = shared.read().map_err(|_| ReferenceError::Poisoned)?;
        match guard.downcast_ref::<T>() {
            Some(target) => Ok(Some(f(target))),
            None => Err(ReferenceError::TypeMismatch {
                expected: T::TYPE_PATH,
                found: guard.type_path().to_string(),
            }),
        }
    }

    /// Mutate the shared target. Every holder of the cell observes the
    /// change.
    pub fn with_mut<R>(&self, f: impl FnOnce(&mut T) -> R) -> Result<Option<R>, ReferenceError> {
        let Some(shared) = self.cell.resolve()? else {
            return Ok(None);
        };
        let mut guard = shared.write().map_err(|_| ReferenceError::Poisoned)?;
        let found = guard.type_path();
        match guard.downcast_mut::<T>() {
            Some(target) => Ok(Some(f(target))),
            None => Err(ReferenceError::TypeMismatch {
                expected: T::TYPE_PATH,
                found: found.to_string(),
            }),
        }
    }
}

impl<T: Model> Clone for Reference<T> {
    fn clone(&self) -> Self {
        Self::from_cell(Arc::clone(&self.cell))
    }
}

impl<T: Model> fmt::Debug for Reference<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reference")
            .field("target", &T::TYPE_PATH)
            .field("id", &self.cell.id())
            .field("resolved", &self.cell.is_resolved())
            .finish()
    }
}

impl<T: Model + PartialEq> PartialEq for Reference<T> {
    /// Equal when both ids are known and match, or when both targets are
    /// resolved and equal.
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.cell, &other.cell) {
            return true;
        }
        if let (Some(a), Some(b)) = (self.cell.id(), other.cell.id()) {
            return a.same_entity(&b);
        }
        match (self.cell.peek(), other.cell.peek()) {
            (Some(a), Some(b)) => {
                let (Ok(a), Ok(b)) = (a.read(), b.read()) else {
                    return false;
                };
                match (a.downcast_ref::<T>(), b.downcast_ref::<T>()) {
                    (Some(a), Some(b)) => a == b,
                    _ => false,
                }
            }
            _ => false,
        }
    }
}

impl<T: Model> Property for Reference<T> {
    fn to_field(&self) -> FieldValue {
        FieldValue::Reference(Arc::clone(&self.cell))
    }

    fn from_field(value: FieldValue) -> ModelResult<Self> {
        Arc::<ReferenceCell>::from_field(value).map(Self::from_cell)
    }
}
