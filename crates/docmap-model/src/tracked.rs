use std::collections::BTreeSet;
use std::ops::Deref;

use crate::error::ModelResult;
use crate::model::{FieldValue, Model};
use crate::property::Property;

/// A model that records which fields were mutated.
///
/// Mutations go through [`set`](Self::set) or [`modify`](Self::modify);
/// reads go through `Deref`. The encoder uses the recorded names to build
/// partial update documents.
#[derive(Clone, Debug)]
pub struct ChangeTracked<T> {
    value: T,
    changed: BTreeSet<String>,
}

impl<T: Model> ChangeTracked<T> {
    pub fn new(value: T) -> Self {
        Self {
            value,
            changed: BTreeSet::new(),
        }
    }

    /// Set a field by name and record it.
    pub fn set<P: Property>(&mut self, field: &str, value: P) -> ModelResult<()> {
        self.set_value(field, value.to_field())
    }

    pub fn set_value(&mut self, field: &str, value: FieldValue) -> ModelResult<()> {
        self.value.set_field(field, value)?;
        self.changed.insert(field.to_string());
        Ok(())
    }

    /// Mutate through a closure, recording `field` as changed.
    pub fn modify<R>(&mut self, field: &str, f: impl FnOnce(&mut T) -> R) -> R {
        self.changed.insert(field.to_string());
        f(&mut self.value)
    }

    /// Record `field` as changed without touching the value.
    pub fn mark_changed(&mut self, field: &str) {
        self.changed.insert(field.to_string());
    }

    pub fn is_dirty(&self) -> bool {
        !self.changed.is_empty()
    }

    pub fn is_changed(&self, field: &str) -> bool {
        self.changed.contains(field)
    }

    /// Changed field names in sorted order.
    pub fn changed_fields(&self) -> impl Iterator<Item = &str> {
        self.changed.iter().map(String::as_str)
    }

    /// Mutable access that records nothing. Used for lifecycle hooks and
    /// id write-back, which must not show up as user changes.
    pub fn untracked_mut(&mut self) -> &mut T {
        &mut self.value
    }

    /// Forget recorded changes, typically after a successful update.
    pub fn clear(&mut self) {
        self.changed.clear();
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T> Deref for ChangeTracked<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.value
    }
}
