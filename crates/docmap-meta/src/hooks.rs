//! Lifecycle hook dispatch over object graphs.

use std::collections::HashSet;
use std::sync::{Arc, TryLockError};

use docmap_model::{AnyModel, FieldValue, HookKind};
use tracing::debug;

use crate::error::{MetaError, MetaResult};
use crate::resolver::MetadataResolver;

impl MetadataResolver {
    /// Run the `kind` hooks of `instance`, then of every model reachable
    /// from it: embedded objects, collection elements and references that
    /// are already loaded. Unloaded references are not loaded.
    ///
    /// Shared reference targets are visited once per call, so reference
    /// cycles terminate. A target whose lock is held elsewhere, for example
    /// by the `with_mut` call that triggered these hooks, is skipped.
    pub fn call_lifecycle_hook(&self, kind: HookKind, instance: &mut dyn AnyModel) -> MetaResult<()> {
        let mut visited = HashSet::new();
        self.hook_graph(kind, instance, &mut visited)
    }

    fn hook_graph(
        &self,
        kind: HookKind,
        instance: &mut dyn AnyModel,
        visited: &mut HashSet<usize>,
    ) -> MetaResult<()> {
        let descriptor = match self.descriptor_for(instance.type_path()) {
            Ok(descriptor) => descriptor,
            Err(MetaError::UnknownType(_)) => return Ok(()),
            Err(e) => return Err(e),
        };
        for hook in descriptor.hooks(kind) {
            hook.invoke(instance);
        }
        for field in descriptor.fields().iter().filter(|f| f.may_hold_models()) {
            let Some(value) = instance.field(field.name) else {
                continue;
            };
            let (value, changed) = self.hook_value(kind, value, visited)?;
            if changed {
                instance.set(field.name, value)?;
            }
        }
        Ok(())
    }

    /// Returns the value to write back and whether writing is needed.
    fn hook_value(
        &self,
        kind: HookKind,
        value: FieldValue,
        visited: &mut HashSet<usize>,
    ) -> MetaResult<(FieldValue, bool)> {
        match value {
            FieldValue::Object(mut object) => {
                self.hook_graph(kind, &mut *object, visited)?;
                Ok((FieldValue::Object(object), true))
            }
            FieldValue::List(items) => {
                let mut changed = false;
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    let (item, c) = self.hook_value(kind, item, visited)?;
                    changed |= c;
                    out.push(item);
                }
                Ok((FieldValue::List(out), changed))
            }
            FieldValue::Map(entries) => {
                let mut changed = false;
                let mut out = Vec::with_capacity(entries.len());
                for (key, item) in entries {
                    let (item, c) = self.hook_value(kind, item, visited)?;
                    changed |= c;
                    out.push((key, item));
                }
                Ok((FieldValue::Map(out), changed))
            }
            FieldValue::Reference(cell) => {
                if let Some(shared) = cell.peek() {
                    if visited.insert(Arc::as_ptr(&shared) as usize) {
                        match shared.try_write() {
                            Ok(mut target) => self.hook_graph(kind, &mut **target, visited)?,
                            Err(TryLockError::Poisoned(poisoned)) => {
                                self.hook_graph(kind, &mut **poisoned.into_inner(), visited)?
                            }
                            Err(TryLockError::WouldBlock) => {
                                debug!(
                                    kind = ?kind,
                                    target = cell.target_type(),
                                    "skipping locked reference target"
                                );
                            }
                        }
                    }
                }
                Ok((FieldValue::Reference(cell), false))
            }
            other => Ok((other, false)),
        }
    }
}
