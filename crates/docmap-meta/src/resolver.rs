use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, RwLock};

use docmap_model::{FieldSchema, Hook, HookKind, TypeSchema};
use docmap_types::ID_KEY;
use tracing::debug;

use crate::descriptor::{EntityTypeDescriptor, FieldDescriptor};
use crate::error::{MetaError, MetaResult};
use crate::naming::{same_identifier, snake_case};
use crate::registry::TypeRegistry;

type PairKey = (String, String);

/// Computes and caches type metadata.
///
/// Descriptors, storage names and field lookups are cached for the
/// lifetime of the resolver. Nothing is ever invalidated: a descriptor is
/// a pure function of the registered schemas.
pub struct MetadataResolver {
    registry: Arc<TypeRegistry>,
    descriptors: RwLock<HashMap<String, Arc<EntityTypeDescriptor>>>,
    storage_names: RwLock<HashMap<PairKey, String>>,
    field_lookups: RwLock<HashMap<PairKey, Option<usize>>>,
    computations: AtomicUsize,
}

impl MetadataResolver {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self {
            registry,
            descriptors: RwLock::new(HashMap::new()),
            storage_names: RwLock::new(HashMap::new()),
            field_lookups: RwLock::new(HashMap::new()),
            computations: AtomicUsize::new(0),
        }
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    /// Number of descriptor computations performed so far, including
    /// computations that lost an insert race.
    pub fn computations(&self) -> usize {
        self.computations.load(Ordering::SeqCst)
    }

    pub fn cached_descriptors(&self) -> usize {
        self.descriptors.read().expect("lock poisoned").len()
    }

    /// Merged descriptor for a registered type.
    pub fn descriptor_for(&self, type_path: &str) -> MetaResult<Arc<EntityTypeDescriptor>> {
        if let Some(hit) = self
            .descriptors
            .read()
            .expect("lock poisoned")
            .get(type_path)
        {
            return Ok(Arc::clone(hit));
        }

        let computed = Arc::new(self.compute(type_path)?);
        self.computations.fetch_add(1, Ordering::SeqCst);

        let mut cache = self.descriptors.write().expect("lock poisoned");
        let winner = cache.entry(type_path.to_string()).or_insert(computed);
        Ok(Arc::clone(winner))
    }

    /// Storage key for a logical field name.
    ///
    /// Declared fields use their descriptor's storage name. Other names get
    /// the type's naming rule applied.
    pub fn storage_name_for(&self, type_path: &str, logical: &str) -> MetaResult<String> {
        let key = (type_path.to_string(), logical.to_string());
        if let Some(hit) = self.storage_names.read().expect("lock poisoned").get(&key) {
            return Ok(hit.clone());
        }

        let descriptor = self.descriptor_for(type_path)?;
        let name = match descriptor.field(logical) {
            Some(field) => field.storage_name.clone(),
            None if descriptor.snake_case => snake_case(logical),
            None => logical.to_string(),
        };

        let mut cache = self.storage_names.write().expect("lock poisoned");
        Ok(cache.entry(key).or_insert(name).clone())
    }

    /// Field a document key maps to.
    ///
    /// Returns `Ok(None)` when nothing matches and the type has a catch-all
    /// map; the key then belongs in the catch-all.
    pub fn resolve_field(&self, type_path: &str, key: &str) -> MetaResult<Option<FieldDescriptor>> {
        let descriptor = self.descriptor_for(type_path)?;
        let cache_key = (type_path.to_string(), key.to_string());
        let cached = self
            .field_lookups
            .read()
            .expect("lock poisoned")
            .get(&cache_key)
            .copied();
        let index = match cached {
            Some(index) => index,
            None => {
                let found = lookup_field(&descriptor, key);
                if found.is_none() && descriptor.additional_data().is_none() {
                    return Err(MetaError::UnresolvedField {
                        type_path: type_path.to_string(),
                        key: key.to_string(),
                    });
                }
                let mut cache = self.field_lookups.write().expect("lock poisoned");
                *cache.entry(cache_key).or_insert(found)
            }
        };
        Ok(index.and_then(|i| descriptor.field_at(i)).cloned())
    }

    fn compute(&self, type_path: &str) -> MetaResult<EntityTypeDescriptor> {
        let chain = self.supertype_chain(type_path)?;
        let interfaces = self.interfaces_of(&chain);
        let interface_schemas: Vec<&TypeSchema> = interfaces
            .iter()
            .filter_map(|path| self.registry.schema(path))
            .collect();
        let declarations = || chain.iter().chain(interface_schemas.iter()).copied();

        let kind = declarations().find_map(|s| s.kind);
        let polymorphic = declarations().any(|s| s.polymorphic);
        let snake = declarations().any(|s| s.snake_case);
        let collection = chain.iter().find_map(|s| s.collection);

        let mut fields: Vec<FieldDescriptor> = Vec::new();
        let mut hooks: HashMap<HookKind, Vec<Hook>> = HashMap::new();
        for schema in chain.iter().rev() {
            for field in &schema.fields {
                let descriptor = describe_field(field, schema.type_path, snake);
                match fields
                    .iter()
                    .position(|f| f.storage_name == descriptor.storage_name)
                {
                    Some(shadowed) => fields[shadowed] = descriptor,
                    None => fields.push(descriptor),
                }
            }
            for (kind, hook) in &schema.hooks {
                hooks.entry(*kind).or_default().push(hook.clone());
            }
        }

        let ids: Vec<usize> = fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.flags.id)
            .map(|(i, _)| i)
            .collect();
        if ids.len() > 1 {
            return Err(MetaError::DuplicateId {
                type_path: type_path.to_string(),
                count: ids.len(),
            });
        }
        let resolved = chain[0].type_path;
        let descriptor = EntityTypeDescriptor {
            type_path: resolved,
            kind,
            polymorphic,
            snake_case: snake,
            collection,
            hierarchy: chain
                .iter()
                .map(|s| s.type_path)
                .chain(interfaces.iter().copied())
                .collect(),
            id_field: ids.first().copied(),
            additional_data: fields.iter().position(|f| f.flags.additional_data),
            fields,
            hooks,
        };
        if descriptor.is_entity() && descriptor.id_field.is_none() {
            return Err(MetaError::MissingId(type_path.to_string()));
        }

        debug!(
            type_path = resolved,
            fields = descriptor.fields.len(),
            polymorphic,
            "computed type descriptor"
        );
        Ok(descriptor)
    }

    /// The type's schema followed by its supertypes, nearest first.
    fn supertype_chain(&self, type_path: &str) -> MetaResult<Vec<&TypeSchema>> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut current = Some(type_path);
        while let Some(path) = current {
            if !seen.insert(path) {
                return Err(MetaError::HierarchyCycle(path.to_string()));
            }
            let schema = self
                .registry
                .schema(path)
                .ok_or_else(|| MetaError::UnknownType(path.to_string()))?;
            chain.push(schema);
            current = schema.extends;
        }
        Ok(chain)
    }

    /// Interfaces declared anywhere in the chain, transitively, in
    /// declaration order.
    fn interfaces_of(&self, chain: &[&TypeSchema]) -> Vec<&'static str> {
        let mut found: Vec<&'static str> = Vec::new();
        let mut pending: Vec<&'static str> = chain
            .iter()
            .flat_map(|s| s.implements.iter().copied())
            .collect();
        pending.reverse();
        while let Some(interface) = pending.pop() {
            if found.contains(&interface) {
                continue;
            }
            found.push(interface);
            if let Some(schema) = self.registry.schema(interface) {
                let mut inherited: Vec<&'static str> = schema
                    .extends
                    .into_iter()
                    .chain(schema.implements.iter().copied())
                    .collect();
                inherited.reverse();
                pending.extend(inherited);
            }
        }
        found
    }
}

fn describe_field(field: &FieldSchema, declaring_type: &'static str, snake: bool) -> FieldDescriptor {
    FieldDescriptor {
        name: field.name,
        storage_name: storage_name(field, snake),
        declaring_type,
        kind: field.kind.clone(),
        rename: field.rename,
        aliases: field.aliases.clone(),
        flags: field.flags,
    }
}

/// Explicit rename, then `_id` for the id field, then the (optionally
/// snake-cased) field name.
fn storage_name(field: &FieldSchema, snake: bool) -> String {
    if let Some(rename) = field.rename {
        return rename.to_string();
    }
    if field.flags.id {
        return ID_KEY.to_string();
    }
    if snake {
        snake_case(field.name)
    } else {
        field.name.to_string()
    }
}

fn lookup_field(descriptor: &EntityTypeDescriptor, key: &str) -> Option<usize> {
    let candidates = || {
        descriptor
            .fields
            .iter()
            .enumerate()
            .filter(|(_, f)| !f.flags.additional_data)
    };
    candidates()
        .find(|(_, f)| f.storage_name == key)
        .or_else(|| candidates().find(|(_, f)| f.rename == Some(key)))
        .or_else(|| candidates().find(|(_, f)| f.aliases.iter().any(|a| *a == key)))
        .or_else(|| {
            candidates().find(|(_, f)| {
                same_identifier(key, f.name) || same_identifier(key, &f.storage_name)
            })
        })
        .map(|(i, _)| i)
}
