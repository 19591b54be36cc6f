use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use docmap_model::{
    decode_opaque, AnyModel, EnumModel, Model, Opaque, OpaqueDecodeFn, TypeSchema,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::error::{MetaError, MetaResult};
use crate::naming::short_name;

type Factory = Arc<dyn Fn() -> Box<dyn AnyModel> + Send + Sync>;

/// A registered model type.
#[derive(Clone)]
pub struct ModelRegistration {
    schema: TypeSchema,
    factory: Option<Factory>,
}

impl ModelRegistration {
    pub fn schema(&self) -> &TypeSchema {
        &self.schema
    }

    /// `false` for abstract, schema-only registrations.
    pub fn is_instantiable(&self) -> bool {
        self.factory.is_some()
    }

    /// Blank instance, ready to have its fields populated.
    pub fn instantiate(&self) -> Option<Box<dyn AnyModel>> {
        self.factory.as_ref().map(|f| f())
    }
}

impl fmt::Debug for ModelRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModelRegistration")
            .field("type_path", &self.schema.type_path)
            .field("instantiable", &self.is_instantiable())
            .finish()
    }
}

/// A registered enum type.
#[derive(Clone, Debug)]
pub struct EnumRegistration {
    pub type_path: &'static str,
    pub variants: &'static [&'static str],
}

impl EnumRegistration {
    pub fn has_variant(&self, name: &str) -> bool {
        self.variants.iter().any(|v| *v == name)
    }
}

/// A registered binary-fallback type.
#[derive(Clone, Copy)]
pub struct OpaqueRegistration {
    pub type_path: &'static str,
    pub decode: OpaqueDecodeFn,
}

impl fmt::Debug for OpaqueRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("OpaqueRegistration")
            .field(&self.type_path)
            .finish()
    }
}

/// Every type the mapper knows about.
///
/// Types are keyed by full type path. A short name (the last path segment)
/// also resolves, unless two registered types share it; such names are
/// kept in an ambiguity set and must be spelled out in full.
#[derive(Default)]
pub struct TypeRegistry {
    models: HashMap<&'static str, ModelRegistration>,
    enums: HashMap<&'static str, EnumRegistration>,
    opaques: HashMap<&'static str, OpaqueRegistration>,
    short_names: HashMap<&'static str, &'static str>,
    ambiguous_names: HashSet<&'static str>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model constructed through `Default`.
    pub fn register<T: Model + Default>(&mut self) -> &mut Self {
        self.register_with(T::default)
    }

    /// Register a model with a user-supplied blank factory, for types that
    /// have no sensible `Default`.
    pub fn register_with<T: Model>(
        &mut self,
        blank: impl Fn() -> T + Send + Sync + 'static,
    ) -> &mut Self {
        let factory: Factory = Arc::new(move || Box::new(blank()) as Box<dyn AnyModel>);
        self.insert_model(ModelRegistration {
            schema: T::schema(),
            factory: Some(factory),
        })
    }

    /// Register a schema with no instances of its own: an abstract
    /// supertype or an interface.
    pub fn register_abstract(&mut self, schema: TypeSchema) -> &mut Self {
        self.insert_model(ModelRegistration {
            schema,
            factory: None,
        })
    }

    pub fn register_enum<E: EnumModel>(&mut self) -> &mut Self {
        self.index_name(E::TYPE_PATH);
        self.enums.insert(
            E::TYPE_PATH,
            EnumRegistration {
                type_path: E::TYPE_PATH,
                variants: E::VARIANTS,
            },
        );
        self
    }

    /// Register `Opaque<T>` for the binary fallback.
    pub fn register_opaque<T>(&mut self) -> &mut Self
    where
        T: Serialize + DeserializeOwned + Clone + fmt::Debug + Send + Sync + 'static,
    {
        let type_path = Opaque::<T>::type_name();
        self.index_name(type_path);
        self.opaques.insert(
            type_path,
            OpaqueRegistration {
                type_path,
                decode: decode_opaque::<T>,
            },
        );
        self
    }

    fn insert_model(&mut self, registration: ModelRegistration) -> &mut Self {
        let type_path = registration.schema.type_path;
        debug!(
            type_path,
            instantiable = registration.is_instantiable(),
            "registering model type"
        );
        self.index_name(type_path);
        self.models.insert(type_path, registration);
        self
    }

    fn index_name(&mut self, type_path: &'static str) {
        if self.contains(type_path) {
            return;
        }
        let name = short_name(type_path);
        if self.ambiguous_names.contains(name) {
            return;
        }
        match self.short_names.get(name).copied() {
            Some(existing) if existing != type_path => {
                self.short_names.remove(name);
                self.ambiguous_names.insert(name);
            }
            _ => {
                self.short_names.insert(name, type_path);
            }
        }
    }

    pub fn contains(&self, type_path: &str) -> bool {
        self.models.contains_key(type_path)
            || self.enums.contains_key(type_path)
            || self.opaques.contains_key(type_path)
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous_names.contains(name)
    }

    /// Full type path for a discriminator value: either a full path or an
    /// unambiguous short name.
    pub fn resolve_name(&self, name: &str) -> MetaResult<&'static str> {
        if let Some((path, _)) = self.models.get_key_value(name) {
            return Ok(*path);
        }
        if let Some((path, _)) = self.enums.get_key_value(name) {
            return Ok(*path);
        }
        if let Some((path, _)) = self.opaques.get_key_value(name) {
            return Ok(*path);
        }
        if self.ambiguous_names.contains(name) {
            return Err(MetaError::AmbiguousName(name.to_string()));
        }
        self.short_names
            .get(name)
            .copied()
            .ok_or_else(|| MetaError::UnknownType(name.to_string()))
    }

    pub fn model(&self, type_path: &str) -> Option<&ModelRegistration> {
        self.models.get(type_path)
    }

    pub fn schema(&self, type_path: &str) -> Option<&TypeSchema> {
        self.models.get(type_path).map(ModelRegistration::schema)
    }

    pub fn enum_type(&self, type_path: &str) -> Option<&EnumRegistration> {
        self.enums.get(type_path)
    }

    pub fn opaque_type(&self, type_path: &str) -> Option<&OpaqueRegistration> {
        self.opaques.get(type_path)
    }

    /// Blank instance of a registered model.
    pub fn instantiate(&self, type_path: &str) -> MetaResult<Box<dyn AnyModel>> {
        let registration = self
            .models
            .get(type_path)
            .ok_or_else(|| MetaError::UnknownType(type_path.to_string()))?;
        registration
            .instantiate()
            .ok_or_else(|| MetaError::NotInstantiable(type_path.to_string()))
    }

    /// Whether `sub` equals `sup` or reaches it through `extends` and
    /// `implements` declarations.
    pub fn is_subtype(&self, sub: &str, sup: &str) -> bool {
        let mut pending = vec![sub];
        let mut seen = HashSet::new();
        while let Some(current) = pending.pop() {
            if current == sup {
                return true;
            }
            if !seen.insert(current) {
                continue;
            }
            if let Some(schema) = self.schema(current) {
                pending.extend(schema.extends);
                pending.extend(schema.implements.iter().copied());
            }
        }
        false
    }

    pub fn len(&self) -> usize {
        self.models.len() + self.enums.len() + self.opaques.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut models: Vec<_> = self.models.keys().collect();
        models.sort();
        f.debug_struct("TypeRegistry")
            .field("models", &models)
            .field("enums", &self.enums.len())
            .field("opaques", &self.opaques.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{self, Cat, Color, Keeper};

    #[test]
    fn full_and_short_names_resolve() {
        let registry = testing::registry();
        assert_eq!(registry.resolve_name("zoo::Cat").unwrap(), "zoo::Cat");
        assert_eq!(registry.resolve_name("Cat").unwrap(), "zoo::Cat");
        assert_eq!(registry.resolve_name("Color").unwrap(), "zoo::Color");
        assert!(matches!(
            registry.resolve_name("Unicorn"),
            Err(MetaError::UnknownType(_))
        ));
    }

    #[test]
    fn colliding_short_names_become_ambiguous() {
        let mut registry = testing::registry();
        registry.register_abstract(TypeSchema::embedded("farm::Cat"));
        assert!(registry.is_ambiguous("Cat"));
        assert!(matches!(
            registry.resolve_name("Cat"),
            Err(MetaError::AmbiguousName(_))
        ));
        assert_eq!(registry.resolve_name("farm::Cat").unwrap(), "farm::Cat");
        assert_eq!(registry.resolve_name("zoo::Cat").unwrap(), "zoo::Cat");
    }

    #[test]
    fn re_registering_keeps_short_name() {
        let mut registry = testing::registry();
        registry.register::<Cat>();
        assert!(!registry.is_ambiguous("Cat"));
        assert_eq!(registry.resolve_name("Cat").unwrap(), "zoo::Cat");
    }

    #[test]
    fn abstract_types_are_not_instantiable() {
        let registry = testing::registry();
        assert!(registry.instantiate("zoo::Cat").is_ok());
        assert!(matches!(
            registry.instantiate("zoo::Animal"),
            Err(MetaError::NotInstantiable(_))
        ));
        assert!(matches!(
            registry.instantiate("zoo::Missing"),
            Err(MetaError::UnknownType(_))
        ));
    }

    #[test]
    fn blank_factory_is_used() {
        let mut registry = TypeRegistry::new();
        registry.register_with(|| Keeper::blank("temp"));
        let keeper = registry.instantiate(Keeper::TYPE_PATH).unwrap();
        assert_eq!(keeper.downcast_ref::<Keeper>().unwrap().first_name, "temp");
    }

    #[test]
    fn subtype_walk_covers_interfaces() {
        let registry = testing::registry();
        assert!(registry.is_subtype("zoo::Cat", "zoo::Animal"));
        assert!(registry.is_subtype("zoo::Cat", "zoo::Pet"));
        assert!(registry.is_subtype("zoo::Cat", "zoo::Cat"));
        assert!(!registry.is_subtype("zoo::Animal", "zoo::Cat"));
    }

    #[test]
    fn enums_and_opaques_are_registered() {
        let registry = testing::registry();
        let colors = registry.enum_type(Color::TYPE_PATH).unwrap();
        assert!(colors.has_variant("Tabby"));
        assert!(!colors.has_variant("Plaid"));
        assert!(registry
            .opaque_type(Opaque::<testing::Chip>::type_name())
            .is_some());
    }
}
