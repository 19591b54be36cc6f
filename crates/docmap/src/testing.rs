//! Zoo fixtures for the datastore tests and scenarios.

use std::sync::Arc;

use docmap_mapper::{MapperConfig, ObjectMapper};
use docmap_meta::TypeRegistry;
use docmap_model::{
    model_fields, AnyModel, FieldKind, FieldSchema, Hook, HookKind, Model, Property, Reference,
    ScalarKind, TypeSchema,
};
use docmap_store::{DocumentStore, InMemoryDocumentStore};
use docmap_types::EntityId;

use crate::datastore::Datastore;

pub const ANIMAL: &str = "zoo::Animal";

fn string() -> FieldKind {
    FieldKind::Scalar(ScalarKind::String)
}

fn count_load(model: &mut dyn AnyModel) {
    let loads = model
        .field("loads")
        .and_then(|v| i32::from_field(v).ok())
        .unwrap_or_default();
    let _ = model.set("loads", (loads + 1).to_field());
}

pub fn animal_schema() -> TypeSchema {
    TypeSchema::entity(ANIMAL)
        .polymorphic()
        .collection("animals")
        .field(FieldSchema::id("id"))
        .field(FieldSchema::new("name", string()))
        .field(FieldSchema::new("loads", FieldKind::Scalar(ScalarKind::I32)).transient())
        .hook(HookKind::PostLoad, Hook::dynamic("count_load", count_load))
}

// ---------------------------------------------------------------------------
// Animals
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default)]
pub struct Cat {
    pub id: Option<EntityId>,
    pub name: String,
    pub loads: i32,
    pub lives: i32,
    pub friend: Option<Reference<Cat>>,
    pub keeper: Option<Reference<Keeper>>,
}

impl Cat {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Model for Cat {
    const TYPE_PATH: &'static str = "zoo::Cat";

    fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE_PATH)
            .extends(ANIMAL)
            .field(FieldSchema::new("lives", FieldKind::Scalar(ScalarKind::I32)))
            .field(FieldSchema::new("friend", FieldKind::Reference(Self::TYPE_PATH)))
            .field(FieldSchema::new("keeper", FieldKind::Reference(Keeper::TYPE_PATH)).lazy())
    }

    model_fields!(id, name, loads, lives, friend, keeper);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Dog {
    pub id: Option<EntityId>,
    pub name: String,
    pub loads: i32,
    pub good_boy: bool,
}

impl Dog {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            good_boy: true,
            ..Self::default()
        }
    }
}

impl Model for Dog {
    const TYPE_PATH: &'static str = "zoo::Dog";

    fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE_PATH)
            .extends(ANIMAL)
            .field(FieldSchema::new("good_boy", FieldKind::Scalar(ScalarKind::Bool)))
    }

    model_fields!(id, name, loads, good_boy);
}

// ---------------------------------------------------------------------------
// Staff
// ---------------------------------------------------------------------------

fn note(keeper: &mut Keeper, step: &str) {
    keeper.journal.push(step.to_string());
}

fn stamp_update(keeper: &mut Keeper) {
    note(keeper, "pre_update");
    keeper.revision += 1;
}

/// Keeper with embedded pets and a journal of the hooks it went through.
#[derive(Clone, Debug, Default)]
pub struct Keeper {
    pub id: Option<EntityId>,
    pub name: String,
    pub pets: Vec<Box<dyn AnyModel>>,
    pub revision: i64,
    pub journal: Vec<String>,
}

impl Keeper {
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }
}

impl Model for Keeper {
    const TYPE_PATH: &'static str = "zoo::Keeper";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("name", string()))
            .field(FieldSchema::new("pets", FieldKind::list(FieldKind::Model(ANIMAL))))
            .field(FieldSchema::new("revision", FieldKind::Scalar(ScalarKind::I64)))
            .field(FieldSchema::new("journal", FieldKind::list(string())).transient())
            .hook(HookKind::PreUpdate, Hook::new::<Keeper>("stamp_update", stamp_update))
            .hook(HookKind::PostUpdate, Hook::new::<Keeper>("post_update", |k| note(k, "post_update")))
            .hook(HookKind::PreRemove, Hook::new::<Keeper>("pre_remove", |k| note(k, "pre_remove")))
            .hook(HookKind::PostRemove, Hook::new::<Keeper>("post_remove", |k| note(k, "post_remove")))
    }

    model_fields!(id, name, pets, revision, journal);
}

/// Entity with several lazy references to keepers.
#[derive(Clone, Debug, Default)]
pub struct Enclosure {
    pub id: Option<EntityId>,
    pub north: Option<Reference<Keeper>>,
    pub south: Option<Reference<Keeper>>,
    pub east: Option<Reference<Keeper>>,
}

impl Model for Enclosure {
    const TYPE_PATH: &'static str = "zoo::Enclosure";

    fn schema() -> TypeSchema {
        let keeper = || FieldKind::Reference(Keeper::TYPE_PATH);
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("north", keeper()).lazy())
            .field(FieldSchema::new("south", keeper()).lazy())
            .field(FieldSchema::new("east", keeper()).lazy())
    }

    model_fields!(id, north, south, east);
}

// ---------------------------------------------------------------------------
// Supplies
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Feed {
    pub id: Option<EntityId>,
    pub brand: String,
}

impl Feed {
    pub fn new(brand: &str) -> Self {
        Self {
            id: None,
            brand: brand.to_string(),
        }
    }
}

impl Model for Feed {
    const TYPE_PATH: &'static str = "zoo::Feed";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("brand", string()))
    }

    model_fields!(id, brand);
}

/// Delivery whose feeds are stored along with it.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Delivery {
    pub id: Option<EntityId>,
    pub feeds: Vec<Reference<Feed>>,
    pub note: Option<String>,
}

impl Model for Delivery {
    const TYPE_PATH: &'static str = "zoo::Delivery";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(
                FieldSchema::new("feeds", FieldKind::list(FieldKind::Reference(Feed::TYPE_PATH)))
                    .auto_store(),
            )
            .field(FieldSchema::new("note", string()))
    }

    model_fields!(id, feeds, note);
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_abstract(animal_schema())
        .register::<Cat>()
        .register::<Dog>()
        .register::<Keeper>()
        .register::<Enclosure>()
        .register::<Feed>()
        .register::<Delivery>();
    registry
}

pub fn shared_store() -> Arc<InMemoryDocumentStore> {
    Arc::new(InMemoryDocumentStore::new())
}

pub fn mapper_on(store: Arc<InMemoryDocumentStore>, config: MapperConfig) -> Arc<ObjectMapper> {
    let store: Arc<dyn DocumentStore> = store;
    ObjectMapper::builder()
        .registry(registry())
        .store(store)
        .config(config)
        .build()
}

pub fn datastore_on(store: Arc<InMemoryDocumentStore>) -> Datastore {
    Datastore::new(mapper_on(store, MapperConfig::default()))
}

/// A fresh session and the store behind it.
pub fn datastore() -> (Arc<InMemoryDocumentStore>, Datastore) {
    let store = shared_store();
    (Arc::clone(&store), datastore_on(store))
}
