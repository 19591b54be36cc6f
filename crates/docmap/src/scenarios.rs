//! End-to-end scenarios through the public facade.

use std::sync::{Arc, Barrier};
use std::thread;

use docmap_mapper::{MapperConfig, MappingError, ObjectMapper};
use docmap_model::{Model, Reference, ReferenceError};
use docmap_refs::{DereferenceGuard, DereferenceRequest};
use docmap_store::DocumentStore;
use docmap_types::{Document, Value};
use proptest::prelude::*;

use crate::datastore::Datastore;
use crate::testing::{
    datastore, datastore_on, mapper_on, registry, shared_store, Cat, Delivery, Dog, Enclosure,
    Feed, Keeper, ANIMAL,
};

// ---------------------------------------------------------------------------
// Polymorphism
// ---------------------------------------------------------------------------

#[test]
fn discriminator_selects_the_concrete_animal() {
    let (_store, datastore) = datastore();
    let doc = Document::from_iter([("class_name", "Cat"), ("name", "Tom")]);

    let animal = datastore.mapper().decode_dyn(ANIMAL, &doc).unwrap().unwrap();
    let cat = animal.downcast_ref::<Cat>().unwrap();
    assert_eq!(cat.name, "Tom");
    assert_eq!(cat.lives, 0);
    assert!(cat.friend.is_none());
}

#[test]
fn one_collection_holds_the_whole_hierarchy() {
    let (store, datastore) = datastore();
    let mut tom = Cat::named("Tom");
    let mut rex = Dog::named("Rex");
    let tom_id = datastore.save(&mut tom).unwrap();
    let rex_id = datastore.save(&mut rex).unwrap();

    let stored = store.documents("animals");
    assert_eq!(stored.len(), 2);
    let mut types: Vec<_> = stored.iter().filter_map(|d| d.get_str("class_name")).collect();
    types.sort();
    assert_eq!(types, ["zoo::Cat", "zoo::Dog"]);

    let cat = datastore.get_dyn(ANIMAL, &tom_id).unwrap().unwrap();
    assert_eq!(cat.type_path(), Cat::TYPE_PATH);
    let dog = datastore.get::<Dog>(rex_id).unwrap().unwrap();
    assert!(dog.good_boy);
    assert_eq!(dog.loads, 1);
}

#[test]
fn embedded_animals_keep_their_type() {
    let (store, datastore) = datastore();
    let mut sam = Keeper::named("Sam");
    sam.pets.push(Box::new(Cat::named("Tom")));
    sam.pets.push(Box::new(Dog::named("Rex")));
    let id = datastore.save(&mut sam).unwrap();

    let stored = store.documents("keeper");
    let pets = stored[0].get("pets").and_then(Value::as_list).unwrap();
    assert!(pets
        .iter()
        .filter_map(Value::as_document)
        .all(|pet| !pet.contains_key("_id") && pet.contains_key("class_name")));

    let loaded = datastore.get::<Keeper>(id).unwrap().unwrap();
    let kinds: Vec<_> = loaded.pets.iter().map(|pet| pet.type_path()).collect();
    assert_eq!(kinds, [Cat::TYPE_PATH, Dog::TYPE_PATH]);
    let tom = loaded.pets[0].downcast_ref::<Cat>().unwrap();
    assert_eq!(tom.loads, 1, "post-load hooks reach embedded objects");
}

// ---------------------------------------------------------------------------
// Auto-store
// ---------------------------------------------------------------------------

#[test]
fn new_feeds_are_stored_with_their_delivery() {
    let (store, datastore) = datastore();
    let mut delivery = Delivery {
        feeds: vec![Reference::new(Feed::new("Oats")), Reference::new(Feed::new("Hay"))],
        ..Delivery::default()
    };
    let id = datastore.save(&mut delivery).unwrap();
    assert_eq!(store.documents("feed").len(), 2);
    assert!(delivery.feeds.iter().all(|feed| feed.id().is_some()));

    let loaded = datastore.get::<Delivery>(id).unwrap().unwrap();
    let brands: Vec<_> = loaded
        .feeds
        .iter()
        .map(|feed| feed.get().unwrap().unwrap().brand)
        .collect();
    assert_eq!(brands, ["Oats", "Hay"]);

    let writes = store.store_count();
    datastore.save(&mut delivery).unwrap();
    assert_eq!(store.store_count(), writes + 1, "saved feeds are not stored again");
}

#[test]
fn strict_sessions_refuse_unsaved_feeds() {
    let store = shared_store();
    let datastore = Datastore::new(mapper_on(store, MapperConfig::strict()));
    let mut delivery = Delivery {
        feeds: vec![Reference::new(Feed::new("Oats"))],
        ..Delivery::default()
    };
    let err = datastore.save(&mut delivery).unwrap_err();
    assert!(
        matches!(err, crate::DatastoreError::Mapping(MappingError::UnsavedReference { .. })),
        "{err}"
    );
}

// ---------------------------------------------------------------------------
// References
// ---------------------------------------------------------------------------

fn stored_enclosure(datastore: &Datastore) -> Enclosure {
    let mut enclosure = Enclosure::default();
    for slot in [&mut enclosure.north, &mut enclosure.south, &mut enclosure.east] {
        let mut keeper = Keeper::named("Sam");
        datastore.save(&mut keeper).unwrap();
        *slot = Some(Reference::new(keeper));
    }
    let id = datastore.save(&mut enclosure).unwrap();
    datastore.get::<Enclosure>(id).unwrap().unwrap()
}

#[test]
fn lazy_references_load_once_across_threads() {
    let (store, datastore) = datastore();
    let enclosure = stored_enclosure(&datastore);
    let slots = [&enclosure.north, &enclosure.south, &enclosure.east];
    for slot in slots {
        let reference = slot.as_ref().unwrap();
        assert!(reference.cell().is_lazy());
        assert!(!reference.is_resolved());
    }
    let finds = store.find_count();

    thread::scope(|scope| {
        for slot in slots {
            for _ in 0..4 {
                scope.spawn(move || {
                    let keeper = slot.as_ref().unwrap().get().unwrap().unwrap();
                    assert_eq!(keeper.name, "Sam");
                });
            }
        }
    });

    for slot in slots {
        assert_eq!(slot.as_ref().unwrap().cell().load_count(), 1);
    }
    assert_eq!(store.find_count(), finds + 3);
}

#[test]
fn post_load_hooks_terminate_on_reference_cycles() {
    let (_store, datastore) = datastore();
    let mut kit = Cat::named("Kit");
    datastore.save(&mut kit).unwrap();
    let mut tom = Cat::named("Tom");
    tom.friend = Some(Reference::new(kit.clone()));
    let tom_id = datastore.save(&mut tom).unwrap();
    kit.friend = Some(Reference::new(tom.clone()));
    datastore.save(&mut kit).unwrap();

    let loaded = datastore.get::<Cat>(tom_id).unwrap().unwrap();
    assert_eq!(loaded.loads, 1);
    let friend = loaded.friend.as_ref().unwrap();
    assert!(friend.is_resolved());
    assert_eq!(friend.with(|kit| kit.loads).unwrap(), Some(1));

    let back = friend
        .with(|kit| kit.friend.clone())
        .unwrap()
        .flatten()
        .unwrap();
    assert_eq!(back.get().unwrap().unwrap().name, "Tom");
}

#[test]
fn vetoed_keepers_read_as_absent() {
    let store = shared_store();
    let guard: Arc<dyn DereferenceGuard> =
        Arc::new(|request: &DereferenceRequest<'_>| request.key.type_path != Keeper::TYPE_PATH);
    let mapper = ObjectMapper::builder()
        .registry(registry())
        .store(Arc::clone(&store) as Arc<dyn DocumentStore>)
        .guard(guard)
        .build();
    let datastore = Datastore::new(mapper);

    let mut sam = Keeper::named("Sam");
    datastore.save(&mut sam).unwrap();
    let mut tom = Cat::named("Tom");
    tom.keeper = Some(Reference::new(sam));
    let id = datastore.save(&mut tom).unwrap();

    let loaded = datastore.get::<Cat>(id).unwrap().unwrap();
    let finds = store.find_count();
    assert_eq!(loaded.keeper.as_ref().unwrap().get().unwrap().map(|k| k.name), None);
    assert_eq!(store.find_count(), finds);
}

#[test]
fn failed_loads_stay_inside_the_reference() {
    let (store, datastore) = datastore();
    let mut sam = Keeper::named("Sam");
    datastore.save(&mut sam).unwrap();
    let mut tom = Cat::named("Tom");
    tom.lives = 7;
    tom.keeper = Some(Reference::new(sam));
    let id = datastore.save(&mut tom).unwrap();

    let loaded = datastore.get::<Cat>(id).unwrap().unwrap();
    assert_eq!(loaded.lives, 7);

    store.set_offline(true);
    let keeper = loaded.keeper.as_ref().unwrap();
    let err = keeper.get().unwrap_err();
    assert!(matches!(err, ReferenceError::Load { .. }), "{err}");

    store.set_offline(false);
    assert!(keeper.get().is_err(), "a failed load is remembered");
    assert_eq!(keeper.cell().load_count(), 1);
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

#[test]
fn racing_threads_share_one_descriptor() {
    let mapper = mapper_on(shared_store(), MapperConfig::default());
    let barrier = Barrier::new(8);

    let descriptors: Vec<_> = thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    barrier.wait();
                    mapper.resolver().descriptor_for(Cat::TYPE_PATH).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert!(descriptors.iter().all(|d| Arc::ptr_eq(d, &descriptors[0])));
    let names: Vec<_> = descriptors[0].fields().iter().map(|f| f.name).collect();
    assert_eq!(names, ["id", "name", "loads", "lives", "friend", "keeper"]);
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

#[test]
fn configuration_controls_unknown_keys() {
    let doc = Document::from_iter([
        ("class_name", Value::from("zoo::Dog")),
        ("name", Value::from("Rex")),
        ("tail", Value::from("wagging")),
    ]);

    let strict = datastore_on(shared_store());
    let err = strict.mapper().decode::<Dog>(&doc).unwrap_err();
    assert!(matches!(err, MappingError::Lookup { ref key, .. } if key == "tail"), "{err}");

    let config: MapperConfig = serde_json::from_str(r#"{"strict_fields": false}"#).unwrap();
    let lenient = Datastore::new(mapper_on(shared_store(), config));
    let dog = lenient.mapper().decode::<Dog>(&doc).unwrap().unwrap();
    assert_eq!(dog.name, "Rex");
}

// ---------------------------------------------------------------------------
// Properties
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn saved_cats_load_and_encode_identically(name in "[A-Za-z]{1,12}", lives in 0..10i32) {
        let (_store, datastore) = datastore();
        let mut cat = Cat::named(&name);
        cat.lives = lives;
        let id = datastore.save(&mut cat).unwrap();

        let loaded = datastore.get::<Cat>(id).unwrap().unwrap();
        prop_assert_eq!(&loaded.name, &name);
        prop_assert_eq!(loaded.lives, lives);
        prop_assert_eq!(loaded.id, cat.id);

        let mapper = datastore.mapper();
        prop_assert_eq!(mapper.encode(&loaded).unwrap(), mapper.encode(&cat).unwrap());
    }
}
