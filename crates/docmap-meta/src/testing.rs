//! Fixture types shared by the tests of this crate.

use std::collections::BTreeMap;
use std::sync::Arc;

use docmap_model::{
    enum_property, model_fields, model_property, AnyModel, EnumModel, FieldKind, FieldSchema,
    FieldValue, Hook, HookKind, Model, ModelError, ModelResult, Property, Reference, ScalarKind,
    TypeSchema,
};
use docmap_types::EntityId;
use serde::{Deserialize, Serialize};

use crate::registry::TypeRegistry;
use crate::resolver::MetadataResolver;

pub const PET: &str = "zoo::Pet";
pub const ANIMAL: &str = "zoo::Animal";

fn push_trail(model: &mut dyn AnyModel, step: &str) {
    let mut trail = model
        .field("trail")
        .and_then(|v| Vec::<String>::from_field(v).ok())
        .unwrap_or_default();
    trail.push(step.to_string());
    let _ = model.set("trail", trail.to_field());
}

fn record_animal(model: &mut dyn AnyModel) {
    push_trail(model, "animal");
}

fn record_cat(cat: &mut Cat) {
    cat.trail.push("cat".to_string());
}

pub fn animal_schema() -> TypeSchema {
    TypeSchema::entity(ANIMAL)
        .implements(PET)
        .field(FieldSchema::id("id"))
        .field(FieldSchema::new("name", FieldKind::Scalar(ScalarKind::String)).alias("title"))
        .field(
            FieldSchema::new("trail", FieldKind::list(FieldKind::Scalar(ScalarKind::String)))
                .transient(),
        )
        .hook(HookKind::PostLoad, Hook::dynamic("record_animal", record_animal))
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Color {
    #[default]
    Tabby,
    Black,
}

impl EnumModel for Color {
    const TYPE_PATH: &'static str = "zoo::Color";
    const VARIANTS: &'static [&'static str] = &["Tabby", "Black"];

    fn variant_name(&self) -> &'static str {
        match self {
            Color::Tabby => "Tabby",
            Color::Black => "Black",
        }
    }

    fn from_variant_name(name: &str) -> Option<Self> {
        match name {
            "Tabby" => Some(Color::Tabby),
            "Black" => Some(Color::Black),
            _ => None,
        }
    }
}

enum_property!(Color);

#[derive(Clone, Debug, Default)]
pub struct Cat {
    pub id: Option<EntityId>,
    pub name: String,
    pub trail: Vec<String>,
    pub lives: i32,
    pub color: Option<Color>,
    pub friend: Option<Reference<Cat>>,
}

impl Model for Cat {
    const TYPE_PATH: &'static str = "zoo::Cat";

    fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE_PATH)
            .extends(ANIMAL)
            .field(FieldSchema::new("name", FieldKind::Scalar(ScalarKind::String)).alias("nick"))
            .field(FieldSchema::new("lives", FieldKind::Scalar(ScalarKind::I32)))
            .field(FieldSchema::new("color", FieldKind::Enum(Color::TYPE_PATH)))
            .field(FieldSchema::new("friend", FieldKind::Reference(Self::TYPE_PATH)).lazy())
            .hook(HookKind::PostLoad, Hook::new::<Cat>("record_cat", record_cat))
    }

    model_fields!(id, name, trail, lives, color, friend);
}

model_property!(Cat);

/// Entity with snake-cased storage names and a catch-all map.
#[derive(Clone, Debug, Default)]
pub struct Keeper {
    pub key: String,
    pub first_name: String,
    pub badge: i64,
    pub extra: BTreeMap<String, FieldValue>,
    pub secret: String,
    pub cats: Vec<Cat>,
    pub favorite: Option<Box<dyn AnyModel>>,
}

impl Keeper {
    pub fn blank(first_name: &str) -> Self {
        Self {
            first_name: first_name.to_string(),
            ..Self::default()
        }
    }
}

impl Model for Keeper {
    const TYPE_PATH: &'static str = "zoo::Keeper";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .snake_case()
            .field(FieldSchema::id_text("key"))
            .field(FieldSchema::new("firstName", FieldKind::Scalar(ScalarKind::String)))
            .field(FieldSchema::new("badgeNumber", FieldKind::Scalar(ScalarKind::I64)).read_only())
            .field(FieldSchema::additional_data("extra"))
            .field(FieldSchema::new("secret", FieldKind::Scalar(ScalarKind::String)).transient())
            .field(FieldSchema::new("cats", FieldKind::list(FieldKind::Model(Cat::TYPE_PATH))))
            .field(FieldSchema::new("favorite", FieldKind::Model(ANIMAL)))
    }

    fn get_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "key" => Some(self.key.to_field()),
            "firstName" => Some(self.first_name.to_field()),
            "badgeNumber" => Some(self.badge.to_field()),
            "extra" => Some(self.extra.to_field()),
            "secret" => Some(self.secret.to_field()),
            "cats" => Some(self.cats.to_field()),
            "favorite" => Some(self.favorite.to_field()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> ModelResult<()> {
        match name {
            "key" => self.key = Property::from_field(value)?,
            "firstName" => self.first_name = Property::from_field(value)?,
            "badgeNumber" => self.badge = Property::from_field(value)?,
            "extra" => self.extra = Property::from_field(value)?,
            "secret" => self.secret = Property::from_field(value)?,
            "cats" => self.cats = Property::from_field(value)?,
            "favorite" => self.favorite = Property::from_field(value)?,
            _ => {
                return Err(ModelError::UnknownField {
                    type_path: Self::TYPE_PATH,
                    field: name.to_string(),
                })
            }
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Chip {
    pub serial: u64,
}

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register_abstract(TypeSchema::new(PET).polymorphic())
        .register_abstract(animal_schema())
        .register::<Cat>()
        .register::<Keeper>()
        .register_enum::<Color>()
        .register_opaque::<Chip>();
    registry
}

pub fn resolver() -> MetadataResolver {
    MetadataResolver::new(Arc::new(registry()))
}
