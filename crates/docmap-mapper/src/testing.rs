//! Fixture types shared by the tests of this crate.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::NaiveDate;
use docmap_meta::TypeRegistry;
use docmap_model::{
    enum_property, model_fields, model_property, AnyModel, EnumModel, FieldKind, FieldSchema,
    FieldValue, Hook, HookKind, Model, ModelError, ModelResult, Opaque, Property, Reference,
    ScalarKind, TypeSchema,
};
use docmap_store::{DocumentStore, InMemoryDocumentStore};
use docmap_types::EntityId;
use serde::{Deserialize, Serialize};

use crate::config::MapperConfig;
use crate::mapper::ObjectMapper;

pub const PRODUCT: &str = "shop::Product";

fn string() -> FieldKind {
    FieldKind::Scalar(ScalarKind::String)
}

// ---------------------------------------------------------------------------
// Orders
// ---------------------------------------------------------------------------

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Item {
    pub id: Option<EntityId>,
    pub sku: String,
}

impl Item {
    pub fn new(sku: &str) -> Self {
        Self {
            id: None,
            sku: sku.to_string(),
        }
    }
}

impl Model for Item {
    const TYPE_PATH: &'static str = "shop::Item";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("sku", string()))
    }

    model_fields!(id, sku);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Customer {
    pub id: Option<EntityId>,
    pub name: String,
    pub email: String,
    pub vip: bool,
    pub visits: i64,
}

impl Model for Customer {
    const TYPE_PATH: &'static str = "shop::Customer";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("name", string()))
            .field(FieldSchema::new("email", string()).alias("mail"))
            .field(FieldSchema::new("vip", FieldKind::Scalar(ScalarKind::Bool)))
            .field(FieldSchema::new("visits", FieldKind::Scalar(ScalarKind::I64)).read_only())
    }

    model_fields!(id, name, email, vip, visits);
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Line {
    pub sku: String,
    pub qty: i32,
}

impl Model for Line {
    const TYPE_PATH: &'static str = "shop::Line";

    fn schema() -> TypeSchema {
        TypeSchema::embedded(Self::TYPE_PATH)
            .field(FieldSchema::new("sku", string()))
            .field(FieldSchema::new("qty", FieldKind::Scalar(ScalarKind::I32)))
    }

    model_fields!(sku, qty);
}

model_property!(Line);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Open,
    Shipped,
}

impl EnumModel for Status {
    const TYPE_PATH: &'static str = "shop::Status";
    const VARIANTS: &'static [&'static str] = &["Open", "Shipped"];

    fn variant_name(&self) -> &'static str {
        match self {
            Status::Open => "Open",
            Status::Shipped => "Shipped",
        }
    }

    fn from_variant_name(name: &str) -> Option<Self> {
        match name {
            "Open" => Some(Status::Open),
            "Shipped" => Some(Status::Shipped),
            _ => None,
        }
    }
}

enum_property!(Status);

fn stamp_pre_store(order: &mut Order) {
    order.audit.push("pre_store".to_string());
}

fn stamp_post_store(order: &mut Order) {
    order.audit.push("post_store".to_string());
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Order {
    pub id: Option<EntityId>,
    pub number: i64,
    pub items: Vec<Reference<Item>>,
    pub buyer: Option<Reference<Customer>>,
    pub note: Option<String>,
    pub total: f64,
    pub placed: Option<NaiveDate>,
    pub status: Status,
    pub lines: Vec<Line>,
    pub tags: Vec<String>,
    pub audit: Vec<String>,
}

impl Model for Order {
    const TYPE_PATH: &'static str = "shop::Order";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .collection("orders")
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("number", FieldKind::Scalar(ScalarKind::I64)).alias("no"))
            .field(
                FieldSchema::new("items", FieldKind::list(FieldKind::Reference(Item::TYPE_PATH)))
                    .auto_store(),
            )
            .field(FieldSchema::new("buyer", FieldKind::Reference(Customer::TYPE_PATH)).lazy())
            .field(FieldSchema::new("note", string()).use_if_null())
            .field(FieldSchema::new("total", FieldKind::Scalar(ScalarKind::F64)))
            .field(FieldSchema::new("placed", FieldKind::Scalar(ScalarKind::Date)))
            .field(FieldSchema::new("status", FieldKind::Enum(Status::TYPE_PATH)))
            .field(FieldSchema::new("lines", FieldKind::list(FieldKind::Model(Line::TYPE_PATH))))
            .field(FieldSchema::new("tags", FieldKind::Array(ScalarKind::String)))
            .field(FieldSchema::new("audit", FieldKind::list(string())).transient())
            .hook(HookKind::PreStore, Hook::new::<Order>("stamp_pre_store", stamp_pre_store))
            .hook(HookKind::PostStore, Hook::new::<Order>("stamp_post_store", stamp_post_store))
    }

    model_fields!(id, number, items, buyer, note, total, placed, status, lines, tags, audit);
}

// ---------------------------------------------------------------------------
// Products
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Format {
    #[default]
    Paper,
    Ebook,
}

impl EnumModel for Format {
    const TYPE_PATH: &'static str = "shop::Format";
    const VARIANTS: &'static [&'static str] = &["Paper", "Ebook"];

    fn variant_name(&self) -> &'static str {
        match self {
            Format::Paper => "Paper",
            Format::Ebook => "Ebook",
        }
    }

    fn from_variant_name(name: &str) -> Option<Self> {
        match name {
            "Paper" => Some(Format::Paper),
            "Ebook" => Some(Format::Ebook),
            _ => None,
        }
    }
}

enum_property!(Format);

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Barcode {
    pub digits: String,
}

pub fn product_schema() -> TypeSchema {
    TypeSchema::entity(PRODUCT)
        .polymorphic()
        .collection("products")
        .field(FieldSchema::id("id"))
        .field(FieldSchema::new("title", string()))
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Book {
    pub id: Option<EntityId>,
    pub title: String,
    pub author: String,
    pub format: Format,
}

impl Book {
    pub fn new(title: &str, author: &str) -> Self {
        Self {
            title: title.to_string(),
            author: author.to_string(),
            ..Self::default()
        }
    }
}

impl Model for Book {
    const TYPE_PATH: &'static str = "shop::Book";

    fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE_PATH)
            .extends(PRODUCT)
            .field(FieldSchema::new("author", string()))
            .field(FieldSchema::new("format", FieldKind::Enum(Format::TYPE_PATH)))
    }

    model_fields!(id, title, author, format);
}

model_property!(Book);

#[derive(Clone, Debug, Default, PartialEq)]
pub struct Gadget {
    pub id: Option<EntityId>,
    pub title: String,
    pub watts: i32,
    pub sizes: Vec<i32>,
    pub barcode: Option<Opaque<Barcode>>,
}

impl Model for Gadget {
    const TYPE_PATH: &'static str = "shop::Gadget";

    fn schema() -> TypeSchema {
        TypeSchema::new(Self::TYPE_PATH)
            .extends(PRODUCT)
            .field(FieldSchema::new("watts", FieldKind::Scalar(ScalarKind::I32)))
            .field(FieldSchema::new("sizes", FieldKind::Array(ScalarKind::I32)))
            .field(FieldSchema::new("barcode", FieldKind::Opaque(Opaque::<Barcode>::type_name())))
    }

    model_fields!(id, title, watts, sizes, barcode);
}

/// Entity with a text id, snake-cased storage names, a catch-all and
/// polymorphic embedded values.
#[derive(Clone, Debug, Default)]
pub struct Shelf {
    pub key: String,
    pub name: String,
    pub featured: Option<Box<dyn AnyModel>>,
    pub stock: BTreeMap<String, Box<dyn AnyModel>>,
    pub picks: Vec<Reference<Book>>,
    pub tag: Option<FieldValue>,
    pub extra: BTreeMap<String, FieldValue>,
}

impl Model for Shelf {
    const TYPE_PATH: &'static str = "shop::Shelf";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .snake_case()
            .field(FieldSchema::id_text("key"))
            .field(FieldSchema::new("shelfName", string()))
            .field(FieldSchema::new("featured", FieldKind::Model(PRODUCT)))
            .field(FieldSchema::new("stock", FieldKind::map(FieldKind::Model(PRODUCT))))
            .field(FieldSchema::new("picks", FieldKind::list(FieldKind::Reference(Book::TYPE_PATH))))
            .field(FieldSchema::new("tag", FieldKind::Dynamic))
            .field(FieldSchema::additional_data("extra"))
    }

    fn get_field(&self, name: &str) -> Option<FieldValue> {
        match name {
            "key" => Some(self.key.to_field()),
            "shelfName" => Some(self.name.to_field()),
            "featured" => Some(self.featured.to_field()),
            "stock" => Some(self.stock.to_field()),
            "picks" => Some(self.picks.to_field()),
            "tag" => Some(self.tag.to_field()),
            "extra" => Some(self.extra.to_field()),
            _ => None,
        }
    }

    fn set_field(&mut self, name: &str, value: FieldValue) -> ModelResult<()> {
        match name {
            "key" => self.key = Property::from_field(value)?,
            "shelfName" => self.name = Property::from_field(value)?,
            "featured" => self.featured = Property::from_field(value)?,
            "stock" => self.stock = Property::from_field(value)?,
            "picks" => self.picks = Property::from_field(value)?,
            "tag" => self.tag = Property::from_field(value)?,
            "extra" => self.extra = Property::from_field(value)?,
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

// ---------------------------------------------------------------------------
// People
// ---------------------------------------------------------------------------

/// Entity with an eager self reference.
#[derive(Clone, Debug, Default)]
pub struct Person {
    pub id: Option<EntityId>,
    pub name: String,
    pub friend: Option<Reference<Person>>,
}

impl Model for Person {
    const TYPE_PATH: &'static str = "club::Person";

    fn schema() -> TypeSchema {
        TypeSchema::entity(Self::TYPE_PATH)
            .field(FieldSchema::id("id"))
            .field(FieldSchema::new("name", string()))
            .field(FieldSchema::new("friend", FieldKind::Reference(Self::TYPE_PATH)))
    }

    model_fields!(id, name, friend);
}

// ---------------------------------------------------------------------------
// Mappers
// ---------------------------------------------------------------------------

pub fn registry() -> TypeRegistry {
    let mut registry = TypeRegistry::new();
    registry
        .register::<Item>()
        .register::<Customer>()
        .register::<Line>()
        .register::<Order>()
        .register_enum::<Status>()
        .register_abstract(product_schema())
        .register::<Book>()
        .register::<Gadget>()
        .register_enum::<Format>()
        .register_opaque::<Barcode>()
        .register::<Shelf>()
        .register::<Person>();
    registry
}

pub fn mapper() -> Arc<ObjectMapper> {
    mapper_with(MapperConfig::default())
}

pub fn mapper_with(config: MapperConfig) -> Arc<ObjectMapper> {
    mapper_on(Arc::new(InMemoryDocumentStore::new()), config)
}

pub fn mapper_on(store: Arc<InMemoryDocumentStore>, config: MapperConfig) -> Arc<ObjectMapper> {
    let store: Arc<dyn DocumentStore> = store;
    ObjectMapper::builder()
        .registry(registry())
        .store(store)
        .config(config)
        .build()
}
