//! Object-document mapping for docmap.
//!
//! [`ObjectMapper`] turns registered models into [`Document`]s and back:
//!
//! - encoding writes every persistent field under its storage name, adds a
//!   discriminator for polymorphic hierarchies, stores references as ids
//!   or markers and falls back to codecs or a binary payload where a type
//!   asks for it
//! - decoding picks the concrete type from the discriminator, coerces
//!   stored scalars into the declared field kinds and hands reference
//!   fields out as lazy or eager cells
//! - [`MapperConfig`] -- discriminator key, strictness and fallbacks
//!
//! `store_model` runs the `PreStore` and `PostStore` hooks the type
//! declares. `load` decodes only; callers run `PostLoad` themselves.
//!
//! [`Document`]: docmap_types::Document

pub mod coerce;
pub mod config;
pub mod decoder;
pub mod encoder;
pub mod error;
pub mod mapper;

#[cfg(test)]
mod testing;

pub use coerce::{coerce_id, coerce_scalar, parse_date};
pub use config::{MapperConfig, DEFAULT_DISCRIMINATOR_KEY};
pub use encoder::{CODEC_VALUE_KEY, ENUM_NAME_KEY};
pub use error::{MappingError, MappingResult};
pub use mapper::{ObjectMapper, ObjectMapperBuilder};
