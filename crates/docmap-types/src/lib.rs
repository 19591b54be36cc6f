//! Foundation types for docmap.
//!
//! This crate provides the generic, tree-shaped payload exchanged with a
//! document-oriented store. Every other docmap crate depends on
//! `docmap-types`.
//!
//! # Key Types
//!
//! - [`Document`] -- Ordered map of string keys to [`Value`]s
//! - [`Value`] -- Null, scalar, nested document, list, or reference marker
//! - [`EntityId`] -- Opaque 12-byte entity identifier with a hex display form
//! - [`IdValue`] -- Either representation of an entity id (opaque or text)
//! - [`ReferenceMarker`] -- Cross-entity edge stored inside a document
//!
//! The [`text`] module renders documents to, and parses them from, the
//! generic JSON text format.

pub mod document;
pub mod error;
pub mod id;
pub mod marker;
pub mod text;
pub mod value;

pub use document::Document;
pub use error::TypeError;
pub use id::{EntityId, IdValue};
pub use marker::ReferenceMarker;
pub use value::Value;

/// Storage key of an entity's id field.
pub const ID_KEY: &str = "_id";
