//! Reference resolution for docmap.
//!
//! Decoding a reference field yields a [`ReferenceCell`] rather than the
//! target itself. This crate supplies what those cells load through:
//!
//! - [`StoreLoader`] -- looks the target up in a [`DocumentStore`] and
//!   decodes it, honoring [`DereferenceGuard`]s and an optional timeout
//! - [`DocumentDecoder`] -- the seam back into the mapper that turns a
//!   loaded document into a model
//! - [`ReferenceResolver`] -- builds lazy or eager cells from reference
//!   markers and plain ids
//!
//! A guard veto or a failed load only affects the one reference; the object
//! holding it stays valid.
//!
//! [`ReferenceCell`]: docmap_model::ReferenceCell
//! [`DocumentStore`]: docmap_store::DocumentStore

pub mod decoder;
pub mod guard;
pub mod loader;
pub mod resolver;

pub use decoder::DocumentDecoder;
pub use guard::{DereferenceGuard, DereferenceRequest};
pub use loader::StoreLoader;
pub use resolver::ReferenceResolver;
