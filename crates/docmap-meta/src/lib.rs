//! Type metadata for docmap.
//!
//! - [`TypeRegistry`] -- every model, enum and opaque type the mapper may
//!   meet, looked up by full type path or unambiguous short name
//! - [`EntityTypeDescriptor`] -- the merged, immutable view of one type and
//!   its hierarchy: markers, ordered fields, id field, hook table
//! - [`MetadataResolver`] -- computes descriptors on first use and caches
//!   them together with storage names and field lookups
//!
//! # Caching
//!
//! Every cache is an `RwLock<HashMap>`. Values are computed outside the
//! lock and inserted first-writer-wins, so racing threads may compute a
//! descriptor twice but all of them observe the same `Arc`.

pub mod descriptor;
pub mod error;
pub mod hooks;
pub mod naming;
pub mod registry;
pub mod resolver;

#[cfg(test)]
mod testing;

pub use descriptor::{EntityTypeDescriptor, FieldDescriptor};
pub use error::{MetaError, MetaResult};
pub use naming::{short_name, snake_case};
pub use registry::{EnumRegistration, ModelRegistration, OpaqueRegistration, TypeRegistry};
pub use resolver::MetadataResolver;
