//! Storage collaborators for docmap.
//!
//! The mapping engine never talks to a database. It needs two
//! collaborators, both defined here:
//!
//! - [`DocumentStore`] -- find a document by type, id and optional
//!   collection; store a document and report its id
//! - [`CollectionNaming`] -- the collection a type lives in when no
//!   override is given
//!
//! [`InMemoryDocumentStore`] is a `HashMap`-backed store for tests and
//! embedding.

pub mod error;
pub mod memory;
pub mod naming;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use memory::InMemoryDocumentStore;
pub use naming::DefaultCollectionNaming;
pub use traits::{CollectionNaming, DocumentStore};
