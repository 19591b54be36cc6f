use docmap_types::{Document, IdValue};

use crate::error::StoreResult;

/// A document-oriented store.
///
/// Implementations must satisfy these invariants:
/// - `store` returns the id under which the document can be found again.
///   A document without `_id` is assigned a fresh one.
/// - Storing a document whose id already exists replaces it.
/// - Concurrent reads are always safe.
pub trait DocumentStore: Send + Sync {
    /// Find a document by id.
    ///
    /// `collection` overrides the collection derived from `type_path`.
    /// Returns `Ok(None)` if no such document exists.
    fn find(
        &self,
        type_path: &str,
        id: &IdValue,
        collection: Option<&str>,
    ) -> StoreResult<Option<Document>>;

    /// Store a document and return its id.
    fn store(
        &self,
        type_path: &str,
        collection: Option<&str>,
        document: Document,
    ) -> StoreResult<IdValue>;

    /// Delete a document. Returns `true` if it existed.
    fn remove(&self, type_path: &str, id: &IdValue, collection: Option<&str>) -> StoreResult<bool>;

    /// Find multiple documents of one type.
    ///
    /// Default implementation calls `find()` for each id.
    fn find_batch(
        &self,
        type_path: &str,
        ids: &[IdValue],
        collection: Option<&str>,
    ) -> StoreResult<Vec<Option<Document>>> {
        ids.iter()
            .map(|id| self.find(type_path, id, collection))
            .collect()
    }
}

/// Maps a type to the collection its documents live in.
pub trait CollectionNaming: Send + Sync {
    fn collection_name_for(&self, type_path: &str) -> String;
}
