use docmap_mapper::MappingError;
use docmap_store::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DatastoreError {
    /// An update targets an entity that is not in the store.
    #[error("{type_path} {id} not found")]
    NotFound { type_path: String, id: String },

    #[error(transparent)]
    Mapping(#[from] MappingError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

pub type DatastoreResult<T> = Result<T, DatastoreError>;
