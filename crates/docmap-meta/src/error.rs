use docmap_model::ModelError;

/// Errors from type registration and metadata resolution.
///
/// All of these are programming errors in the declared types: they abort
/// the mapping call that hit them.
#[derive(Debug, thiserror::Error)]
pub enum MetaError {
    /// No type is registered under this path or short name.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A short name matches more than one registered type.
    #[error("ambiguous type name {0}: use the full type path")]
    AmbiguousName(String),

    /// An entity type declares no id field.
    #[error("entity type {0} declares no id field")]
    MissingId(String),

    /// A type declares more than one id field.
    #[error("type {type_path} declares {count} id fields")]
    DuplicateId { type_path: String, count: usize },

    /// The supertype chain loops back on itself.
    #[error("supertype cycle through {0}")]
    HierarchyCycle(String),

    /// A document key matches no field and the type has no catch-all.
    #[error("{type_path} has no field for key {key}")]
    UnresolvedField { type_path: String, key: String },

    /// The type is abstract or was registered without a factory.
    #[error("type {0} cannot be instantiated")]
    NotInstantiable(String),

    /// Reading or writing a field through the model failed.
    #[error(transparent)]
    FieldAccess(#[from] ModelError),
}

/// Result alias for metadata operations.
pub type MetaResult<T> = Result<T, MetaError>;
