use docmap_codec::CodecError;
use docmap_meta::MetaError;
use docmap_model::{ModelError, ReferenceError};
use docmap_store::StoreError;
use docmap_types::TypeError;
use thiserror::Error;

/// Errors from encoding, decoding, storing and loading.
///
/// Every variant aborts the call that produced it. Failures of individual
/// references are not mapping errors: they stay inside the reference.
#[derive(Debug, Error)]
pub enum MappingError {
    /// An entity that has to be identified carries no id.
    #[error("{type_path} instance has no id")]
    MissingId { type_path: String },

    /// A type path or discriminator names no registered type.
    #[error("unknown type: {0}")]
    UnknownType(String),

    /// A stored enum name matches no variant.
    #[error("unknown variant {variant} for enum {type_path}")]
    UnknownVariant { type_path: String, variant: String },

    /// A value has no conversion to the declared field kind.
    #[error("cannot convert {found} into {expected} for {field}")]
    Coercion {
        field: String,
        expected: String,
        found: &'static str,
    },

    /// An id value has no representation the id field accepts.
    ///
    /// A top-level decode reports this as "no object" rather than as an
    /// error.
    #[error("id of {type_path} cannot be represented: {found}")]
    IdCoercion { type_path: String, found: String },

    /// A registered codec failed.
    #[error("codec for {type_path} failed: {source}")]
    Codec {
        type_path: String,
        #[source]
        source: CodecError,
    },

    /// The type is neither an entity nor embedded, or is an opaque value
    /// while the binary fallback is disabled.
    #[error("type {0} is not mappable")]
    NotMappable(String),

    /// The type is abstract or was registered without a factory.
    #[error("type {0} cannot be instantiated")]
    NotInstantiable(String),

    /// A reference points at a target that was never stored.
    #[error("{field} references an unsaved {type_path}")]
    UnsavedReference { type_path: String, field: String },

    /// A document key matches no field and there is no catch-all.
    #[error("{type_path} has no field for key {key}")]
    Lookup { type_path: String, key: String },

    #[error("type metadata error: {0}")]
    Meta(MetaError),

    #[error("field access error: {0}")]
    Model(ModelError),

    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Text(#[from] TypeError),
}

impl From<MetaError> for MappingError {
    fn from(error: MetaError) -> Self {
        match error {
            MetaError::UnknownType(path) => MappingError::UnknownType(path),
            MetaError::AmbiguousName(name) => MappingError::UnknownType(name),
            MetaError::NotInstantiable(path) => MappingError::NotInstantiable(path),
            MetaError::UnresolvedField { type_path, key } => MappingError::Lookup { type_path, key },
            MetaError::FieldAccess(e) => e.into(),
            other => MappingError::Meta(other),
        }
    }
}

impl From<ModelError> for MappingError {
    fn from(error: ModelError) -> Self {
        match error {
            ModelError::UnknownVariant { type_path, variant } => {
                MappingError::UnknownVariant { type_path, variant }
            }
            other => MappingError::Model(other),
        }
    }
}

/// Result alias for mapping operations.
pub type MappingResult<T> = Result<T, MappingError>;
