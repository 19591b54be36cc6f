use thiserror::Error;

/// Errors produced while reading or writing model fields.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ModelError {
    /// The model has no field with this name.
    #[error("{type_path} has no field named {field}")]
    UnknownField {
        type_path: &'static str,
        field: String,
    },

    /// The field value has the wrong shape for the Rust field type.
    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },

    /// A numeric value does not fit the Rust field type.
    #[error("value {value} out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    /// The symbolic name matches no enum variant.
    #[error("unknown variant {variant} for enum {type_path}")]
    UnknownVariant { type_path: String, variant: String },

    /// Binary serialization of an opaque value failed.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Result alias for model field operations.
pub type ModelResult<T> = Result<T, ModelError>;

/// Failure to resolve one reference.
///
/// Reference errors are scoped to the single field that holds the
/// reference: the rest of the decoded object graph remains valid.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// The loader collaborator failed.
    #[error("failed to load {type_path} {id}: {reason}")]
    Load {
        type_path: String,
        id: String,
        reason: String,
    },

    /// The loader collaborator did not answer in time.
    #[error("loading {type_path} {id} timed out after {millis} ms")]
    Timeout {
        type_path: String,
        id: String,
        millis: u64,
    },

    /// The loaded target is not the expected Rust type.
    #[error("reference target is {found}, expected {expected}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    /// A thread panicked while holding the target lock.
    #[error("reference target lock poisoned")]
    Poisoned,
}
