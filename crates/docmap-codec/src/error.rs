use docmap_model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    /// A user codec rejected the value.
    #[error("codec failed: {0}")]
    Custom(String),

    #[error("codec expected {expected}, found {found}")]
    UnexpectedValue {
        expected: &'static str,
        found: &'static str,
    },

    /// The binary fallback payload is not valid base64.
    #[error("invalid binary payload: {0}")]
    InvalidPayload(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type CodecResult<T> = Result<T, CodecError>;
