use std::fmt;

use docmap_model::FieldValue;
use docmap_types::Value;

use crate::error::CodecResult;

/// Encoding override for one type.
///
/// `encode` receives the field value of the registered type and returns
/// its stored form. `decode` must accept whatever `encode` produces.
pub trait CustomCodec: Send + Sync {
    fn encode(&self, value: &FieldValue) -> CodecResult<Value>;

    fn decode(&self, value: &Value) -> CodecResult<FieldValue>;
}

/// Codec built from a pair of closures.
pub struct FnCodec<E, D> {
    encode: E,
    decode: D,
}

impl<E, D> FnCodec<E, D>
where
    E: Fn(&FieldValue) -> CodecResult<Value> + Send + Sync,
    D: Fn(&Value) -> CodecResult<FieldValue> + Send + Sync,
{
    pub fn new(encode: E, decode: D) -> Self {
        Self { encode, decode }
    }
}

impl<E, D> CustomCodec for FnCodec<E, D>
where
    E: Fn(&FieldValue) -> CodecResult<Value> + Send + Sync,
    D: Fn(&Value) -> CodecResult<FieldValue> + Send + Sync,
{
    fn encode(&self, value: &FieldValue) -> CodecResult<Value> {
        (self.encode)(value)
    }

    fn decode(&self, value: &Value) -> CodecResult<FieldValue> {
        (self.decode)(value)
    }
}

impl<E, D> fmt::Debug for FnCodec<E, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnCodec")
    }
}
