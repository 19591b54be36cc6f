//! Per-type encoding overrides for docmap.
//!
//! A [`CustomCodec`] takes over encoding and decoding of one type path
//! (a model, enum, opaque, or scalar kind). The [`CodecRegistry`] is
//! consulted before any built-in mapping, by both encoder and decoder.
//!
//! The [`binary`] module implements the opt-in binary fallback: a value is
//! stored as a two-key document holding a base64 payload and its type.

pub mod binary;
pub mod codec;
pub mod error;
pub mod registry;

pub use binary::{decode_binary, encode_binary, is_binary_document, BinaryPayload, BINARY_DATA_KEY};
pub use codec::{CustomCodec, FnCodec};
pub use error::{CodecError, CodecResult};
pub use registry::CodecRegistry;
