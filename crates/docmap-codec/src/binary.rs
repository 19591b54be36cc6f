//! Binary fallback payloads.
//!
//! Format: a document with exactly two keys, the base64 payload under
//! [`BINARY_DATA_KEY`] and the type path under the discriminator key.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use docmap_model::OpaqueValue;
use docmap_types::{Document, Value};

use crate::error::{CodecError, CodecResult};

/// Document key holding the base64 payload.
pub const BINARY_DATA_KEY: &str = "_b64data";

/// A decoded binary fallback document.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BinaryPayload {
    pub type_path: String,
    pub bytes: Vec<u8>,
}

/// Serialize an opaque value into its fallback document.
pub fn encode_binary(value: &dyn OpaqueValue, type_key: &str) -> CodecResult<Document> {
    let bytes = value.to_bytes()?;
    let mut doc = Document::with_capacity(2);
    doc.insert(BINARY_DATA_KEY, STANDARD.encode(bytes));
    doc.insert(type_key, value.type_path());
    Ok(doc)
}

/// Whether `doc` has the shape of a fallback document.
pub fn is_binary_document(doc: &Document, type_key: &str) -> bool {
    doc.len() == 2
        && matches!(doc.get(BINARY_DATA_KEY), Some(Value::String(_)))
        && matches!(doc.get(type_key), Some(Value::String(_)))
}

/// Extract the payload of a fallback document.
///
/// Returns `Ok(None)` for documents of any other shape.
pub fn decode_binary(doc: &Document, type_key: &str) -> CodecResult<Option<BinaryPayload>> {
    if !is_binary_document(doc, type_key) {
        return Ok(None);
    }
    let (Some(data), Some(type_path)) = (doc.get_str(BINARY_DATA_KEY), doc.get_str(type_key)) else {
        return Ok(None);
    };
    let bytes = STANDARD
        .decode(data)
        .map_err(|e| CodecError::InvalidPayload(e.to_string()))?;
    Ok(Some(BinaryPayload {
        type_path: type_path.to_string(),
        bytes,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_model::{decode_opaque, Opaque};
    use serde::{Deserialize, Serialize};

    #[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
    struct Weights {
        layer: String,
        values: Vec<i32>,
    }

    #[test]
    fn fallback_document_shape() {
        let value = Opaque(Weights {
            layer: "l1".into(),
            values: vec![1, -2, 3],
        });
        let doc = encode_binary(&value, "class_name").unwrap();
        assert_eq!(doc.keys().collect::<Vec<_>>(), vec![BINARY_DATA_KEY, "class_name"]);
        assert_eq!(doc.get_str("class_name"), Some(Opaque::<Weights>::type_name()));
        assert!(is_binary_document(&doc, "class_name"));
    }

    #[test]
    fn payload_decodes_back() {
        let value = Opaque(Weights {
            layer: "l2".into(),
            values: vec![7],
        });
        let doc = encode_binary(&value, "class_name").unwrap();
        let payload = decode_binary(&doc, "class_name").unwrap().unwrap();
        assert_eq!(payload.type_path, Opaque::<Weights>::type_name());
        let decoded = decode_opaque::<Weights>(&payload.bytes).unwrap();
        assert_eq!(
            decoded.as_any().downcast_ref::<Opaque<Weights>>(),
            Some(&value)
        );
    }

    #[test]
    fn other_documents_are_not_payloads() {
        let mut doc = Document::new();
        doc.insert(BINARY_DATA_KEY, "AAAA");
        assert!(decode_binary(&doc, "class_name").unwrap().is_none());
        doc.insert("class_name", "x::Y");
        doc.insert("extra", 1i64);
        assert!(decode_binary(&doc, "class_name").unwrap().is_none());
    }

    #[test]
    fn bad_base64_is_an_error() {
        let mut doc = Document::new();
        doc.insert(BINARY_DATA_KEY, "not base64!");
        doc.insert("class_name", "x::Y");
        assert!(matches!(
            decode_binary(&doc, "class_name"),
            Err(CodecError::InvalidPayload(_))
        ));
    }
}
