use serde::{Deserialize, Serialize};

use crate::document::Document;
use crate::id::IdValue;
use crate::value::Value;

/// Document key holding the referenced type name.
pub const MARKER_TYPE_KEY: &str = "referenced_class_name";
/// Document key holding the referenced id.
pub const MARKER_ID_KEY: &str = "refid";
/// Document key holding the optional collection name.
pub const MARKER_COLLECTION_KEY: &str = "collection_name";

/// Cross-entity edge stored inside a document.
///
/// Markers are pure data: they are created by the encoder and read by the
/// decoder, never mutated.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReferenceMarker {
    /// Fully-qualified type path of the referenced entity.
    pub type_path: String,
    /// Id of the referenced entity.
    pub id: IdValue,
    /// Collection the entity lives in, when known.
    pub collection: Option<String>,
}

impl ReferenceMarker {
    pub fn new(type_path: impl Into<String>, id: IdValue, collection: Option<String>) -> Self {
        Self {
            type_path: type_path.into(),
            id,
            collection,
        }
    }

    /// Document form used by the text rendering.
    pub fn to_document(&self) -> Document {
        let mut doc = Document::with_capacity(3);
        doc.insert(MARKER_TYPE_KEY, self.type_path.as_str());
        doc.insert(MARKER_ID_KEY, self.id.to_value());
        if let Some(collection) = &self.collection {
            doc.insert(MARKER_COLLECTION_KEY, collection.as_str());
        }
        doc
    }

    /// Recognize the document form of a marker.
    ///
    /// Returns `None` unless the document has the type and id keys and no
    /// keys other than the three marker keys.
    pub fn from_document(doc: &Document) -> Option<Self> {
        let type_path = doc.get_str(MARKER_TYPE_KEY)?;
        let id = IdValue::from_value(doc.get(MARKER_ID_KEY)?)?;
        let collection = match doc.get(MARKER_COLLECTION_KEY) {
            Some(Value::String(c)) => Some(c.clone()),
            Some(Value::Null) | None => None,
            Some(_) => return None,
        };
        let known = doc
            .keys()
            .all(|k| k == MARKER_TYPE_KEY || k == MARKER_ID_KEY || k == MARKER_COLLECTION_KEY);
        known.then(|| Self::new(type_path, id, collection))
    }
}
