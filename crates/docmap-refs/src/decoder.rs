use docmap_model::AnyModel;
use docmap_types::Document;

/// Turns a loaded document back into a model.
///
/// Implemented by the object mapper. The loader holds it weakly, so a
/// reference outliving its mapper fails to load instead of keeping the
/// mapper alive.
pub trait DocumentDecoder: Send + Sync {
    /// Decode `document` as an instance of `type_path` or of a subtype
    /// named by its discriminator.
    ///
    /// `Ok(None)` means the document decodes to nothing, e.g. because its
    /// id has no usable representation.
    fn decode_reference(
        &self,
        type_path: &str,
        document: Document,
    ) -> Result<Option<Box<dyn AnyModel>>, String>;
}
