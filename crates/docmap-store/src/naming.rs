use std::collections::HashMap;

use convert_case::{Case, Casing};

use crate::traits::CollectionNaming;

/// Snake-cased short type name, unless overridden per type.
///
/// `shop::LineItem` lives in `line_item`.
#[derive(Clone, Debug, Default)]
pub struct DefaultCollectionNaming {
    overrides: HashMap<String, String>,
}

impl DefaultCollectionNaming {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_override(mut self, type_path: impl Into<String>, collection: impl Into<String>) -> Self {
        self.overrides.insert(type_path.into(), collection.into());
        self
    }
}

impl CollectionNaming for DefaultCollectionNaming {
    fn collection_name_for(&self, type_path: &str) -> String {
        if let Some(name) = self.overrides.get(type_path) {
            return name.clone();
        }
        let short = type_path.rsplit("::").next().unwrap_or(type_path);
        short.to_case(Case::Snake)
    }
}
