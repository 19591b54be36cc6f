use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default document key holding a type discriminator.
pub const DEFAULT_DISCRIMINATOR_KEY: &str = "class_name";

/// Configuration for an [`ObjectMapper`](crate::ObjectMapper).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapperConfig {
    /// Key under which polymorphic documents record their concrete type.
    pub discriminator_key: String,
    /// Store `Opaque` values as base64 payload documents.
    pub allow_binary_fallback: bool,
    /// Persist unsaved reference targets of `auto_store` fields while
    /// encoding. When `false`, such references fail the encode.
    pub auto_store_references: bool,
    /// Fail a decode on document keys that match no field. When `false`,
    /// unmatched keys are logged and skipped.
    pub strict_fields: bool,
    /// Upper bound on one reference store lookup.
    pub load_timeout: Option<Duration>,
}

impl Default for MapperConfig {
    fn default() -> Self {
        Self {
            discriminator_key: DEFAULT_DISCRIMINATOR_KEY.to_string(),
            allow_binary_fallback: false,
            auto_store_references: true,
            strict_fields: true,
            load_timeout: None,
        }
    }
}

impl MapperConfig {
    /// Nothing implicit: no auto-store, no binary fallback, unknown keys
    /// are errors.
    pub fn strict() -> Self {
        Self {
            auto_store_references: false,
            ..Default::default()
        }
    }

    /// Tolerates schema drift: unknown keys are skipped and opaque values
    /// fall back to binary payloads.
    pub fn lenient() -> Self {
        Self {
            allow_binary_fallback: true,
            strict_fields: false,
            ..Default::default()
        }
    }

    pub fn with_discriminator_key(mut self, key: impl Into<String>) -> Self {
        self.discriminator_key = key.into();
        self
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = Some(timeout);
        self
    }
}
