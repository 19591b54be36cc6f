use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;
use crate::value::Value;

/// Per-process counter mixed into generated ids.
static NEXT_COUNTER: AtomicU32 = AtomicU32::new(0);

/// Opaque 12-byte entity identifier.
///
/// Layout: 4 bytes big-endian creation time in seconds, 5 random bytes, and
/// a 3-byte counter. The display form is 24 lowercase hex characters, which
/// is also the "display string" id representation accepted by the decoder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId([u8; 12]);

impl EntityId {
    /// Generate a fresh identifier.
    pub fn generate() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as u32)
            .unwrap_or(0);
        let random: [u8; 5] = rand::thread_rng().gen();
        let counter = NEXT_COUNTER.fetch_add(1, Ordering::Relaxed) & 0x00ff_ffff;

        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&random);
        bytes[9..].copy_from_slice(&counter.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Create an `EntityId` from raw bytes.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// The raw 12 bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Creation time in seconds since the Unix epoch.
    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Hex-encoded string representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Parse from a 24-character hex string.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 12 {
            return Err(TypeError::InvalidLength {
                expected: 12,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 12];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EntityId({})", self.to_hex())
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for EntityId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 12]> for EntityId {
    fn from(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

// ---------------------------------------------------------------------------
// IdValue
// ---------------------------------------------------------------------------

/// An entity id in either of its two interchangeable representations.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IdValue {
    /// Opaque identifier.
    Opaque(EntityId),
    /// Display string (hex form of an opaque id, or an application key).
    Text(String),
}

impl IdValue {
    /// Read an id out of a stored value.
    ///
    /// Integers are accepted as text keys. Every other value kind yields
    /// `None`.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Id(id) => Some(Self::Opaque(*id)),
            Value::String(s) => Some(Self::Text(s.clone())),
            Value::Int(i) => Some(Self::Text(i.to_string())),
            _ => None,
        }
    }

    /// The stored form of this id.
    pub fn to_value(&self) -> Value {
        match self {
            Self::Opaque(id) => Value::Id(*id),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    /// Convert to the opaque representation, parsing hex text if needed.
    pub fn to_opaque(&self) -> Option<EntityId> {
        match self {
            Self::Opaque(id) => Some(*id),
            Self::Text(s) => EntityId::from_hex(s).ok(),
        }
    }

    /// Convert to the display-string representation.
    pub fn to_text(&self) -> String {
        match self {
            Self::Opaque(id) => id.to_hex(),
            Self::Text(s) => s.clone(),
        }
    }

    /// Two ids are equivalent when their display forms match, regardless of
    /// representation.
    pub fn same_entity(&self, other: &Self) -> bool {
        self.to_text() == other.to_text()
    }
}

impl fmt::Display for IdValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_text())
    }
}

impl From<EntityId> for IdValue {
    fn from(id: EntityId) -> Self {
        Self::Opaque(id)
    }
}

impl From<String> for IdValue {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for IdValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}
