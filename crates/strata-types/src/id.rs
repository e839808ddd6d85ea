use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::TypeError;

/// Stable identifier for a concatenated child object.
///
/// An `ObjectId` is a random UUID allocated when an object is registered
/// under a store. It persists across save/load cycles and is the key used
/// by every index table and attribute blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId(Uuid);

impl ObjectId {
    /// Allocate a fresh random identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// The nil identifier (all zeros). Represents "no object".
    pub const fn nil() -> Self {
        Self(Uuid::nil())
    }

    /// Returns `true` if this is the nil identifier.
    pub fn is_nil(&self) -> bool {
        self.0.is_nil()
    }

    /// The underlying UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Short identifier (first 8 hex characters), for logs and debugging.
    pub fn short_id(&self) -> String {
        self.0.simple().to_string()[..8].to_string()
    }

    /// Parse from a hyphenated or simple UUID string.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| TypeError::InvalidId(e.to_string()))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<Uuid> for ObjectId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.short_id())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
