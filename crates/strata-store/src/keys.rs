//! Key naming scheme for persisted store state.
//!
//! All keys live under the `strata/` namespace. Per-object records embed the
//! object's UUID; per-attribute records embed the shared array name.

use strata_types::ObjectId;

/// Registry record: ordered object ids and store settings.
pub const REGISTRY: &str = "strata/registry";

/// Manifest: every key written by the last save, so a later save can delete
/// keys that no longer exist.
pub const MANIFEST: &str = "strata/manifest";

/// Attribute blob for one object (JSON).
pub fn attributes(id: &ObjectId) -> String {
    format!("strata/attributes/{id}")
}

/// Column metadata for one object (JSON).
pub fn columns(id: &ObjectId) -> String {
    format!("strata/columns/{id}")
}

/// Property groups for one object (JSON).
pub fn groups(id: &ObjectId) -> String {
    format!("strata/groups/{id}")
}

/// Shared value array for one attribute name (bincode).
pub fn array(name: &str) -> String {
    format!("strata/arrays/{name}")
}

/// Index table for one attribute name (bincode).
pub fn index(name: &str) -> String {
    format!("strata/index/{name}")
}

/// Attribute name of a shared-array key, if `key` is one.
pub fn array_name(key: &str) -> Option<&str> {
    key.strip_prefix("strata/arrays/")
}

/// Attribute name of an index-table key, if `key` is one.
pub fn index_name(key: &str) -> Option<&str> {
    key.strip_prefix("strata/index/")
}
