use std::collections::BTreeMap;
use std::sync::RwLock;

use crate::error::{ContainerError, ContainerResult};
use crate::traits::ContainerStore;

/// In-memory, BTreeMap-based container.
///
/// Intended for tests and embedding. All values are held in memory behind a
/// `RwLock` for safe concurrent reads. Values are cloned on read.
pub struct InMemoryContainer {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryContainer {
    /// Create a new empty container.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.entries.read().expect("lock poisoned").len()
    }

    /// Returns `true` if the container is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().expect("lock poisoned").is_empty()
    }

    /// Total bytes across all stored values.
    pub fn total_bytes(&self) -> u64 {
        self.entries
            .read()
            .expect("lock poisoned")
            .values()
            .map(|v| v.len() as u64)
            .sum()
    }

    /// Remove all keys.
    pub fn clear(&self) {
        self.entries.write().expect("lock poisoned").clear();
    }

    /// Return a sorted list of all keys.
    pub fn all_keys(&self) -> Vec<String> {
        let map = self.entries.read().expect("lock poisoned");
        map.keys().cloned().collect()
    }
}

impl Default for InMemoryContainer {
    fn default() -> Self {
        Self::new()
    }
}

impl ContainerStore for InMemoryContainer {
    fn read(&self, key: &str) -> ContainerResult<Option<Vec<u8>>> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.get(key).cloned())
    }

    fn write(&self, key: &str, bytes: &[u8]) -> ContainerResult<()> {
        if key.is_empty() {
            return Err(ContainerError::InvalidKey("empty key".to_string()));
        }
        let mut map = self.entries.write().expect("lock poisoned");
        map.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn exists(&self, key: &str) -> ContainerResult<bool> {
        let map = self.entries.read().expect("lock poisoned");
        Ok(map.contains_key(key))
    }

    fn delete(&self, key: &str) -> ContainerResult<bool> {
        let mut map = self.entries.write().expect("lock poisoned");
        Ok(map.remove(key).is_some())
    }
}

impl std::fmt::Debug for InMemoryContainer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryContainer")
            .field("key_count", &self.len())
            .finish()
    }
}
