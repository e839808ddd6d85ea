use crate::error::ContainerResult;

/// Persistent container holding named byte arrays.
///
/// All implementations must satisfy these invariants:
/// - A `write` fully replaces any previous value under the same key.
/// - `read` after `write` returns exactly the written bytes.
/// - The container never interprets values — it is a pure key-value store.
/// - All I/O errors are propagated, never silently ignored.
///
/// The concatenated core is the single writer; implementations only need to
/// make concurrent *reads* safe.
pub trait ContainerStore: Send + Sync {
    /// Read the bytes stored under `key`.
    ///
    /// Returns `Ok(None)` if the key does not exist.
    /// Returns `Err` on I/O failure.
    fn read(&self, key: &str) -> ContainerResult<Option<Vec<u8>>>;

    /// Write `bytes` under `key`, replacing any previous value.
    fn write(&self, key: &str, bytes: &[u8]) -> ContainerResult<()>;

    /// Check whether `key` exists.
    fn exists(&self, key: &str) -> ContainerResult<bool>;

    /// Delete `key`. Returns `true` if the key existed.
    fn delete(&self, key: &str) -> ContainerResult<bool>;

    /// Read multiple keys in a batch.
    ///
    /// Default implementation calls `read()` for each key. Backends may
    /// override for better performance (e.g., fewer I/O round-trips).
    fn read_batch(&self, keys: &[&str]) -> ContainerResult<Vec<Option<Vec<u8>>>> {
        keys.iter().map(|key| self.read(key)).collect()
    }
}
