use std::collections::BTreeMap;

use crate::error::StoreResult;

/// Byte-string key-value store the entry layer writes through to.
///
/// Opening is each backend's constructor. All implementations must satisfy
/// these invariants:
/// - `write` returns only after the value is durable, unless the backend
///   documents otherwise.
/// - `read` of a missing key fails with `StoreError::NotFound`.
/// - `delete` of a missing key is a successful no-op.
/// - After `close`, every operation fails with `StoreError::Unavailable`.
/// - The store never interprets values.
pub trait KvStore: Send + Sync {
    /// Read the value stored under `key`.
    fn read(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Create or replace the value stored under `key`.
    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Remove `key` if present.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Read every key and value in the store.
    fn scan_all(&self) -> StoreResult<BTreeMap<String, Vec<u8>>>;

    /// Release the underlying handle. Idempotent.
    fn close(&self) -> StoreResult<()>;

    /// Check whether `key` is present.
    ///
    /// Default implementation calls `read()`. Backends may override to
    /// avoid loading the value.
    fn contains(&self, key: &str) -> StoreResult<bool> {
        match self.read(key) {
            Ok(_) => Ok(true),
            Err(e) if e.is_not_found() => Ok(false),
            Err(e) => Err(e),
        }
    }
}
