use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

type Slots = Option<HashMap<String, Vec<u8>>>;

/// In-memory, HashMap-based key-value store.
///
/// Intended for tests and embedding. Nothing is written to disk, so the
/// durability rule of [`KvStore::write`] does not hold. Values are cloned on
/// read and write. `close` drops the contents.
pub struct InMemoryKvStore {
    values: RwLock<Slots>,
}

impl InMemoryKvStore {
    /// Create a new empty, open store.
    pub fn new() -> Self {
        Self {
            values: RwLock::new(Some(HashMap::new())),
        }
    }

    /// Create a store pre-populated with the given pairs.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<Vec<u8>>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self {
            values: RwLock::new(Some(map)),
        }
    }

    /// Number of keys currently stored (0 once closed).
    pub fn len(&self) -> usize {
        self.read_slots()
            .ok()
            .and_then(|slots| slots.as_ref().map(HashMap::len))
            .unwrap_or(0)
    }

    /// Returns `true` if the store holds no keys.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read_slots(&self) -> StoreResult<RwLockReadGuard<'_, Slots>> {
        self.values
            .read()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }

    fn write_slots(&self) -> StoreResult<RwLockWriteGuard<'_, Slots>> {
        self.values
            .write()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

impl Default for InMemoryKvStore {
    fn default() -> Self {
        Self::new()
    }
}

fn closed() -> StoreError {
    StoreError::Unavailable("in-memory store is closed".into())
}

impl KvStore for InMemoryKvStore {
    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let slots = self.read_slots()?;
        let map = slots.as_ref().ok_or_else(closed)?;
        map.get(key)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut slots = self.write_slots()?;
        let map = slots.as_mut().ok_or_else(closed)?;
        map.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut slots = self.write_slots()?;
        let map = slots.as_mut().ok_or_else(closed)?;
        map.remove(key);
        Ok(())
    }

    fn scan_all(&self) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        let slots = self.read_slots()?;
        let map = slots.as_ref().ok_or_else(closed)?;
        Ok(map.iter().map(|(k, v)| (k.clone(), v.clone())).collect())
    }

    fn close(&self) -> StoreResult<()> {
        self.write_slots()?.take();
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        let slots = self.read_slots()?;
        let map = slots.as_ref().ok_or_else(closed)?;
        Ok(map.contains_key(key))
    }
}

impl std::fmt::Debug for InMemoryKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryKvStore")
            .field("key_count", &self.len())
            .finish()
    }
}
