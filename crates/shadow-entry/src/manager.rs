use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Instant;

use bytes::Bytes;
use shadow_crypto::ContentHasher;
use shadow_doc::{Document, Item};
use shadow_index::Index;
use shadow_store::KvStore;
use shadow_types::ContentHash;
use tracing::{debug, info, warn};

use crate::error::{EntryError, EntryResult};

/// Outcome of the startup scan.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// Stored documents that decoded and are now live entries.
    pub loaded: usize,
    /// Stored documents that failed to decode and were left out.
    pub skipped: usize,
}

/// Serialized forms of current state, filled on commit or first read.
#[derive(Default)]
struct Caches {
    entries: HashMap<String, Bytes>,
    index: Option<Bytes>,
}

struct EntryState {
    documents: HashMap<String, Document>,
    index: Index,
    // Filled by readers under the shared guard.
    caches: Mutex<Caches>,
}

impl EntryState {
    // Caches are derived data; a fresh serialization overwrites anything
    // a panicking holder left behind.
    fn caches(&self) -> MutexGuard<'_, Caches> {
        self.caches.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn caches_mut(&mut self) -> &mut Caches {
        self.caches.get_mut().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Owns all entries and is the single writer of the backing store.
pub struct EntryManager {
    store: Box<dyn KvStore>,
    hasher: ContentHasher,
    state: RwLock<EntryState>,
    report: LoadReport,
}

impl std::fmt::Debug for EntryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryManager")
            .field("hasher", &self.hasher)
            .field("report", &self.report)
            .finish_non_exhaustive()
    }
}

impl EntryManager {
    /// Build the manager from a full scan of `store`.
    ///
    /// Every stored value is decoded into a document, hashed and cached.
    /// Values that fail to decode are logged and skipped; they stay in the
    /// store until a later commit overwrites them. Only a failing scan is an
    /// error.
    pub fn load(store: Box<dyn KvStore>, hasher: ContentHasher) -> EntryResult<Self> {
        let started = Instant::now();
        let stored = store.scan_all()?;

        let mut documents = HashMap::with_capacity(stored.len());
        let mut index = Index::new();
        let mut caches = Caches::default();
        let mut report = LoadReport::default();

        for (name, bytes) in stored {
            let document = match Document::from_slice(&bytes) {
                Ok(document) => document,
                Err(e) => {
                    warn!(entry = %name, error = %e, "skipping undecodable stored document");
                    report.skipped += 1;
                    continue;
                }
            };
            // Hash the canonical form so the index matches what getEntry serves.
            let json = document.to_json()?;
            index.add(name.clone(), hasher.hash(&json));
            caches.entries.insert(name.clone(), Bytes::from(json));
            documents.insert(name, document);
            report.loaded += 1;
        }

        if !index.is_empty() {
            caches.index = Some(Bytes::from(index.to_json()?));
        }

        info!(
            loaded = report.loaded,
            skipped = report.skipped,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "entries loaded"
        );

        Ok(Self {
            store,
            hasher,
            state: RwLock::new(EntryState {
                documents,
                index,
                caches: Mutex::new(caches),
            }),
            report,
        })
    }

    /// Counts from the startup scan.
    pub fn load_report(&self) -> LoadReport {
        self.report
    }

    /// The hasher used for index digests.
    pub fn hasher(&self) -> ContentHasher {
        self.hasher
    }

    // ---------------------------------------------------------------
    // Mutations
    // ---------------------------------------------------------------

    /// Delete an entry from the store, then from memory.
    ///
    /// Deleting an entry that does not exist succeeds. If the store delete
    /// fails nothing in memory changes.
    pub fn remove_entry(&self, name: &str) -> EntryResult<()> {
        validate_name("entry", name)?;
        let mut state = self.write_state()?;
        self.delete_locked(&mut state, name)
    }

    /// Add `item` to `section` of entry `name`, creating either if needed.
    ///
    /// An existing item with a case-insensitively equal id is replaced in
    /// place. Returns the entry's new content hash.
    pub fn add_item(&self, name: &str, section: &str, item: &[u8]) -> EntryResult<ContentHash> {
        validate_name("entry", name)?;
        validate_name("section", section)?;
        let item = Item::from_slice(item)?;

        let mut state = self.write_state()?;
        let mut document = state.documents.get(name).cloned().unwrap_or_default();
        if document.insert_item(section, item).is_some() {
            debug!(entry = name, section, "item replaced");
        }
        self.commit(&mut state, name, document)
    }

    /// Remove the item `id` from `section` of entry `name`.
    ///
    /// An empty `id` removes the whole section. Unknown entries, sections or
    /// ids are no-ops. When the document ends up empty the entry is deleted
    /// instead of being written.
    pub fn remove_item(&self, name: &str, section: &str, id: &str) -> EntryResult<()> {
        validate_name("entry", name)?;
        let mut state = self.write_state()?;
        let Some(current) = state.documents.get(name) else {
            return Ok(());
        };

        let mut document = current.clone();
        let changed = document.remove_item(section, id);
        if document.is_empty() {
            debug!(entry = name, "document emptied, removing entry");
            self.delete_locked(&mut state, name)
        } else if changed {
            self.commit(&mut state, name, document).map(|_| ())
        } else {
            Ok(())
        }
    }

    /// Persist `document` as entry `name`, then install it.
    ///
    /// Nothing in `state` changes unless the store write succeeds.
    fn commit(
        &self,
        state: &mut EntryState,
        name: &str,
        document: Document,
    ) -> EntryResult<ContentHash> {
        let json = document.to_json()?;
        if let Err(e) = self.store.write(name, &json) {
            warn!(entry = name, error = %e, "store write failed; entry left unchanged");
            return Err(e.into());
        }

        let hash = self.hasher.hash(&json);
        state.documents.insert(name.to_string(), document);
        state.index.add(name, hash.clone());
        let index_json = state.index.to_json();

        let bytes = json.len();
        let caches = state.caches_mut();
        caches.entries.insert(name.to_string(), Bytes::from(json));
        caches.index = match index_json {
            Ok(json) => Some(Bytes::from(json)),
            Err(e) => {
                warn!(error = %e, "index serialization failed; will retry on read");
                None
            }
        };

        debug!(entry = name, hash = %hash.short_hex(), bytes, "entry committed");
        Ok(hash)
    }

    fn delete_locked(&self, state: &mut EntryState, name: &str) -> EntryResult<()> {
        if let Err(e) = self.store.delete(name) {
            warn!(entry = name, error = %e, "store delete failed; entry left unchanged");
            return Err(e.into());
        }

        let existed = state.documents.remove(name).is_some();
        state.index.remove(name);
        let caches = state.caches_mut();
        caches.entries.remove(name);
        caches.index = None;

        debug!(entry = name, existed, "entry removed");
        Ok(())
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    /// Serialized document of entry `name`.
    pub fn to_json(&self, name: &str) -> EntryResult<Bytes> {
        let state = self.read_state()?;
        let mut caches = state.caches();
        if let Some(bytes) = caches.entries.get(name) {
            return Ok(bytes.clone());
        }

        let document = state
            .documents
            .get(name)
            .ok_or_else(|| EntryError::NotFound(name.to_string()))?;
        let bytes = Bytes::from(document.to_json()?);
        caches.entries.insert(name.to_string(), bytes.clone());
        Ok(bytes)
    }

    /// Serialized index: `[{"name": ..., "hash": ...}, ...]`.
    pub fn index_to_json(&self) -> EntryResult<Bytes> {
        let state = self.read_state()?;
        let mut caches = state.caches();
        if let Some(bytes) = &caches.index {
            return Ok(bytes.clone());
        }

        let bytes = Bytes::from(state.index.to_json()?);
        caches.index = Some(bytes.clone());
        Ok(bytes)
    }

    /// Content hash currently recorded for `name`.
    pub fn hash_of(&self, name: &str) -> EntryResult<Option<ContentHash>> {
        Ok(self.read_state()?.index.get(name).cloned())
    }

    /// Returns `true` if entry `name` exists.
    pub fn contains(&self, name: &str) -> EntryResult<bool> {
        Ok(self.read_state()?.documents.contains_key(name))
    }

    /// All entry names, sorted.
    pub fn entry_names(&self) -> EntryResult<Vec<String>> {
        let mut names: Vec<String> = self.read_state()?.documents.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of entries.
    pub fn len(&self) -> EntryResult<usize> {
        Ok(self.read_state()?.documents.len())
    }

    /// Returns `true` if there are no entries.
    pub fn is_empty(&self) -> EntryResult<bool> {
        Ok(self.read_state()?.documents.is_empty())
    }

    /// Close the backing store once in-flight mutations have finished.
    pub fn close(&self) -> EntryResult<()> {
        let _state = self.write_state()?;
        self.store.close()?;
        info!("entry store closed");
        Ok(())
    }

    fn read_state(&self) -> EntryResult<RwLockReadGuard<'_, EntryState>> {
        self.state
            .read()
            .map_err(|_| EntryError::Internal("entry state lock poisoned".into()))
    }

    fn write_state(&self) -> EntryResult<RwLockWriteGuard<'_, EntryState>> {
        self.state
            .write()
            .map_err(|_| EntryError::Internal("entry state lock poisoned".into()))
    }
}

fn validate_name(what: &str, name: &str) -> EntryResult<()> {
    if name.is_empty() {
        return Err(EntryError::InvalidName(format!("{what} name is empty")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;
    use std::io;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::thread;

    use serde_json::{json, Value};
    use shadow_store::{InMemoryKvStore, StoreError, StoreResult};

    use crate::error::ErrorKind;

    /// Wraps a shared in-memory store; writes and deletes fail while the
    /// switch is on.
    struct FaultyStore {
        inner: Arc<InMemoryKvStore>,
        failing: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    impl FaultyStore {
        fn check(&self) -> StoreResult<()> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(StoreError::Io(io::Error::new(io::ErrorKind::Other, "disk full")));
            }
            Ok(())
        }
    }

    impl KvStore for FaultyStore {
        fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
            self.inner.read(key)
        }

        fn write(&self, key: &str, value: &[u8]) -> StoreResult<()> {
            self.check()?;
            self.writes.fetch_add(1, Ordering::SeqCst);
            self.inner.write(key, value)
        }

        fn delete(&self, key: &str) -> StoreResult<()> {
            self.check()?;
            self.inner.delete(key)
        }

        fn scan_all(&self) -> StoreResult<BTreeMap<String, Vec<u8>>> {
            self.inner.scan_all()
        }

        fn close(&self) -> StoreResult<()> {
            self.inner.close()
        }
    }

    struct Harness {
        manager: EntryManager,
        store: Arc<InMemoryKvStore>,
        failing: Arc<AtomicBool>,
        writes: Arc<AtomicUsize>,
    }

    fn harness_with(store: InMemoryKvStore) -> Harness {
        let store = Arc::new(store);
        let failing = Arc::new(AtomicBool::new(false));
        let writes = Arc::new(AtomicUsize::new(0));
        let faulty = FaultyStore {
            inner: Arc::clone(&store),
            failing: Arc::clone(&failing),
            writes: Arc::clone(&writes),
        };
        let manager = EntryManager::load(Box::new(faulty), ContentHasher::MD5).unwrap();
        Harness {
            manager,
            store,
            failing,
            writes,
        }
    }

    fn harness() -> Harness {
        harness_with(InMemoryKvStore::new())
    }

    fn json_of(bytes: &[u8]) -> Value {
        serde_json::from_slice(bytes).unwrap()
    }

    fn md5_hex(data: &[u8]) -> String {
        ContentHasher::MD5.hash(data).to_hex()
    }

    // ---------------------------------------------------------------
    // End-to-end scenario
    // ---------------------------------------------------------------

    #[test]
    fn add_get_index_then_remove_last_item() {
        let h = harness();
        let m = &h.manager;

        m.add_item("facility-1", "cards", br#"{"id":"1","code":"1212"}"#)
            .unwrap();
        let doc = m.to_json("facility-1").unwrap();
        assert_eq!(&doc[..], br#"{"cards":[{"id":"1","code":"1212"}]}"#);

        let index = m.index_to_json().unwrap();
        assert_eq!(
            json_of(&index),
            json!([{"name": "facility-1", "hash": md5_hex(&doc)}])
        );
        assert_eq!(h.store.read("facility-1").unwrap(), doc.to_vec());

        m.remove_item("facility-1", "cards", "1").unwrap();
        assert!(matches!(
            m.to_json("facility-1"),
            Err(EntryError::NotFound(_))
        ));
        assert_eq!(&m.index_to_json().unwrap()[..], b"[]");
        assert!(h.store.read("facility-1").unwrap_err().is_not_found());
    }

    #[test]
    fn add_item_returns_hash_of_served_bytes() {
        let h = harness();
        let hash = h
            .manager
            .add_item("e", "s", br#"{"id":"a","v":1}"#)
            .unwrap();
        let doc = h.manager.to_json("e").unwrap();
        assert_eq!(hash.to_hex(), md5_hex(&doc));
        assert_eq!(h.manager.hash_of("e").unwrap(), Some(hash));
    }

    // ---------------------------------------------------------------
    // Item semantics through the manager
    // ---------------------------------------------------------------

    #[test]
    fn case_insensitive_replace_keeps_position() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "s", br#"{"id":"abc","v":1}"#).unwrap();
        m.add_item("e", "s", br#"{"id":"xyz","v":2}"#).unwrap();
        m.add_item("e", "s", br#"{"id":"ABC","v":3}"#).unwrap();

        assert_eq!(
            json_of(&m.to_json("e").unwrap()),
            json!({"s": [{"id": "ABC", "v": 3}, {"id": "xyz", "v": 2}]})
        );
    }

    #[test]
    fn invalid_item_creates_nothing() {
        let h = harness();
        let m = &h.manager;

        let err = m.add_item("e", "s", br#"{"code":"1"}"#).unwrap_err();
        assert!(matches!(err, EntryError::MissingId));
        let err = m.add_item("e", "s", b"{oops").unwrap_err();
        assert!(matches!(err, EntryError::Decode(_)));
        assert_eq!(err.kind(), ErrorKind::BadInput);

        assert!(!m.contains("e").unwrap());
        assert_eq!(h.writes.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn empty_names_are_rejected() {
        let h = harness();
        let m = &h.manager;
        assert!(matches!(
            m.add_item("", "s", br#"{"id":"1"}"#),
            Err(EntryError::InvalidName(_))
        ));
        assert!(matches!(
            m.add_item("e", "", br#"{"id":"1"}"#),
            Err(EntryError::InvalidName(_))
        ));
        assert!(matches!(m.remove_entry(""), Err(EntryError::InvalidName(_))));
    }

    #[test]
    fn remove_item_twice_equals_once() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "s", br#"{"id":"a"}"#).unwrap();
        m.add_item("e", "s", br#"{"id":"b"}"#).unwrap();

        m.remove_item("e", "s", "A").unwrap();
        let once = m.to_json("e").unwrap();
        let writes = h.writes.load(Ordering::SeqCst);

        m.remove_item("e", "s", "a").unwrap();
        assert_eq!(m.to_json("e").unwrap(), once);
        assert_eq!(h.writes.load(Ordering::SeqCst), writes);
    }

    #[test]
    fn remove_item_on_unknown_entry_is_noop() {
        let h = harness();
        h.manager.remove_item("ghost", "s", "1").unwrap();
        h.manager.remove_item("ghost", "s", "").unwrap();
        assert!(h.manager.is_empty().unwrap());
    }

    #[test]
    fn empty_id_removes_section() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "cards", br#"{"id":"1"}"#).unwrap();
        m.add_item("e", "faces", br#"{"id":"1"}"#).unwrap();

        m.remove_item("e", "cards", "").unwrap();
        assert_eq!(
            json_of(&m.to_json("e").unwrap()),
            json!({"faces": [{"id": "1"}]})
        );

        m.remove_item("e", "faces", "").unwrap();
        assert!(!m.contains("e").unwrap());
        assert!(m.hash_of("e").unwrap().is_none());
    }

    #[test]
    fn remove_entry_is_idempotent() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "s", br#"{"id":"1"}"#).unwrap();
        m.remove_entry("e").unwrap();
        m.remove_entry("e").unwrap();
        assert!(matches!(m.to_json("e"), Err(EntryError::NotFound(_))));
        assert_eq!(&m.index_to_json().unwrap()[..], b"[]");
    }

    // ---------------------------------------------------------------
    // Cache coherence
    // ---------------------------------------------------------------

    #[test]
    fn reads_track_every_mutation() {
        let h = harness();
        let m = &h.manager;
        let steps = [
            ("a", "s", r#"{"id":"1"}"#),
            ("b", "s", r#"{"id":"1"}"#),
            ("a", "t", r#"{"id":"2","x":true}"#),
        ];
        for (entry, section, item) in steps {
            m.add_item(entry, section, item.as_bytes()).unwrap();
            // Before and after cache population.
            let first = m.to_json(entry).unwrap();
            let second = m.to_json(entry).unwrap();
            assert_eq!(first, second);
            assert_eq!(first.to_vec(), h.store.read(entry).unwrap());
        }

        let index = json_of(&m.index_to_json().unwrap());
        let names: Vec<&str> = index
            .as_array()
            .unwrap()
            .iter()
            .map(|r| r["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, vec!["a", "b"]);

        m.remove_entry("a").unwrap();
        let index = json_of(&m.index_to_json().unwrap());
        assert_eq!(index.as_array().unwrap().len(), 1);
        assert_eq!(index[0]["hash"], json!(md5_hex(&m.to_json("b").unwrap())));
    }

    // ---------------------------------------------------------------
    // Failure non-corruption
    // ---------------------------------------------------------------

    #[test]
    fn failed_write_rolls_back_existing_entry() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "s", br#"{"id":"1","v":1}"#).unwrap();
        let doc = m.to_json("e").unwrap();
        let index = m.index_to_json().unwrap();
        let hash = m.hash_of("e").unwrap();

        h.failing.store(true, Ordering::SeqCst);
        let err = m.add_item("e", "s", br#"{"id":"1","v":2}"#).unwrap_err();
        assert!(matches!(err, EntryError::StoreUnavailable(_)));
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        let err = m.add_item("e", "s", br#"{"id":"2"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);

        assert_eq!(m.to_json("e").unwrap(), doc);
        assert_eq!(m.index_to_json().unwrap(), index);
        assert_eq!(m.hash_of("e").unwrap(), hash);

        // Once the store recovers, the next commit starts from the old state.
        h.failing.store(false, Ordering::SeqCst);
        m.add_item("e", "s", br#"{"id":"3"}"#).unwrap();
        assert_eq!(
            json_of(&m.to_json("e").unwrap()),
            json!({"s": [{"id": "1", "v": 1}, {"id": "3"}]})
        );
    }

    #[test]
    fn failed_write_does_not_create_entry() {
        let h = harness();
        h.failing.store(true, Ordering::SeqCst);
        assert!(h.manager.add_item("new", "s", br#"{"id":"1"}"#).is_err());
        assert!(!h.manager.contains("new").unwrap());
        assert!(matches!(h.manager.to_json("new"), Err(EntryError::NotFound(_))));
        assert_eq!(&h.manager.index_to_json().unwrap()[..], b"[]");
    }

    #[test]
    fn failed_delete_keeps_entry() {
        let h = harness();
        let m = &h.manager;
        m.add_item("e", "s", br#"{"id":"1"}"#).unwrap();
        m.add_item("e", "s", br#"{"id":"2"}"#).unwrap();
        let doc = m.to_json("e").unwrap();
        let index = m.index_to_json().unwrap();

        h.failing.store(true, Ordering::SeqCst);
        assert!(m.remove_entry("e").is_err());
        assert!(m.remove_item("e", "s", "").is_err());
        assert!(m.remove_item("e", "s", "1").is_err());

        assert_eq!(m.to_json("e").unwrap(), doc);
        assert_eq!(m.index_to_json().unwrap(), index);
        assert_eq!(h.store.read("e").unwrap(), doc.to_vec());
    }

    #[test]
    fn noop_removal_succeeds_while_store_is_failing() {
        let h = harness();
        h.manager.add_item("e", "s", br#"{"id":"1"}"#).unwrap();
        h.failing.store(true, Ordering::SeqCst);
        h.manager.remove_item("e", "s", "missing").unwrap();
        h.manager.remove_item("e", "other", "").unwrap();
    }

    // ---------------------------------------------------------------
    // Startup load
    // ---------------------------------------------------------------

    #[test]
    fn load_skips_undecodable_documents() {
        let store = InMemoryKvStore::with_entries([
            ("good", br#"{"cards":[{"id":"1"}]}"#.to_vec()),
            ("garbage", b"not json".to_vec()),
            ("no-id", br#"{"cards":[{"code":"x"}]}"#.to_vec()),
        ]);
        let h = harness_with(store);
        let m = &h.manager;

        assert_eq!(m.load_report(), LoadReport { loaded: 1, skipped: 2 });
        assert_eq!(m.entry_names().unwrap(), vec!["good"]);
        assert!(matches!(m.to_json("garbage"), Err(EntryError::NotFound(_))));
        let index = json_of(&m.index_to_json().unwrap());
        assert_eq!(index.as_array().unwrap().len(), 1);

        // The skipped value stays until a commit overwrites it.
        assert_eq!(h.store.read("garbage").unwrap(), b"not json");
        m.add_item("garbage", "s", br#"{"id":"1"}"#).unwrap();
        assert_eq!(
            json_of(&h.store.read("garbage").unwrap()),
            json!({"s": [{"id": "1"}]})
        );
    }

    #[test]
    fn load_hashes_canonical_form() {
        let spaced = br#"{ "cards" : [ { "id" : "1" , "code" : "1212" } ] }"#;
        let h = harness_with(InMemoryKvStore::with_entries([("f", spaced.to_vec())]));
        let doc = h.manager.to_json("f").unwrap();
        assert_eq!(&doc[..], br#"{"cards":[{"id":"1","code":"1212"}]}"#);
        assert_eq!(
            h.manager.hash_of("f").unwrap().unwrap().to_hex(),
            md5_hex(&doc)
        );
    }

    #[test]
    fn load_of_empty_store() {
        let h = harness();
        assert_eq!(h.manager.load_report(), LoadReport::default());
        assert_eq!(h.manager.len().unwrap(), 0);
        assert_eq!(&h.manager.index_to_json().unwrap()[..], b"[]");
    }

    #[test]
    fn close_closes_store() {
        let h = harness();
        h.manager.add_item("e", "s", br#"{"id":"1"}"#).unwrap();
        h.manager.close().unwrap();
        let err = h.manager.add_item("e", "s", br#"{"id":"2"}"#).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Unavailable);
        assert!(h.manager.contains("e").unwrap());
    }

    // ---------------------------------------------------------------
    // Concurrency
    // ---------------------------------------------------------------

    #[test]
    fn concurrent_writers_and_readers() {
        let h = harness();
        let manager = Arc::new(h.manager);
        let mut handles = Vec::new();

        for t in 0..4 {
            let m = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                let entry = format!("entry-{t}");
                for i in 0..25 {
                    let item = format!(r#"{{"id":"{i}","t":{t}}}"#);
                    m.add_item(&entry, "items", item.as_bytes()).unwrap();
                }
            }));
        }
        for _ in 0..2 {
            let m = Arc::clone(&manager);
            handles.push(thread::spawn(move || {
                for _ in 0..50 {
                    let index = m.index_to_json().unwrap();
                    let _: Value = serde_json::from_slice(&index).unwrap();
                    if let Ok(doc) = m.to_json("entry-0") {
                        let _: Value = serde_json::from_slice(&doc).unwrap();
                    }
                }
            }));
        }
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(manager.len().unwrap(), 4);
        for t in 0..4 {
            let name = format!("entry-{t}");
            let doc = json_of(&manager.to_json(&name).unwrap());
            assert_eq!(doc["items"].as_array().unwrap().len(), 25);
            assert_eq!(
                manager.hash_of(&name).unwrap().unwrap().to_hex(),
                md5_hex(&h.store.read(&name).unwrap())
            );
        }
    }
}
