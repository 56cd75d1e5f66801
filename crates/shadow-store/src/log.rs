//! Embedded log-structured store.
//!
//! Every write or delete appends one framed record to a single log file.
//! An in-memory key directory maps each live key to the frame holding its
//! latest value, so reads cost one seek. Superseded frames are reclaimed by
//! compaction, which rewrites the live records into a fresh log.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::SyncMode;
use crate::error::{StoreError, StoreResult};
use crate::file::sync_dir;
use crate::traits::KvStore;

/// Name of the log file inside the store directory.
pub const LOG_FILE_NAME: &str = "shadow.log";

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// One logged mutation.
///
/// On-disk frame:
/// ```text
/// [4 bytes: payload length (little-endian u32)]
/// [4 bytes: CRC32 of payload (little-endian u32)]
/// [N bytes: payload (bincode-serialized LogRecord)]
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogRecord {
    Put { key: String, value: Vec<u8> },
    Delete { key: String },
}

impl LogRecord {
    /// The key this record mutates.
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// Tuning knobs for [`LogKvStore`].
#[derive(Clone, Debug)]
pub struct LogOptions {
    /// Flush/sync strategy for appends.
    pub sync: SyncMode,
    /// Dead bytes tolerated before an automatic compaction; `0` disables it.
    pub compaction_threshold: u64,
}

impl Default for LogOptions {
    fn default() -> Self {
        Self {
            sync: SyncMode::default(),
            compaction_threshold: 4 * 1024 * 1024, // 4 MiB
        }
    }
}

/// Location of a live value in the log.
#[derive(Clone, Copy, Debug)]
struct Slot {
    /// Offset of the frame header.
    offset: u64,
    /// Payload length.
    len: u32,
}

impl Slot {
    fn frame_len(&self) -> u64 {
        HEADER_SIZE as u64 + self.len as u64
    }
}

/// How replay treats a damaged frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ReplayMode {
    /// Any damage is a `StoreError::Corrupted`.
    Strict,
    /// Skip bad frames; stop at a torn tail.
    Lenient,
}

/// Result of replaying a log image.
struct Replay {
    keydir: HashMap<String, Slot>,
    dead_bytes: u64,
    skipped: usize,
}

struct LogState {
    file: File,
    keydir: HashMap<String, Slot>,
    /// Current end of the log.
    end: u64,
    /// Bytes held by superseded frames and tombstones.
    dead_bytes: u64,
}

/// Embedded log-structured single-file store.
///
/// Opening replays the log strictly. If the log is damaged (bad CRC,
/// undecodable payload, torn tail), exactly one recovery pass runs: the good
/// frames are kept, the damaged ones dropped, and the log is rewritten. If
/// recovery fails too, the error surfaces from [`LogKvStore::open`].
pub struct LogKvStore {
    dir: PathBuf,
    path: PathBuf,
    options: LogOptions,
    state: Mutex<Option<LogState>>,
}

impl LogKvStore {
    /// Open (or create) a log store in `dir`.
    pub fn open(dir: impl AsRef<Path>, options: LogOptions) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        let path = dir.join(LOG_FILE_NAME);

        let state = match load_state(&path) {
            Ok(state) => state,
            Err(e) if e.is_corrupted() => {
                warn!(path = %path.display(), error = %e, "log corrupted; attempting recovery");
                recover(&dir, &path)?
            }
            Err(e) => return Err(e),
        };

        debug!(
            path = %path.display(),
            keys = state.keydir.len(),
            bytes = state.end,
            "log store opened"
        );
        Ok(Self {
            dir,
            path,
            options,
            state: Mutex::new(Some(state)),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of live keys (0 once closed).
    pub fn len(&self) -> usize {
        self.lock()
            .ok()
            .and_then(|state| state.as_ref().map(|s| s.keydir.len()))
            .unwrap_or(0)
    }

    /// Returns `true` if no live keys remain.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes held by superseded frames and tombstones.
    pub fn dead_bytes(&self) -> u64 {
        self.lock()
            .ok()
            .and_then(|state| state.as_ref().map(|s| s.dead_bytes))
            .unwrap_or(0)
    }

    /// Rewrite the log so it holds only the latest value of each live key.
    pub fn compact(&self) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let state = guard.as_mut().ok_or_else(closed)?;
        self.compact_locked(state)
    }

    fn compact_locked(&self, state: &mut LogState) -> StoreResult<()> {
        let before = state.end;
        let mut keys: Vec<&String> = state.keydir.keys().collect();
        keys.sort();
        let mut live = Vec::with_capacity(keys.len());
        for key in keys {
            let value = read_value(&state.file, &self.path, key, state.keydir[key])?;
            live.push((key.clone(), value));
        }

        *state = rewrite(&self.dir, &self.path, live)?;

        info!(before, after = state.end, "log compacted");
        Ok(())
    }

    fn append(&self, state: &mut LogState, record: &LogRecord) -> StoreResult<Slot> {
        let frame = encode_frame(record)?;
        let slot = Slot {
            offset: state.end,
            len: (frame.len() - HEADER_SIZE) as u32,
        };

        let written = state.file.write_all(&frame).and_then(|()| match self.options.sync {
            SyncMode::EveryWrite => state.file.sync_all(),
            SyncMode::OsDefault => Ok(()),
        });
        if let Err(e) = written {
            // Drop a torn frame so later appends stay parseable.
            if let Err(trunc) = state.file.set_len(state.end) {
                warn!(error = %trunc, "failed to truncate torn log frame");
            }
            return Err(e.into());
        }

        state.end += frame.len() as u64;
        Ok(slot)
    }

    /// Compact past the threshold. The triggering record is already durable,
    /// so a failed compaction is logged rather than returned.
    fn maybe_compact(&self, state: &mut LogState) {
        let threshold = self.options.compaction_threshold;
        if threshold > 0 && state.dead_bytes >= threshold {
            if let Err(e) = self.compact_locked(state) {
                warn!(path = %self.path.display(), error = %e, "automatic compaction failed");
            }
        }
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Option<LogState>>> {
        self.state
            .lock()
            .map_err(|e| StoreError::Unavailable(format!("lock poisoned: {e}")))
    }
}

fn closed() -> StoreError {
    StoreError::Unavailable("log store is closed".into())
}

impl KvStore for LogKvStore {
    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        let guard = self.lock()?;
        let state = guard.as_ref().ok_or_else(closed)?;
        let slot = *state
            .keydir
            .get(key)
            .ok_or_else(|| StoreError::NotFound(key.to_string()))?;
        read_value(&state.file, &self.path, key, slot)
    }

    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let state = guard.as_mut().ok_or_else(closed)?;
        let record = LogRecord::Put {
            key: key.to_string(),
            value: value.to_vec(),
        };
        let slot = self.append(state, &record)?;
        if let Some(old) = state.keydir.insert(key.to_string(), slot) {
            state.dead_bytes += old.frame_len();
        }
        debug!(key, bytes = value.len(), offset = slot.offset, "log append");
        self.maybe_compact(state);
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let mut guard = self.lock()?;
        let state = guard.as_mut().ok_or_else(closed)?;
        if !state.keydir.contains_key(key) {
            return Ok(());
        }
        let record = LogRecord::Delete {
            key: key.to_string(),
        };
        let slot = self.append(state, &record)?;
        if let Some(old) = state.keydir.remove(key) {
            state.dead_bytes += old.frame_len();
        }
        state.dead_bytes += slot.frame_len();
        self.maybe_compact(state);
        Ok(())
    }

    fn scan_all(&self) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        let guard = self.lock()?;
        let state = guard.as_ref().ok_or_else(closed)?;
        let mut values = BTreeMap::new();
        for (key, slot) in &state.keydir {
            let value = read_value(&state.file, &self.path, key, *slot)?;
            values.insert(key.clone(), value);
        }
        Ok(values)
    }

    fn close(&self) -> StoreResult<()> {
        if let Some(state) = self.lock()?.take() {
            state.file.sync_all()?;
            debug!(path = %self.path.display(), "log store closed");
        }
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        let guard = self.lock()?;
        let state = guard.as_ref().ok_or_else(closed)?;
        Ok(state.keydir.contains_key(key))
    }
}

impl std::fmt::Debug for LogKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogKvStore")
            .field("path", &self.path)
            .field("key_count", &self.len())
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Framing and replay
// ---------------------------------------------------------------------------

fn encode_frame(record: &LogRecord) -> StoreResult<Vec<u8>> {
    let payload =
        bincode::serialize(record).map_err(|e| StoreError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| StoreError::Serialization(format!("record too large: {} bytes", payload.len())))?;

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&length.to_le_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_le_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn u32_at(bytes: &[u8], at: usize) -> u32 {
    u32::from_le_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

fn corrupted(path: &Path, offset: u64, reason: impl Into<String>) -> StoreError {
    StoreError::Corrupted {
        path: path.to_path_buf(),
        offset,
        reason: reason.into(),
    }
}

/// Read and verify the frame at `slot`, returning the stored value.
fn read_value(file: &File, path: &Path, key: &str, slot: Slot) -> StoreResult<Vec<u8>> {
    let mut frame = vec![0u8; slot.frame_len() as usize];
    let mut reader = file;
    reader.seek(SeekFrom::Start(slot.offset))?;
    reader.read_exact(&mut frame)?;

    let payload = &frame[HEADER_SIZE..];
    if crc32fast::hash(payload) != u32_at(&frame, 4) {
        return Err(corrupted(path, slot.offset, "CRC mismatch on read"));
    }
    match bincode::deserialize::<LogRecord>(payload) {
        Ok(LogRecord::Put { key: stored, value }) if stored == key => Ok(value),
        Ok(_) => Err(corrupted(path, slot.offset, format!("frame does not hold key {key:?}"))),
        Err(e) => Err(corrupted(path, slot.offset, e.to_string())),
    }
}

/// Rebuild the key directory from a log image.
fn replay(path: &Path, data: &[u8], mode: ReplayMode) -> StoreResult<Replay> {
    let mut keydir: HashMap<String, Slot> = HashMap::new();
    let mut dead_bytes = 0u64;
    let mut skipped = 0usize;
    let mut offset = 0usize;

    while offset < data.len() {
        let remaining = data.len() - offset;
        if remaining < HEADER_SIZE {
            if mode == ReplayMode::Strict {
                return Err(corrupted(path, offset as u64, "torn frame header"));
            }
            warn!(offset, remaining, "torn frame header; stopping replay");
            break;
        }

        let length = u32_at(data, offset);
        let expected_crc = u32_at(data, offset + 4);
        let frame_len = HEADER_SIZE + length as usize;
        if length == 0 || frame_len > remaining {
            if mode == ReplayMode::Strict {
                return Err(corrupted(path, offset as u64, format!("invalid frame length {length}")));
            }
            warn!(offset, length, "invalid frame length; stopping replay");
            break;
        }

        let payload = &data[offset + HEADER_SIZE..offset + frame_len];
        let actual_crc = crc32fast::hash(payload);
        let record = if actual_crc != expected_crc {
            Err(format!("CRC mismatch: expected {expected_crc:#010x}, got {actual_crc:#010x}"))
        } else {
            bincode::deserialize::<LogRecord>(payload).map_err(|e| e.to_string())
        };

        match record {
            Ok(record) => {
                let slot = Slot {
                    offset: offset as u64,
                    len: length,
                };
                match record {
                    LogRecord::Put { key, .. } => {
                        if let Some(old) = keydir.insert(key, slot) {
                            dead_bytes += old.frame_len();
                        }
                    }
                    LogRecord::Delete { key } => {
                        if let Some(old) = keydir.remove(&key) {
                            dead_bytes += old.frame_len();
                        }
                        dead_bytes += slot.frame_len();
                    }
                }
            }
            Err(reason) if mode == ReplayMode::Strict => {
                return Err(corrupted(path, offset as u64, reason));
            }
            Err(reason) => {
                warn!(offset, %reason, "skipping damaged frame");
                skipped += 1;
            }
        }
        offset += frame_len;
    }

    Ok(Replay {
        keydir,
        dead_bytes,
        skipped,
    })
}

fn open_log_file(path: &Path) -> StoreResult<File> {
    Ok(OpenOptions::new()
        .create(true)
        .read(true)
        .append(true)
        .open(path)?)
}

/// Open the log file and replay it strictly.
fn load_state(path: &Path) -> StoreResult<LogState> {
    let file = open_log_file(path)?;
    let data = fs::read(path)?;
    let replay = replay(path, &data, ReplayMode::Strict)?;
    Ok(LogState {
        file,
        keydir: replay.keydir,
        end: data.len() as u64,
        dead_bytes: replay.dead_bytes,
    })
}

/// Write `records` as a fresh log and atomically replace `path` with it.
///
/// The new log is opened and replayed before the rename, so on any error the
/// log at `path` and every handle to it are untouched. The returned state
/// holds a handle that follows the file to `path`.
fn rewrite(dir: &Path, path: &Path, records: Vec<(String, Vec<u8>)>) -> StoreResult<LogState> {
    let mut temp = tempfile::NamedTempFile::new_in(dir)?;
    for (key, value) in records {
        let frame = encode_frame(&LogRecord::Put { key, value })?;
        temp.write_all(&frame)?;
    }
    temp.as_file().sync_all()?;
    let state = load_state(temp.path())?;
    temp.persist(path).map_err(|e| StoreError::Io(e.error))?;

    // Old and new logs hold the same live values.
    if let Err(e) = sync_dir(dir) {
        warn!(dir = %dir.display(), error = %e, "failed to sync log directory");
    }
    Ok(state)
}

/// Salvage the readable frames of a damaged log and rewrite it.
fn recover(dir: &Path, path: &Path) -> StoreResult<LogState> {
    let data = fs::read(path)?;
    let replay = replay(path, &data, ReplayMode::Lenient)?;

    let mut keys: Vec<&String> = replay.keydir.keys().collect();
    keys.sort();
    let mut live = Vec::with_capacity(keys.len());
    for key in keys {
        let slot = replay.keydir[key];
        let start = slot.offset as usize + HEADER_SIZE;
        let payload = &data[start..start + slot.len as usize];
        if let Ok(LogRecord::Put { value, .. }) = bincode::deserialize::<LogRecord>(payload) {
            live.push((key.clone(), value));
        }
    }

    let kept = live.len();
    let state = rewrite(dir, path, live)?;
    info!(
        path = %path.display(),
        kept,
        skipped = replay.skipped,
        "log recovered"
    );
    Ok(state)
}
