use std::collections::BTreeMap;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

use crate::error::{StoreError, StoreResult};
use crate::traits::KvStore;

/// File extension of every stored value.
const EXTENSION: &str = "json";

/// Directory-backed store: one `<key>.json` file per key.
///
/// Writes go to a temporary file in the same directory, are synced, and are
/// then renamed over the target. The directory is synced after every rename
/// or removal, so a reader never sees a partial value and the change is
/// durable once `write` or `delete` returns.
#[derive(Debug)]
pub struct FileKvStore {
    dir: PathBuf,
    open: AtomicBool,
}

impl FileKvStore {
    /// Open (or create) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> StoreResult<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "file store opened");
        Ok(Self {
            dir,
            open: AtomicBool::new(true),
        })
    }

    /// Root directory of the store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn ensure_open(&self) -> StoreResult<()> {
        if self.open.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(StoreError::Unavailable(format!(
                "file store {} is closed",
                self.dir.display()
            )))
        }
    }

    fn path_for(&self, key: &str) -> StoreResult<PathBuf> {
        validate_key(key)?;
        Ok(self.dir.join(format!("{key}.{EXTENSION}")))
    }
}

/// Flush directory metadata so a completed rename or unlink survives a crash.
#[cfg(unix)]
pub(crate) fn sync_dir(dir: &Path) -> io::Result<()> {
    fs::File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub(crate) fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// Keys become file names, so they must not escape the store directory or
/// collide with temporary files.
fn validate_key(key: &str) -> StoreResult<()> {
    let reason = if key.is_empty() {
        "key is empty"
    } else if key.starts_with('.') {
        "key must not start with '.'"
    } else if key.contains(['/', '\\', '\0']) {
        "key must not contain path separators or NUL"
    } else {
        return Ok(());
    };
    Err(StoreError::InvalidKey {
        key: key.to_string(),
        reason: reason.to_string(),
    })
}

impl KvStore for FileKvStore {
    fn read(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.ensure_open()?;
        let path = self.path_for(key)?;
        match fs::read(&path) {
            Ok(data) => Ok(data),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(StoreError::NotFound(key.to_string()))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.ensure_open()?;
        let path = self.path_for(key)?;

        // Same directory as the target so the rename stays on one filesystem.
        let mut temp = tempfile::NamedTempFile::new_in(&self.dir)?;
        temp.write_all(value)?;
        temp.as_file().sync_all()?;
        temp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        sync_dir(&self.dir)?;

        debug!(key, bytes = value.len(), "file store write");
        Ok(())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.ensure_open()?;
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(sync_dir(&self.dir)?),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn scan_all(&self) -> StoreResult<BTreeMap<String, Vec<u8>>> {
        self.ensure_open()?;
        let mut values = BTreeMap::new();
        for dir_entry in fs::read_dir(&self.dir)? {
            let dir_entry = dir_entry?;
            let path = dir_entry.path();
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            if path.extension().map(|e| e != EXTENSION).unwrap_or(true) {
                continue;
            }
            let Some(key) = path.file_stem().and_then(|s| s.to_str()) else {
                warn!(path = %path.display(), "skipping file with non UTF-8 name");
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }
            match fs::read(&path) {
                Ok(data) => {
                    values.insert(key.to_string(), data);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "skipping unreadable file");
                }
            }
        }
        Ok(values)
    }

    fn close(&self) -> StoreResult<()> {
        self.open.store(false, Ordering::Release);
        Ok(())
    }

    fn contains(&self, key: &str) -> StoreResult<bool> {
        self.ensure_open()?;
        Ok(self.path_for(key)?.is_file())
    }
}
