use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::StoreResult;
use crate::file::FileKvStore;
use crate::log::{LogKvStore, LogOptions};
use crate::memory::InMemoryKvStore;
use crate::traits::KvStore;

/// Flush/sync strategy for appends.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    /// `fsync` after every write (durable before `write` returns).
    #[default]
    EveryWrite,
    /// Rely on OS page-cache buffering (fastest, least durable).
    OsDefault,
}

/// Which [`KvStore`] implementation to open.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// [`LogKvStore`].
    #[default]
    Log,
    /// [`FileKvStore`].
    File,
    /// [`InMemoryKvStore`]; nothing survives the process.
    Memory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Log => write!(f, "log"),
            Self::File => write!(f, "file"),
            Self::Memory => write!(f, "memory"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "log" => Ok(Self::Log),
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(format!("unknown store backend: {other}")),
        }
    }
}

/// Store section of the service configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: BackendKind,
    /// Store directory.
    pub path: PathBuf,
    pub sync: SyncMode,
    /// Dead bytes tolerated in the log before compaction; `0` disables it.
    pub compaction_threshold: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let log = LogOptions::default();
        Self {
            backend: BackendKind::default(),
            path: PathBuf::from("/app/db"),
            sync: log.sync,
            compaction_threshold: log.compaction_threshold,
        }
    }
}

/// Open the backend described by `config`.
pub fn open_store(config: &StoreConfig) -> StoreResult<Box<dyn KvStore>> {
    let store: Box<dyn KvStore> = match config.backend {
        BackendKind::Log => Box::new(LogKvStore::open(
            &config.path,
            LogOptions {
                sync: config.sync,
                compaction_threshold: config.compaction_threshold,
            },
        )?),
        BackendKind::File => Box::new(FileKvStore::open(&config.path)?),
        BackendKind::Memory => Box::new(InMemoryKvStore::new()),
    };
    info!(backend = %config.backend, path = %config.path.display(), "store opened");
    Ok(store)
}
