//! Persistent key-value backends for the shadow document store.
//!
//! The entry layer writes every committed document through to a [`KvStore`].
//! The store maps an entry name to that entry's serialized bytes and never
//! interprets them.
//!
//! # Storage Backends
//!
//! - [`LogKvStore`] -- embedded log-structured single-file store (default)
//! - [`FileKvStore`] -- plain directory, one `<key>.json` file per key
//! - [`InMemoryKvStore`] -- `HashMap`-based store for tests and embedding
//!
//! # Design Rules
//!
//! 1. `write` is durable before it returns success (except where a backend
//!    is configured with [`SyncMode::OsDefault`] or is in-memory).
//! 2. `read` of a missing key is [`StoreError::NotFound`]; `delete` of a
//!    missing key succeeds.
//! 3. After `close`, every operation fails with [`StoreError::Unavailable`].
//! 4. Access is mediated by a single writer (the entry layer); backends are
//!    still `Send + Sync` so they can sit behind an `Arc`.
//! 5. All I/O errors are propagated, never silently ignored.

pub mod config;
pub mod error;
pub mod file;
pub mod log;
pub mod memory;
pub mod traits;

pub use config::{open_store, BackendKind, StoreConfig, SyncMode};
pub use error::{StoreError, StoreResult};
pub use file::FileKvStore;
pub use log::{LogKvStore, LogOptions, LogRecord, LOG_FILE_NAME};
pub use memory::InMemoryKvStore;
pub use traits::KvStore;
