//! Entry orchestration for the shadow document store.
//!
//! [`EntryManager`] owns every entry's [`Document`](shadow_doc::Document),
//! the content-hash [`Index`](shadow_index::Index) and two derived caches
//! (serialized documents, serialized index). It is the only writer of the
//! backing [`KvStore`](shadow_store::KvStore).
//!
//! # Consistency Rules
//!
//! 1. A mutation is applied to a working copy of the document, persisted,
//!    and only then installed together with its index hash and cache bytes.
//!    A failed store write leaves documents, index and caches untouched.
//! 2. A document that becomes empty is deleted from the store, never
//!    written.
//! 3. Caches are memoization only. They are filled on commit or on first
//!    read and are always equal to a fresh serialization of current state.
//! 4. One `RwLock` guards all state. Mutations across all entries are
//!    serialized; reads run concurrently with each other.

pub mod error;
pub mod manager;

pub use error::{EntryError, EntryResult, ErrorKind};
pub use manager::{EntryManager, LoadReport};
