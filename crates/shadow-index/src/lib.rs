//! Content-hash index for the shadow document store.
//!
//! The index maps every entry name to the digest of that entry's serialized
//! document. Clients poll it to find out which entries changed without
//! fetching their bodies; nothing inside the store reads it back.
//!
//! # Key Types
//!
//! - [`Index`] -- the in-memory catalog (BTreeMap-backed, stable order)
//! - [`IndexRecord`] -- one `{name, hash}` element of the serialized form

pub mod error;
pub mod index;

pub use error::{IndexError, IndexResult};
pub use index::{Index, IndexRecord};
