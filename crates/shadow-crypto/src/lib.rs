//! Content hashing for the shadow document store.
//!
//! The index publishes one digest per entry so clients can detect changes
//! cheaply. MD5 is the default because existing clients compare against MD5
//! digests; BLAKE3 is available for deployments without that constraint.
//!
//! All hashing wraps established libraries; there is no custom cryptography.

pub mod hasher;

pub use hasher::{ContentHasher, HashAlgorithm};
