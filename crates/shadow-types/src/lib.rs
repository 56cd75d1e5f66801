//! Foundation types for the shadow document store.
//!
//! Every other shadow crate that needs to talk about content digests depends
//! on `shadow-types`.
//!
//! # Key Types
//!
//! - [`ContentHash`] -- digest of an entry's serialized bytes, rendered as
//!   lowercase hex

pub mod error;
pub mod hash;

pub use error::TypeError;
pub use hash::ContentHash;
