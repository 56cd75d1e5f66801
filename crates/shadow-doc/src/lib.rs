//! In-memory documents for the shadow document store.
//!
//! A [`Document`] maps section names to ordered lists of [`Item`]s. An item
//! is an open-ended JSON object with one mandatory string field, `id`; every
//! other field is carried through untouched.
//!
//! ```text
//! {
//!    "faces": [ { "id": "1", "no": "000001C-01B-01U-01F-0101R", ... } ],
//!    "cards": [ { "id": "1", "code": "12121212", ... } ]
//! }
//! ```
//!
//! Items are matched by `id` case-insensitively within a section. Documents
//! know nothing about persistence; the entry layer decides when to write
//! them through.

pub mod document;
pub mod error;
pub mod item;

pub use document::Document;
pub use error::{DocError, DocResult};
pub use item::{ids_match, Item, ID_FIELD};
