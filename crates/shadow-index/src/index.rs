//! The [`Index`] structure: entry name to content hash.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use shadow_types::ContentHash;

use crate::error::{IndexError, IndexResult};

/// One element of the serialized index.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexRecord {
    /// Entry name.
    pub name: String,
    /// Digest of the entry's serialized document, lowercase hex.
    pub hash: ContentHash,
}

/// Catalog of every entry's content hash.
///
/// Entries are kept sorted by name, so serialization order is stable for the
/// life of the process (and across processes).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Index {
    hashes: BTreeMap<String, ContentHash>,
}

impl Index {
    /// Create an empty index.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the hash for `name`, replacing any previous one.
    pub fn add(&mut self, name: impl Into<String>, hash: ContentHash) {
        self.hashes.insert(name.into(), hash);
    }

    /// Drop `name`. Returns the removed hash, if there was one.
    pub fn remove(&mut self, name: &str) -> Option<ContentHash> {
        self.hashes.remove(name)
    }

    /// Hash recorded for `name`.
    pub fn get(&self, name: &str) -> Option<&ContentHash> {
        self.hashes.get(name)
    }

    /// Number of indexed entries.
    pub fn len(&self) -> usize {
        self.hashes.len()
    }

    /// Returns `true` if no entry is indexed.
    pub fn is_empty(&self) -> bool {
        self.hashes.is_empty()
    }

    /// Iterate `(name, hash)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ContentHash)> {
        self.hashes.iter().map(|(name, hash)| (name.as_str(), hash))
    }

    /// The index as a list of records, in name order.
    pub fn records(&self) -> Vec<IndexRecord> {
        self.iter()
            .map(|(name, hash)| IndexRecord {
                name: name.to_string(),
                hash: hash.clone(),
            })
            .collect()
    }

    /// Serialize as a JSON array of `{"name", "hash"}` objects.
    pub fn to_json(&self) -> IndexResult<Vec<u8>> {
        serde_json::to_vec(&self.records()).map_err(|e| IndexError::Serialization(e.to_string()))
    }
}

impl FromIterator<(String, ContentHash)> for Index {
    fn from_iter<I: IntoIterator<Item = (String, ContentHash)>>(iter: I) -> Self {
        Self {
            hashes: iter.into_iter().collect(),
        }
    }
}
