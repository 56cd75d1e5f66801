use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{DocError, DocResult};
use crate::item::Item;

/// One entry's content: section name to ordered items.
///
/// Sections are kept sorted by name so serialization is deterministic; items
/// keep insertion order, except that a replaced item keeps its position.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    #[serde(deserialize_with = "sections_or_null")]
    sections: BTreeMap<String, Vec<Item>>,
}

/// A `null` section decodes as an empty one.
fn sections_or_null<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<Item>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Option<Vec<Item>>>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, items)| (name, items.unwrap_or_default()))
        .collect())
}

impl Document {
    /// Create an empty document.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode a document from its serialized form.
    pub fn from_slice(bytes: &[u8]) -> DocResult<Self> {
        serde_json::from_slice(bytes).map_err(|e| DocError::Decode(e.to_string()))
    }

    /// Replace the whole content with the decoded `bytes`.
    ///
    /// On failure the document is left unchanged.
    pub fn load(&mut self, bytes: &[u8]) -> DocResult<()> {
        *self = Self::from_slice(bytes)?;
        Ok(())
    }

    /// Decode `item` and add it to `section`.
    ///
    /// Returns the item it replaced, if any. Nothing changes on a decode
    /// error.
    pub fn add_item(&mut self, section: &str, item: &[u8]) -> DocResult<Option<Item>> {
        let item = Item::from_slice(item)?;
        Ok(self.insert_item(section, item))
    }

    /// Add an already decoded item to `section`.
    ///
    /// An existing item whose id matches case-insensitively is replaced in
    /// place and returned; otherwise the item is appended. A missing section
    /// is created.
    pub fn insert_item(&mut self, section: &str, item: Item) -> Option<Item> {
        let items = self.sections.entry(section.to_string()).or_default();
        match items.iter().position(|existing| existing.matches_id(item.id())) {
            Some(pos) => Some(std::mem::replace(&mut items[pos], item)),
            None => {
                items.push(item);
                None
            }
        }
    }

    /// Remove from `section` the first item whose id matches `id`.
    ///
    /// An empty `id` removes the whole section. Missing sections and
    /// unmatched ids are no-ops. Returns `true` if anything was removed.
    pub fn remove_item(&mut self, section: &str, id: &str) -> bool {
        if id.is_empty() {
            return self.sections.remove(section).is_some();
        }
        let Some(items) = self.sections.get_mut(section) else {
            return false;
        };
        match items.iter().position(|item| item.matches_id(id)) {
            Some(pos) => {
                items.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Returns `true` if no section holds any item.
    pub fn is_empty(&self) -> bool {
        self.sections.values().all(Vec::is_empty)
    }

    /// Items of `section`, if it exists.
    pub fn section(&self, section: &str) -> Option<&[Item]> {
        self.sections.get(section).map(Vec::as_slice)
    }

    /// Section names in serialization order.
    pub fn section_names(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(String::as_str)
    }

    /// Number of sections, empty ones included.
    pub fn len(&self) -> usize {
        self.sections.len()
    }

    /// Total number of items across sections.
    pub fn item_count(&self) -> usize {
        self.sections.values().map(Vec::len).sum()
    }

    /// Serialize to JSON bytes. The output round-trips through [`load`].
    ///
    /// [`load`]: Document::load
    pub fn to_json(&self) -> DocResult<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| DocError::Serialization(e.to_string()))
    }
}
