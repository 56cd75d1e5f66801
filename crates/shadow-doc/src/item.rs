use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::{DocError, DocResult};

/// Name of the mandatory identifying field.
pub const ID_FIELD: &str = "id";

/// Case-insensitive id comparison under simple Unicode case folding.
///
/// Ids are compared character by character; two characters match when they
/// are equal or share a lowercase or an uppercase form. `ς`, `σ` and `Σ`
/// all match, while `ß` never matches `SS`.
pub fn ids_match(a: &str, b: &str) -> bool {
    if a.is_ascii() && b.is_ascii() {
        return a.eq_ignore_ascii_case(b);
    }
    let mut left = a.chars();
    let mut right = b.chars();
    loop {
        match (left.next(), right.next()) {
            (None, None) => return true,
            (Some(x), Some(y)) if chars_fold_equal(x, y) => {}
            _ => return false,
        }
    }
}

fn chars_fold_equal(x: char, y: char) -> bool {
    x == y || x.to_lowercase().eq(y.to_lowercase()) || x.to_uppercase().eq(y.to_uppercase())
}

/// One item of a section: a string `id` plus any other fields.
///
/// The remaining fields are kept as opaque JSON in their original order, so
/// unknown fields survive a load/store cycle. Serialization writes `id`
/// first.
#[derive(Clone, Debug, PartialEq)]
pub struct Item {
    id: String,
    fields: Map<String, Value>,
}

impl Item {
    /// Create an item. An `id` key inside `fields` is dropped in favor of `id`.
    pub fn new(id: impl Into<String>, fields: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            fields: fields.into_iter().filter(|(k, _)| k != ID_FIELD).collect(),
        }
    }

    /// Decode an item from JSON bytes.
    ///
    /// Fails with [`DocError::Decode`] unless the bytes are a JSON object,
    /// and with [`DocError::MissingId`] unless that object has a string `id`.
    pub fn from_slice(bytes: &[u8]) -> DocResult<Self> {
        let map: Map<String, Value> =
            serde_json::from_slice(bytes).map_err(|e| DocError::Decode(e.to_string()))?;
        Self::try_from(map)
    }

    /// The item's id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Every field except `id`.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    /// Look up a field other than `id`.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.fields.get(field)
    }

    /// Returns `true` if this item's id matches `id` case-insensitively.
    pub fn matches_id(&self, id: &str) -> bool {
        ids_match(&self.id, id)
    }

    /// Convert into a JSON object value.
    pub fn into_value(self) -> Value {
        let mut map = Map::with_capacity(self.fields.len() + 1);
        map.insert(ID_FIELD.to_string(), Value::String(self.id));
        map.extend(self.fields);
        Value::Object(map)
    }
}

impl TryFrom<Map<String, Value>> for Item {
    type Error = DocError;

    fn try_from(map: Map<String, Value>) -> DocResult<Self> {
        let mut id = None;
        let mut fields = Map::with_capacity(map.len().saturating_sub(1));
        for (key, value) in map {
            if key == ID_FIELD {
                id = Some(value);
            } else {
                fields.insert(key, value);
            }
        }
        match id {
            Some(Value::String(id)) => Ok(Self { id, fields }),
            _ => Err(DocError::MissingId),
        }
    }
}

impl Serialize for Item {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len() + 1))?;
        map.serialize_entry(ID_FIELD, &self.id)?;
        for (key, value) in &self.fields {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for Item {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let map = Map::<String, Value>::deserialize(deserializer)?;
        Self::try_from(map).map_err(serde::de::Error::custom)
    }
}
