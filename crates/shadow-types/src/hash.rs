use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Digest of an entry's serialized bytes.
///
/// The digest length depends on the algorithm that produced it (16 bytes for
/// MD5, 32 for BLAKE3). A `ContentHash` is only ever compared for equality:
/// it lets callers notice that an entry changed without fetching its body.
/// It is not an integrity check.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHash(Box<[u8]>);

impl ContentHash {
    /// Wrap a finished digest.
    pub fn from_digest(digest: impl Into<Box<[u8]>>) -> Self {
        Self(digest.into())
    }

    /// The raw digest bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Digest length in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` for a zero-length digest.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Lowercase hex representation.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..self.0.len().min(4)])
    }

    /// Parse from a hex string. Upper-case input is accepted.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.is_empty() {
            return Err(TypeError::EmptyDigest);
        }
        Ok(Self(bytes.into_boxed_slice()))
    }
}

impl fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentHash({})", self.short_hex())
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for ContentHash {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl Serialize for ContentHash {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ContentHash {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_is_lowercase() {
        let hash = ContentHash::from_digest(vec![0xAB, 0xCD, 0x01]);
        assert_eq!(hash.to_hex(), "abcd01");
        assert_eq!(hash.to_string(), "abcd01");
    }

    #[test]
    fn from_hex_accepts_uppercase() {
        let lower = ContentHash::from_hex("9b97f3aa").unwrap();
        let upper = ContentHash::from_hex("9B97F3AA").unwrap();
        assert_eq!(lower, upper);
        assert_eq!(upper.to_hex(), "9b97f3aa");
    }

    #[test]
    fn from_hex_rejects_garbage() {
        assert!(matches!(
            ContentHash::from_hex("not-hex"),
            Err(TypeError::InvalidHex(_))
        ));
        assert_eq!(ContentHash::from_hex(""), Err(TypeError::EmptyDigest));
    }

    #[test]
    fn short_hex_handles_short_digests() {
        let hash = ContentHash::from_digest(vec![0x01, 0x02]);
        assert_eq!(hash.short_hex(), "0102");
        let long = ContentHash::from_digest(vec![0xff; 16]);
        assert_eq!(long.short_hex(), "ffffffff");
    }

    #[test]
    fn serializes_as_hex_string() {
        let hash = ContentHash::from_digest(vec![0x9d, 0x2f]);
        let json = serde_json::to_string(&hash).unwrap();
        assert_eq!(json, "\"9d2f\"");
        let parsed: ContentHash = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, hash);
    }

    #[test]
    fn parse_via_from_str() {
        let hash: ContentHash = "00ff".parse().unwrap();
        assert_eq!(hash.as_bytes(), &[0x00, 0xff]);
        assert_eq!(hash.len(), 2);
        assert!(!hash.is_empty());
    }
}
