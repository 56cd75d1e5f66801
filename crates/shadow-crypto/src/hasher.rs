use std::fmt;

use md5::{Digest, Md5};
use serde::{Deserialize, Serialize};
use shadow_types::ContentHash;

/// Digest algorithm used for index hashes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashAlgorithm {
    /// 128-bit MD5, hex-encoded to 32 characters.
    #[default]
    Md5,
    /// 256-bit BLAKE3, hex-encoded to 64 characters.
    Blake3,
}

impl HashAlgorithm {
    /// Digest length in bytes.
    pub fn digest_len(&self) -> usize {
        match self {
            Self::Md5 => 16,
            Self::Blake3 => 32,
        }
    }
}

impl fmt::Display for HashAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Md5 => write!(f, "md5"),
            Self::Blake3 => write!(f, "blake3"),
        }
    }
}

impl std::str::FromStr for HashAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "md5" => Ok(Self::Md5),
            "blake3" => Ok(Self::Blake3),
            other => Err(format!("unknown hash algorithm: {other}")),
        }
    }
}

/// Hashes serialized entry bytes into a [`ContentHash`].
///
/// Unlike an object-store hasher there is no domain tag: the digest must
/// equal the plain digest of the bytes served by `getEntry`, so a client can
/// recompute it from the body it fetched.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ContentHasher {
    algorithm: HashAlgorithm,
}

impl ContentHasher {
    /// MD5 hasher (the default).
    pub const MD5: Self = Self {
        algorithm: HashAlgorithm::Md5,
    };
    /// BLAKE3 hasher.
    pub const BLAKE3: Self = Self {
        algorithm: HashAlgorithm::Blake3,
    };

    /// Create a hasher for the given algorithm.
    pub const fn new(algorithm: HashAlgorithm) -> Self {
        Self { algorithm }
    }

    /// The algorithm used by this hasher.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Hash raw bytes.
    pub fn hash(&self, data: &[u8]) -> ContentHash {
        match self.algorithm {
            HashAlgorithm::Md5 => ContentHash::from_digest(Md5::digest(data).to_vec()),
            HashAlgorithm::Blake3 => {
                ContentHash::from_digest(blake3::hash(data).as_bytes().to_vec())
            }
        }
    }

    /// Check that `data` hashes to `expected`.
    pub fn verify(&self, data: &[u8], expected: &ContentHash) -> bool {
        self.hash(data) == *expected
    }
}
