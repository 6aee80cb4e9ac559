use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Content-addressed identifier for an uploaded blob.
///
/// A `BlobId` is the lowercase hex encoding of the BLAKE3 digest of the
/// blob's exact bytes. Identical bytes always produce the same `BlobId`, so
/// uploads deduplicate for free and a stored blob whose bytes no longer hash
/// to its ID is corrupt.
///
/// Parsing accepts any non-empty, even-length, lowercase hex string so that
/// objects written under a different digest length still list and delete.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BlobId(String);

impl BlobId {
    /// Compute the `BlobId` of raw bytes. Pure, no I/O.
    pub fn compute(data: &[u8]) -> Self {
        Self(blake3::hash(data).to_hex().to_string())
    }

    /// Parse and validate a hex identifier.
    pub fn parse(s: &str) -> Result<Self, TypeError> {
        let invalid = |reason: &str| TypeError::InvalidBlobId {
            value: s.to_string(),
            reason: reason.to_string(),
        };
        if s.is_empty() {
            return Err(invalid("must not be empty"));
        }
        if !s.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f')) {
            return Err(invalid("must be lowercase hex"));
        }
        if s.len() % 2 != 0 {
            return Err(invalid("must have an even number of hex digits"));
        }
        Ok(Self(s.to_string()))
    }

    /// The hex string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short form (first 8 characters) for log lines.
    pub fn short(&self) -> &str {
        &self.0[..self.0.len().min(8)]
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.short())
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for BlobId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for BlobId {
    type Error = TypeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<BlobId> for String {
    fn from(id: BlobId) -> Self {
        id.0
    }
}

impl AsRef<str> for BlobId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Incremental digest for content that arrives in chunks.
///
/// Produces the same [`BlobId`] as [`BlobId::compute`] over the concatenated
/// chunks.
#[derive(Default)]
pub struct BlobHasher {
    inner: blake3::Hasher,
    len: u64,
}

impl BlobHasher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.inner.update(chunk);
        self.len += chunk.len() as u64;
    }

    /// Number of bytes hashed so far.
    pub fn len(&self) -> u64 {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn finalize(&self) -> BlobId {
        BlobId(self.inner.finalize().to_hex().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn compute_is_deterministic() {
        let id1 = BlobId::compute(b"hello world");
        let id2 = BlobId::compute(b"hello world");
        assert_eq!(id1, id2);
        assert_eq!(id1.as_str().len(), 64);
    }

    #[test]
    fn different_data_produces_different_ids() {
        assert_ne!(BlobId::compute(b"hello"), BlobId::compute(b"world"));
    }

    #[test]
    fn compute_matches_blake3_hex() {
        let expected = blake3::hash(b"abc").to_hex().to_string();
        assert_eq!(BlobId::compute(b"abc").as_str(), expected);
    }

    #[test]
    fn parse_accepts_computed_ids() {
        let id = BlobId::compute(b"x");
        assert_eq!(BlobId::parse(id.as_str()).unwrap(), id);
    }

    #[test]
    fn parse_rejects_bad_input() {
        assert!(BlobId::parse("").is_err());
        assert!(BlobId::parse("ABCD").is_err());
        assert!(BlobId::parse("abc").is_err());
        assert!(BlobId::parse("../etc").is_err());
        assert!(BlobId::parse(".tmp-1234").is_err());
        assert!(BlobId::parse("abc123").is_ok());
    }

    #[test]
    fn short_is_prefix() {
        let id = BlobId::compute(b"short");
        assert_eq!(id.short().len(), 8);
        assert!(id.as_str().starts_with(id.short()));
        assert_eq!(BlobId::parse("ab").unwrap().short(), "ab");
    }

    #[test]
    fn serde_is_plain_string() {
        let id = BlobId::compute(b"serde");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
        let back: BlobId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<BlobId>("\"NOT-HEX\"").is_err());
    }

    #[test]
    fn hasher_matches_one_shot() {
        let mut hasher = BlobHasher::new();
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(hasher.len(), 11);
        assert_eq!(hasher.finalize(), BlobId::compute(b"hello world"));
    }

    proptest! {
        #[test]
        fn chunked_hash_equals_whole(data in proptest::collection::vec(any::<u8>(), 0..2048), split in 0usize..2048) {
            let split = split.min(data.len());
            let mut hasher = BlobHasher::new();
            hasher.update(&data[..split]);
            hasher.update(&data[split..]);
            prop_assert_eq!(hasher.finalize(), BlobId::compute(&data));
        }

        #[test]
        fn computed_ids_always_parse(data in proptest::collection::vec(any::<u8>(), 0..256)) {
            let id = BlobId::compute(&data);
            prop_assert!(BlobId::parse(id.as_str()).is_ok());
        }
    }
}
