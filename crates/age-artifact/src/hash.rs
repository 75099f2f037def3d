//! Payload hashing primitives
//!
//! Provides [`PayloadHash`], a strongly-typed 32-byte Blake3 hash used to
//! pin artifact payloads, chain audit entries, and cross-reference applied
//! diffs.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// A 32-byte payload hash (Blake3)
///
/// Computed over the canonical JSON encoding of a payload. Immutable and
/// cheap to copy; two payloads are byte-identical iff their hashes match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PayloadHash([u8; 32]);

impl PayloadHash {
    /// Create a hash from raw bytes
    #[inline]
    #[must_use]
    pub const fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Reference to the underlying bytes
    #[inline]
    #[must_use]
    pub const fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Compute the Blake3 hash of arbitrary bytes
    #[inline]
    #[must_use]
    pub fn compute(data: &[u8]) -> Self {
        Self(*blake3::hash(data).as_bytes())
    }

    /// Compute the hash of a payload via its canonical JSON encoding
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    #[inline]
    pub fn of_payload<T: serde::Serialize>(payload: &T) -> Result<Self, HashError> {
        let bytes = serde_json::to_vec(payload)?;
        Ok(Self::compute(&bytes))
    }

    /// Short hex prefix (first 8 bytes), for log lines
    #[inline]
    #[must_use]
    pub fn short(&self) -> String {
        hex::encode(&self.0[..8])
    }

    /// All-zero sentinel used as the chain root of the audit log
    #[inline]
    #[must_use]
    pub const fn zero() -> Self {
        Self([0; 32])
    }

    /// True for the all-zero sentinel
    #[inline]
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        let mut i = 0;
        while i < 32 {
            if self.0[i] != 0 {
                return false;
            }
            i += 1;
        }
        true
    }
}

impl Display for PayloadHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", hex::encode(self.0))
    }
}

impl FromStr for PayloadHash {
    type Err = HashError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        if bytes.len() != 32 {
            return Err(HashError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl Default for PayloadHash {
    fn default() -> Self {
        Self::zero()
    }
}

impl serde::Serialize for PayloadHash {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> serde::Deserialize<'de> for PayloadHash {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Errors that can occur when working with payload hashes
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    /// Invalid hash length
    #[error("invalid hash length: expected {expected}, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    /// Hex decoding error
    #[error("hex decode error: {0}")]
    HexDecode(#[from] hex::FromHexError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compute_is_deterministic() {
        let h1 = PayloadHash::compute(b"payload bytes");
        let h2 = PayloadHash::compute(b"payload bytes");
        assert_eq!(h1, h2);
    }

    #[test]
    fn different_payloads_differ() {
        let h1 = PayloadHash::of_payload(&json!({"files": ["a.rs"]})).unwrap();
        let h2 = PayloadHash::of_payload(&json!({"files": ["b.rs"]})).unwrap();
        assert_ne!(h1, h2);
    }

    #[test]
    fn display_round_trips() {
        let hash = PayloadHash::compute(b"round trip");
        let parsed: PayloadHash = hash.to_string().parse().unwrap();
        assert_eq!(hash, parsed);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        let result = "abcd".parse::<PayloadHash>();
        assert!(matches!(result, Err(HashError::InvalidLength { .. })));
    }

    #[test]
    fn zero_sentinel() {
        assert!(PayloadHash::zero().is_zero());
        assert!(!PayloadHash::compute(b"x").is_zero());
    }

    #[test]
    fn short_is_hex_prefix() {
        let hash = PayloadHash::compute(b"short");
        let short = hash.short();
        assert_eq!(short.len(), 16);
        assert!(hash.to_string().starts_with(&short));
    }

    #[test]
    fn serde_json_round_trip() {
        let hash = PayloadHash::compute(b"serde");
        let encoded = serde_json::to_string(&hash).unwrap();
        let decoded: PayloadHash = serde_json::from_str(&encoded).unwrap();
        assert_eq!(hash, decoded);
    }
}
