use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Fixed-length opaque key identifying a graph node.
///
/// A `GraphKey` is the SHA-256 hash of an entity's ordered identity fields.
/// Identical identity fields always produce the same key, which is what lets
/// independent producers converge on the same node without coordination.
///
/// The storage representation is lowercase hex (64 characters for 32 bytes),
/// applied uniformly to upsert keys, delete match keys, and join predicates.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GraphKey([u8; 32]);

impl GraphKey {
    /// Create a key from a pre-computed 32-byte hash.
    pub const fn from_hash(hash: [u8; 32]) -> Self {
        Self(hash)
    }

    /// The raw 32-byte key.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Hex-encoded storage representation.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters), for log lines.
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse a key from its hex storage representation.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        let bytes = hex::decode(s).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(TypeError::InvalidLength {
                expected: 32,
                actual: bytes.len(),
            });
        }
        let mut arr = [0u8; 32];
        arr.copy_from_slice(&bytes);
        Ok(Self(arr))
    }
}

impl fmt::Debug for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "GraphKey({})", self.short_hex())
    }
}

impl fmt::Display for GraphKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl From<[u8; 32]> for GraphKey {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl From<GraphKey> for [u8; 32] {
    fn from(key: GraphKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_roundtrip() {
        let key = GraphKey::from_hash([0xab; 32]);
        let hex = key.to_hex();
        assert_eq!(hex.len(), 64);
        let parsed = GraphKey::from_hex(&hex).unwrap();
        assert_eq!(key, parsed);
    }

    #[test]
    fn from_hex_rejects_bad_length() {
        let err = GraphKey::from_hex("abcd").unwrap_err();
        assert_eq!(
            err,
            TypeError::InvalidLength {
                expected: 32,
                actual: 2
            }
        );
    }

    #[test]
    fn from_hex_rejects_non_hex() {
        assert!(matches!(
            GraphKey::from_hex("zz"),
            Err(TypeError::InvalidHex(_))
        ));
    }

    #[test]
    fn short_hex_is_8_chars() {
        let key = GraphKey::from_hash([7; 32]);
        assert_eq!(key.short_hex().len(), 8);
    }

    #[test]
    fn display_is_full_hex() {
        let key = GraphKey::from_hash([1; 32]);
        assert_eq!(format!("{key}"), key.to_hex());
    }

    #[test]
    fn serde_roundtrip() {
        let key = GraphKey::from_hash([9; 32]);
        let json = serde_json::to_string(&key).unwrap();
        let parsed: GraphKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, parsed);
    }
}
