//! Hashing primitives for Sealchain
//!
//! Every seal in the ledger (transaction leaves, intermediate Merkle nodes and
//! block seals) is a SHA-256 digest wrapped in [`Seal`].

use crate::error::ChainError;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use std::fmt;

/// A cryptographic commitment to some content.
///
/// Seals are usually 32-byte SHA-256 digests, but the type accepts arbitrary
/// bytes so callers can use marker values (e.g. a genesis marker as the
/// previous seal of the first block).
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Seal(Vec<u8>);

impl Seal {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Seal(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    pub fn from_hex(hex_str: &str) -> Result<Self, ChainError> {
        hex::decode(hex_str)
            .map(Seal)
            .map_err(|e| ChainError::SerializationError(format!("Invalid hex seal: {}", e)))
    }
}

impl From<Vec<u8>> for Seal {
    fn from(bytes: Vec<u8>) -> Self {
        Seal(bytes)
    }
}

impl From<&[u8]> for Seal {
    fn from(bytes: &[u8]) -> Self {
        Seal(bytes.to_vec())
    }
}

impl AsRef<[u8]> for Seal {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for Seal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Seal({})", self.to_hex())
    }
}

impl fmt::Display for Seal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl Serialize for Seal {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        base64_bytes::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Seal {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        base64_bytes::deserialize(deserializer).map(Seal)
    }
}

/// Serde helpers encoding raw byte fields as base64 strings.
pub mod base64_bytes {
    use super::STANDARD;
    use base64::Engine as _;
    use serde::{de::Error as _, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded.as_bytes()).map_err(D::Error::custom)
    }
}

/// SHA-256 digest of `data`.
pub fn calculate_hash(data: &[u8]) -> Seal {
    Seal(Sha256::digest(data).to_vec())
}

/// Hash of an intermediate Merkle node: `H(left || right)`.
pub fn hash_pair(left: &Seal, right: &Seal) -> Seal {
    let mut hasher = Sha256::new();
    hasher.update(left.as_bytes());
    hasher.update(right.as_bytes());
    Seal(hasher.finalize().to_vec())
}

/// Shortened hex form for log lines and CLI output.
pub fn short_hex(seal: &Seal) -> String {
    let hex = seal.to_hex();
    if hex.len() > 16 {
        format!("{}...", &hex[..13])
    } else {
        hex
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calculate_hash_is_sha256() {
        let seal = calculate_hash(b"abc");
        assert_eq!(
            seal.to_hex(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_eq!(seal.len(), 32);
    }

    #[test]
    fn test_hash_pair_matches_concatenation() {
        let left = calculate_hash(b"left");
        let right = calculate_hash(b"right");
        let mut combined = left.as_bytes().to_vec();
        combined.extend_from_slice(right.as_bytes());

        assert_eq!(hash_pair(&left, &right), calculate_hash(&combined));
        assert_ne!(hash_pair(&left, &right), hash_pair(&right, &left));
    }

    #[test]
    fn test_seal_hex_roundtrip() {
        let seal = calculate_hash(b"hex");
        assert_eq!(Seal::from_hex(&seal.to_hex()).unwrap(), seal);
        assert!(Seal::from_hex("zz").is_err());
    }

    #[test]
    fn test_seal_serializes_as_base64() {
        let seal = Seal::new(b"genesis".to_vec());
        let json = serde_json::to_string(&seal).unwrap();
        assert_eq!(json, "\"Z2VuZXNpcw==\"");

        let back: Seal = serde_json::from_str(&json).unwrap();
        assert_eq!(back, seal);
    }

    #[test]
    fn test_short_hex() {
        assert_eq!(short_hex(&Seal::new(vec![0xab, 0xcd])), "abcd");
        assert!(short_hex(&calculate_hash(b"x")).ends_with("..."));
    }
}
