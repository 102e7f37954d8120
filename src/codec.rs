//! Object codec shared by sealing and persistence.
//!
//! Objects are encoded as JSON. The same bytes feed transaction seals, so the
//! encoding must stay deterministic for a given value.

use crate::error::{ChainError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;

pub fn serialize<T: Serialize + ?Sized>(object: &T) -> Result<Vec<u8>> {
    serde_json::to_vec(object)
        .map_err(|e| ChainError::SerializationError(format!("Error encoding: {}", e)))
}

/// Decodes `bytes`, treating an empty input as an absent value.
pub fn deserialize<T: DeserializeOwned>(bytes: &[u8]) -> Result<Option<T>> {
    if bytes.is_empty() {
        return Ok(None);
    }
    serde_json::from_slice(bytes)
        .map(Some)
        .map_err(|e| ChainError::SerializationError(format!("Error decoding: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_empty_input_is_absent() {
        let decoded: Option<BTreeMap<String, u64>> = deserialize(&[]).unwrap();
        assert!(decoded.is_none());
    }

    #[test]
    fn test_malformed_input_is_an_error() {
        let result: Result<Option<Vec<String>>> = deserialize(b"{not json");
        assert!(matches!(result, Err(ChainError::SerializationError(_))));
    }

    #[test]
    fn test_encoding_is_deterministic() {
        let value = vec!["a".to_string(), "b".to_string()];
        assert_eq!(serialize(&value).unwrap(), serialize(&value).unwrap());
        assert_eq!(serialize(&value).unwrap(), b"[\"a\",\"b\"]".to_vec());
    }
}
