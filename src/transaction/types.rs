//! Transaction types for Sealchain

use crate::codec;
use crate::crypto::{calculate_hash, Seal};
use crate::error::Result;
use chrono::{DateTime, Utc};

/// An operation request recorded on the ledger.
///
/// The ledger does not interpret `function`, `args` or `signature`; it only
/// seals, stores and retrieves them. `id` is assigned by the caller and is
/// only required to be unique within a [`crate::mempool::Mempool`].
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Transaction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: DateTime<Utc>,
    pub function: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default, with = "crate::crypto::base64_bytes")]
    pub signature: Vec<u8>,
}

impl Transaction {
    pub fn new(
        id: impl Into<String>,
        kind: impl Into<String>,
        function: impl Into<String>,
        args: Vec<String>,
    ) -> Self {
        Transaction {
            id: id.into(),
            kind: kind.into(),
            timestamp: Utc::now(),
            function: function.into(),
            args,
            signature: Vec::new(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn with_signature(mut self, signature: Vec<u8>) -> Self {
        self.signature = signature;
        self
    }

    /// Serialized form of the transaction, the exact bytes that get sealed.
    pub fn content(&self) -> Result<Vec<u8>> {
        codec::serialize(self)
    }

    /// Leaf value of this transaction in a Merkle tree: `H(serialize(tx))`.
    pub fn calculate_seal(&self) -> Result<Seal> {
        let content = self.content()?;
        Ok(calculate_hash(&content))
    }
}
