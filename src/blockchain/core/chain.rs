use crate::blockchain::core::merkle::TxSeal;
use crate::crypto::Seal;
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};

/// A sealed batch of transactions linked to its predecessor.
///
/// `seal`, `tx_seal` and `prev_seal` are filled in by the block producer
/// (see [`crate::blockchain::Validator::seal_block`]); the repository
/// re-validates them before anything is written.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Block {
    #[serde(default)]
    pub seal: Seal,
    pub prev_seal: Option<Seal>,
    pub height: u64,
    #[serde(default)]
    pub tx_list: Vec<Transaction>,
    pub tx_seal: Option<TxSeal>,
    pub timestamp: DateTime<Utc>,
}

impl Block {
    pub fn new(height: u64, prev_seal: Seal, timestamp: DateTime<Utc>) -> Self {
        Block {
            seal: Seal::default(),
            prev_seal: Some(prev_seal),
            height,
            tx_list: Vec::new(),
            tx_seal: None,
            timestamp,
        }
    }

    pub fn put_tx(&mut self, transaction: Transaction) {
        self.tx_list.push(transaction);
    }

    pub fn tx_list(&self) -> &[Transaction] {
        &self.tx_list
    }

    pub fn tx_ids(&self) -> impl Iterator<Item = &str> {
        self.tx_list.iter().map(|tx| tx.id.as_str())
    }

    /// A block is ready to publish once its own seal has been assigned.
    pub fn is_ready_to_publish(&self) -> bool {
        !self.seal.is_empty()
    }

    /// Whether this block links directly onto `prev`.
    pub fn extends(&self, prev: &Block) -> bool {
        self.prev_seal.as_ref() == Some(&prev.seal)
    }

    pub fn merkle_root(&self) -> Option<&Seal> {
        self.tx_seal.as_deref().and_then(|tree| tree.first())
    }
}
