//! Transaction pool: transactions waiting to be committed in a block

use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use std::collections::HashMap;
use tracing::{debug, warn};

/// Thread-safe pool of uncommitted transactions keyed by id.
///
/// Every operation takes the lock once, so a reader never observes an
/// add or remove half way through.
#[derive(Debug, Default)]
pub struct Mempool {
    transactions: RwLock<HashMap<String, Transaction>>,
}

impl Mempool {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_transaction(&self, tx: Transaction) -> Result<()> {
        let mut transactions = self.transactions.write();
        if transactions.contains_key(&tx.id) {
            return Err(ChainError::DuplicateTransaction(tx.id));
        }
        debug!(tx_id = %tx.id, "Added transaction to pool");
        transactions.insert(tx.id.clone(), tx);
        Ok(())
    }

    /// Snapshot of every pooled transaction, in no particular order.
    pub fn get_all_uncommitted(&self) -> Vec<Transaction> {
        self.transactions.read().values().cloned().collect()
    }

    /// Drops the given transactions from the pool.
    ///
    /// Ids that are not pooled here are logged and skipped; a producer may
    /// commit transactions it did not take from this pool.
    pub fn remove_committed(&self, tx_list: &[Transaction]) {
        let mut transactions = self.transactions.write();
        for tx in tx_list {
            if transactions.remove(&tx.id).is_none() {
                warn!(tx_id = %tx.id, "Committed transaction was not in the pool");
            }
        }
    }

    pub fn contains(&self, tx_id: &str) -> bool {
        self.transactions.read().contains_key(tx_id)
    }

    pub fn len(&self) -> usize {
        self.transactions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.read().is_empty()
    }
}
