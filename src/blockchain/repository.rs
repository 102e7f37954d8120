//! Block repository: validated appends and indexed lookups over the store.
//!
//! Partitions:
//! - `block_seal`: seal -> serialized block
//! - `block_height`: decimal height -> seal
//! - `transaction`: tx id -> serialized transaction
//! - `util`: `last_block` -> serialized block, tx id -> owning block seal

use crate::blockchain::core::chain::Block;
use crate::blockchain::core::validation::Validator;
use crate::codec;
use crate::crypto::{short_hex, Seal};
use crate::error::{ChainError, Result};
use crate::persistence::{DbHandle, DbProvider, WriteBatch};
use crate::transaction::Transaction;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use tracing::debug;

pub const BLOCK_SEAL_PARTITION: &str = "block_seal";
pub const BLOCK_HEIGHT_PARTITION: &str = "block_height";
pub const TRANSACTION_PARTITION: &str = "transaction";
pub const UTIL_PARTITION: &str = "util";
pub const LAST_BLOCK_KEY: &str = "last_block";

/// Entry counts per partition.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepositoryStats {
    pub blocks: usize,
    pub heights: usize,
    pub transactions: usize,
    pub util_entries: usize,
}

pub struct BlockRepository {
    provider: Arc<DbProvider>,
    validator: Option<Validator>,
    block_seals: DbHandle,
    block_heights: DbHandle,
    transactions: DbHandle,
    util: DbHandle,
    durable: bool,
    // Appends take this exclusively; reads share it.
    lock: RwLock<()>,
}

impl BlockRepository {
    pub fn new(provider: Arc<DbProvider>, validator: Option<Validator>) -> Self {
        BlockRepository {
            block_seals: provider.handle(BLOCK_SEAL_PARTITION),
            block_heights: provider.handle(BLOCK_HEIGHT_PARTITION),
            transactions: provider.handle(TRANSACTION_PARTITION),
            util: provider.handle(UTIL_PARTITION),
            provider,
            validator,
            durable: true,
            lock: RwLock::new(()),
        }
    }

    /// Whether appends wait for the store to sync before returning. Defaults to `true`.
    pub fn with_durability(mut self, durable: bool) -> Self {
        self.durable = durable;
        self
    }

    /// Validates `block` against the current chain tip and indexes it.
    ///
    /// Checks run in order: validator present, prev-seal linkage, block seal,
    /// transaction tree. All index writes land in a single atomic batch.
    pub fn add_block(&self, block: &Block) -> Result<()> {
        let validator = self.validator.as_ref().ok_or(ChainError::NoValidator)?;

        let _guard = self.lock.write();

        if let Some(last) = self.load_last_block()? {
            if !block.extends(&last) {
                return Err(ChainError::PrevSealMismatch);
            }
        }

        if !block.is_ready_to_publish() || !validator.validate_block(&block.seal, block)? {
            return Err(ChainError::SealValidation);
        }
        if !validator.validate_tx_seal(block.tx_seal.as_deref(), &block.tx_list)? {
            return Err(ChainError::TxSealValidation);
        }
        if let Some(id) = block.tx_ids().find(|id| *id == LAST_BLOCK_KEY) {
            return Err(ChainError::ReservedTransactionId(id.to_string()));
        }

        let block_bytes = codec::serialize(block)?;
        let seal = block.seal.as_bytes();

        let mut batch = WriteBatch::new();
        batch.put(&self.block_seals, seal, block_bytes.clone());
        batch.put(&self.block_heights, block.height.to_string().as_bytes(), seal.to_vec());
        batch.put(&self.util, LAST_BLOCK_KEY.as_bytes(), block_bytes);
        for tx in &block.tx_list {
            batch.put(&self.transactions, tx.id.as_bytes(), codec::serialize(tx)?);
            batch.put(&self.util, tx.id.as_bytes(), seal.to_vec());
        }

        self.provider.write_batch(batch, self.durable)?;

        debug!(
            height = block.height,
            seal = %short_hex(&block.seal),
            txs = block.tx_list.len(),
            "Appended block"
        );
        Ok(())
    }

    pub fn get_block_by_seal(&self, seal: &Seal) -> Result<Block> {
        let _guard = self.lock.read();
        self.load_block(seal.as_bytes())
    }

    pub fn get_block_by_height(&self, height: u64) -> Result<Block> {
        let _guard = self.lock.read();
        let key = height.to_string();
        let seal = self
            .block_heights
            .get(key.as_bytes())?
            .ok_or_else(|| ChainError::NotFound(format!("block at height {}", height)))?;
        self.load_block(&seal)
    }

    /// The block that committed transaction `tx_id`.
    pub fn get_block_by_tx_id(&self, tx_id: &str) -> Result<Block> {
        let _guard = self.lock.read();
        if tx_id == LAST_BLOCK_KEY {
            return Err(ChainError::NotFound(format!("block for transaction {}", tx_id)));
        }
        let seal = self
            .util
            .get(tx_id.as_bytes())?
            .ok_or_else(|| ChainError::NotFound(format!("block for transaction {}", tx_id)))?;
        self.load_block(&seal)
    }

    /// The most recently appended block, `None` on an empty ledger.
    pub fn get_last_block(&self) -> Result<Option<Block>> {
        let _guard = self.lock.read();
        self.load_last_block()
    }

    pub fn get_transaction_by_tx_id(&self, tx_id: &str) -> Result<Transaction> {
        let _guard = self.lock.read();
        let bytes = self
            .transactions
            .get(tx_id.as_bytes())?
            .ok_or_else(|| ChainError::NotFound(format!("transaction {}", tx_id)))?;
        decode(&bytes, || format!("transaction {}", tx_id))
    }

    /// Height of the chain tip.
    pub fn height(&self) -> Result<Option<u64>> {
        Ok(self.get_last_block()?.map(|block| block.height))
    }

    /// Checks the stored transaction against the Merkle tree of the block that holds it.
    pub fn verify_transaction(&self, tx_id: &str) -> Result<bool> {
        let validator = self.validator.as_ref().ok_or(ChainError::NoValidator)?;
        let tx = self.get_transaction_by_tx_id(tx_id)?;
        let block = self.get_block_by_tx_id(tx_id)?;
        match block.tx_seal.as_deref() {
            Some(tree) => validator.validate_transaction(tree, &tx),
            None => Ok(false),
        }
    }

    pub fn stats(&self) -> Result<RepositoryStats> {
        let _guard = self.lock.read();
        Ok(RepositoryStats {
            blocks: self.block_seals.iter_prefix()?.count(),
            heights: self.block_heights.iter_prefix()?.count(),
            transactions: self.transactions.iter_prefix()?.count(),
            util_entries: self.util.iter_prefix()?.count(),
        })
    }

    fn load_block(&self, seal: &[u8]) -> Result<Block> {
        let bytes = self
            .block_seals
            .get(seal)?
            .ok_or_else(|| ChainError::NotFound(format!("block {}", hex::encode(seal))))?;
        decode(&bytes, || format!("block {}", hex::encode(seal)))
    }

    fn load_last_block(&self) -> Result<Option<Block>> {
        match self.util.get(LAST_BLOCK_KEY.as_bytes())? {
            Some(bytes) => codec::deserialize(&bytes),
            None => Ok(None),
        }
    }
}

fn decode<T: DeserializeOwned>(bytes: &[u8], what: impl FnOnce() -> String) -> Result<T> {
    codec::deserialize(bytes)?.ok_or_else(|| ChainError::NotFound(what()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn repo() -> BlockRepository {
        BlockRepository::new(Arc::new(DbProvider::in_memory()), Some(Validator::new()))
    }

    fn tx(id: &str) -> Transaction {
        Transaction::new(id, "invoke", "bet", vec![id.to_string()])
            .with_timestamp(Utc.with_ymd_and_hms(2019, 5, 1, 10, 0, 0).unwrap())
    }

    fn block(height: u64, prev: Seal, ids: &[&str]) -> Block {
        let ts = Utc.with_ymd_and_hms(2019, 5, 1, 10, 0, 0).unwrap() + Duration::seconds(height as i64);
        let mut block = Block::new(height, prev, ts);
        for id in ids {
            block.put_tx(tx(id));
        }
        Validator.seal_block(&mut block).unwrap();
        block
    }

    fn genesis() -> Seal {
        Seal::new(b"genesis".to_vec())
    }

    #[test]
    fn test_add_and_lookup_by_every_index() {
        let repo = repo();
        let b0 = block(0, genesis(), &["a", "b"]);
        repo.add_block(&b0).unwrap();

        assert_eq!(repo.get_block_by_seal(&b0.seal).unwrap(), b0);
        assert_eq!(repo.get_block_by_height(0).unwrap(), b0);
        assert_eq!(repo.get_block_by_tx_id("b").unwrap(), b0);
        assert_eq!(repo.get_last_block().unwrap(), Some(b0.clone()));
        assert_eq!(repo.get_transaction_by_tx_id("a").unwrap(), tx("a"));
        assert_eq!(repo.height().unwrap(), Some(0));
    }

    #[test]
    fn test_empty_ledger() {
        let repo = repo();
        assert_eq!(repo.get_last_block().unwrap(), None);
        assert_eq!(repo.height().unwrap(), None);
        assert!(matches!(repo.get_block_by_height(0), Err(ChainError::NotFound(_))));
        assert_eq!(repo.stats().unwrap(), RepositoryStats::default());
    }

    #[test]
    fn test_missing_validator_checked_first() {
        let repo = BlockRepository::new(Arc::new(DbProvider::in_memory()), None);
        let mut bad = block(0, genesis(), &["a"]);
        bad.seal = Seal::new(vec![0; 32]);
        assert_eq!(repo.add_block(&bad), Err(ChainError::NoValidator));
    }

    #[test]
    fn test_prev_seal_mismatch() {
        let repo = repo();
        let b0 = block(0, genesis(), &["a"]);
        repo.add_block(&b0).unwrap();

        let stray = block(1, Seal::new(vec![1; 32]), &["b"]);
        assert_eq!(repo.add_block(&stray), Err(ChainError::PrevSealMismatch));
        assert_eq!(repo.get_last_block().unwrap(), Some(b0));
    }

    #[test]
    fn test_seal_and_tx_seal_validation() {
        let repo = repo();

        let mut forged = block(0, genesis(), &["a"]);
        forged.seal = Seal::new(vec![2; 32]);
        assert_eq!(repo.add_block(&forged), Err(ChainError::SealValidation));

        // Same root, different leaf: the block seal still matches.
        let mut swapped = block(0, genesis(), &["a", "b"]);
        swapped.tx_list[1] = tx("c");
        assert_eq!(repo.add_block(&swapped), Err(ChainError::TxSealValidation));

        assert_eq!(repo.stats().unwrap(), RepositoryStats::default());
    }

    #[test]
    fn test_unsealed_block_rejected() {
        let repo = repo();
        let mut unsealed = block(0, genesis(), &["a"]);
        unsealed.seal = Seal::default();
        assert_eq!(repo.add_block(&unsealed), Err(ChainError::SealValidation));
    }

    #[test]
    fn test_reserved_transaction_id_rejected() {
        let repo = repo();
        let b0 = block(0, genesis(), &[LAST_BLOCK_KEY]);
        assert_eq!(
            repo.add_block(&b0),
            Err(ChainError::ReservedTransactionId(LAST_BLOCK_KEY.to_string()))
        );
        assert_eq!(repo.get_last_block().unwrap(), None);
    }

    #[test]
    fn test_chain_of_blocks() {
        let repo = repo();
        let b0 = block(0, genesis(), &["a"]);
        let b1 = block(1, b0.seal.clone(), &[]);
        let b2 = block(2, b1.seal.clone(), &["b", "c", "d"]);
        for b in [&b0, &b1, &b2] {
            repo.add_block(b).unwrap();
        }

        assert_eq!(repo.height().unwrap(), Some(2));
        assert_eq!(repo.get_block_by_height(1).unwrap(), b1);
        assert_eq!(repo.get_block_by_tx_id("a").unwrap().seal, b0.seal);
        assert_eq!(repo.get_block_by_tx_id("d").unwrap().seal, b2.seal);
        assert_eq!(
            repo.stats().unwrap(),
            RepositoryStats { blocks: 3, heights: 3, transactions: 4, util_entries: 5 }
        );
    }

    #[test]
    fn test_unknown_keys_not_found() {
        let repo = repo();
        repo.add_block(&block(0, genesis(), &["a"])).unwrap();

        assert!(matches!(repo.get_block_by_tx_id("zzz"), Err(ChainError::NotFound(_))));
        assert!(matches!(repo.get_block_by_tx_id(LAST_BLOCK_KEY), Err(ChainError::NotFound(_))));
        assert!(matches!(repo.get_transaction_by_tx_id("zzz"), Err(ChainError::NotFound(_))));
        assert!(matches!(
            repo.get_block_by_seal(&Seal::new(vec![3; 32])),
            Err(ChainError::NotFound(_))
        ));
    }

    #[test]
    fn test_verify_transaction() {
        let repo = repo();
        repo.add_block(&block(0, genesis(), &["a", "b", "c"])).unwrap();
        assert!(repo.verify_transaction("c").unwrap());
        assert!(matches!(repo.verify_transaction("x"), Err(ChainError::NotFound(_))));
    }
}
