use crate::blockchain::core::chain::Block;
use crate::blockchain::core::merkle::{self, TxSeal};
use crate::crypto::{calculate_hash, Seal};
use crate::error::{ChainError, Result};
use crate::transaction::Transaction;
use chrono::{DateTime, Utc};

/// Builds and checks the seals that make blocks tamper-evident.
///
/// The validator is stateless; it is handed to a
/// [`crate::blockchain::BlockRepository`] at construction time.
#[derive(Debug, Clone, Copy, Default)]
pub struct Validator;

impl Validator {
    pub fn new() -> Self {
        Validator
    }

    /// Recomputes the block seal from `block`'s own fields and compares it to `seal`.
    pub fn validate_block(&self, seal: &Seal, block: &Block) -> Result<bool> {
        let expected = self.build_block_seal(
            &block.timestamp,
            block.prev_seal.as_ref(),
            block.tx_seal.as_deref(),
        )?;
        Ok(*seal == expected)
    }

    /// Checks that `tx_seal` is exactly the tree built from `tx_list`.
    ///
    /// An empty list is vacuously valid whatever `tx_seal` holds.
    pub fn validate_tx_seal(&self, tx_seal: Option<&[Seal]>, tx_list: &[Transaction]) -> Result<bool> {
        if tx_list.is_empty() {
            return Ok(true);
        }
        let Some(tx_seal) = tx_seal else {
            return Ok(false);
        };

        let tree = self.build_tx_seal(tx_list)?;
        Ok(tree.as_slice() == tx_seal)
    }

    /// Merkle inclusion proof of a single transaction against a stored tree.
    pub fn validate_transaction(&self, tx_seal: &[Seal], transaction: &Transaction) -> Result<bool> {
        let leaf = transaction.calculate_seal()?;
        Ok(merkle::verify_leaf(tx_seal, &leaf))
    }

    /// `H(prev_seal || root || marshal_timestamp(timestamp))`.
    ///
    /// Both `prev_seal` and `tx_seal` must be present; an empty `tx_seal`
    /// contributes an empty root.
    pub fn build_block_seal(
        &self,
        timestamp: &DateTime<Utc>,
        prev_seal: Option<&Seal>,
        tx_seal: Option<&[Seal]>,
    ) -> Result<Seal> {
        let (Some(prev_seal), Some(tx_seal)) = (prev_seal, tx_seal) else {
            return Err(ChainError::InsufficientFields);
        };

        let root = merkle::root(tx_seal).map(Seal::as_bytes).unwrap_or_default();
        let timestamp = marshal_timestamp(timestamp);

        let mut combined = Vec::with_capacity(prev_seal.len() + root.len() + timestamp.len());
        combined.extend_from_slice(prev_seal.as_bytes());
        combined.extend_from_slice(root);
        combined.extend_from_slice(timestamp.as_bytes());

        Ok(calculate_hash(&combined))
    }

    pub fn build_tx_seal(&self, tx_list: &[Transaction]) -> Result<TxSeal> {
        if tx_list.is_empty() {
            return Err(ChainError::EmptyTransactionList);
        }
        merkle::build_tree(merkle::leaf_seals(tx_list)?)
    }

    /// Fills in `tx_seal` and `seal` for a block whose other fields are final.
    pub fn seal_block(&self, block: &mut Block) -> Result<()> {
        let tx_seal = if block.tx_list.is_empty() {
            Vec::new()
        } else {
            self.build_tx_seal(&block.tx_list)?
        };
        let seal = self.build_block_seal(
            &block.timestamp,
            block.prev_seal.as_ref(),
            Some(tx_seal.as_slice()),
        )?;

        block.tx_seal = Some(tx_seal);
        block.seal = seal;
        Ok(())
    }
}

/// Canonical text form of a timestamp used inside block seals.
///
/// RFC 3339 in UTC with the fractional seconds trimmed of trailing zeros,
/// e.g. `2019-05-01T10:00:00.5Z`; whole seconds carry no fraction.
pub fn marshal_timestamp(timestamp: &DateTime<Utc>) -> String {
    let mut text = timestamp.format("%Y-%m-%dT%H:%M:%S").to_string();
    let nanos = timestamp.timestamp_subsec_nanos();
    if nanos > 0 {
        let fraction = format!("{:09}", nanos);
        text.push('.');
        text.push_str(fraction.trim_end_matches('0'));
    }
    text.push('Z');
    text
}
