//! Integration tests for the transaction pool feeding a block producer

use chrono::Utc;
use sealchain::blockchain::{Block, BlockRepository, Validator};
use sealchain::crypto::Seal;
use sealchain::error::ChainError;
use sealchain::mempool::Mempool;
use sealchain::persistence::DbProvider;
use sealchain::transaction::Transaction;
use std::collections::HashSet;
use std::sync::Arc;
use std::thread;

fn tx(id: &str) -> Transaction {
    Transaction::new(id, "invoke", "transfer", vec!["alice".to_string(), "bob".to_string()])
}

#[test]
fn test_duplicate_add_keeps_one_entry() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Mempool::new();
    pool.add_transaction(tx("tx1"))?;
    assert_eq!(
        pool.add_transaction(tx("tx1")),
        Err(ChainError::DuplicateTransaction("tx1".to_string()))
    );
    assert_eq!(pool.get_all_uncommitted().len(), 1);
    Ok(())
}

#[test]
fn test_remove_committed_tolerates_foreign_ids() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Mempool::new();
    pool.add_transaction(tx("tx1"))?;
    pool.add_transaction(tx("tx2"))?;

    pool.remove_committed(&[tx("tx1"), tx("tx3")]);

    let ids: Vec<String> = pool.get_all_uncommitted().into_iter().map(|t| t.id).collect();
    assert_eq!(ids, vec!["tx2".to_string()]);
    Ok(())
}

#[test]
fn test_concurrent_adds_and_reads() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Arc::new(Mempool::new());

    let writers: Vec<_> = (0..4)
        .map(|w| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || -> Result<(), ChainError> {
                for i in 0..50 {
                    pool.add_transaction(tx(&format!("w{}-{}", w, i)))?;
                }
                Ok(())
            })
        })
        .collect();

    let reader = {
        let pool = Arc::clone(&pool);
        thread::spawn(move || {
            for _ in 0..50 {
                let snapshot = pool.get_all_uncommitted();
                let unique: HashSet<&str> = snapshot.iter().map(|t| t.id.as_str()).collect();
                assert_eq!(unique.len(), snapshot.len());
            }
        })
    };

    for writer in writers {
        writer.join().map_err(|_| "writer panicked")??;
    }
    reader.join().map_err(|_| "reader panicked")?;

    assert_eq!(pool.len(), 200);
    Ok(())
}

#[test]
fn test_racing_duplicate_adds_admit_one() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Arc::new(Mempool::new());
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let pool = Arc::clone(&pool);
            thread::spawn(move || pool.add_transaction(tx("contested")).is_ok())
        })
        .collect();

    let mut admitted = 0;
    for handle in handles {
        if handle.join().map_err(|_| "adder panicked")? {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 1);
    assert_eq!(pool.len(), 1);
    Ok(())
}

#[test]
fn test_drain_pool_into_block() -> Result<(), Box<dyn std::error::Error>> {
    let pool = Mempool::new();
    for id in ["tx1", "tx2", "tx3"] {
        pool.add_transaction(tx(id))?;
    }

    let repo = BlockRepository::new(Arc::new(DbProvider::in_memory()), Some(Validator::new()));
    let mut block = Block::new(0, Seal::new(b"genesis".to_vec()), Utc::now());
    let mut pending = pool.get_all_uncommitted();
    pending.sort_by(|a, b| a.id.cmp(&b.id));
    for t in pending {
        block.put_tx(t);
    }
    Validator::new().seal_block(&mut block)?;
    repo.add_block(&block)?;

    pool.remove_committed(block.tx_list());
    assert!(pool.is_empty());
    for id in ["tx1", "tx2", "tx3"] {
        assert!(repo.verify_transaction(id)?);
    }
    Ok(())
}
