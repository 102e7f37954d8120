//! Key-value persistence layer for Sealchain
//!
//! The ledger stores everything in one flat byte-keyed store. Logical
//! partitions (`block_seal`, `block_height`, ...) are carved out by
//! [`DbHandle`], which prefixes every key with `"<partition>_"`.

use crate::error::{ChainError, Result};
use parking_lot::RwLock;
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::info;

/// A single mutation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put { key: Vec<u8>, value: Vec<u8> },
    Delete { key: Vec<u8> },
}

/// Abstraction for storage backends.
///
/// `durable` asks the backend to make the write survive a crash before
/// returning; `write_batch` must apply all operations or none of them.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;
    fn put(&self, key: &[u8], value: &[u8], durable: bool) -> Result<()>;
    fn delete(&self, key: &[u8], durable: bool) -> Result<()>;
    fn write_batch(&self, ops: Vec<BatchOp>, durable: bool) -> Result<()>;
    /// All entries whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>>;
    fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>>;
}

/// SQLite-backed store.
pub struct Database {
    conn: Mutex<Connection>,
}

impl Database {
    pub fn open(path: &str) -> Result<Self> {
        let conn = Connection::open(path)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to open database: {}", e)))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv (
                key BLOB PRIMARY KEY,
                value BLOB NOT NULL
            )",
            [],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to create kv table: {}", e)))?;

        info!("Opened ledger database at {}", path);
        Ok(Database { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ChainError::DatabaseError("Mutex poisoned".to_string()))
    }

    fn set_durability(conn: &Connection, durable: bool) -> Result<()> {
        let level = if durable { "FULL" } else { "NORMAL" };
        conn.pragma_update(None, "synchronous", level)
            .map_err(|e| ChainError::DatabaseError(format!("Failed to set synchronous mode: {}", e)))
    }
}

impl KeyValueStore for Database {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let conn = self.lock()?;
        conn.query_row("SELECT value FROM kv WHERE key = ?1", params![key], |row| row.get(0))
            .optional()
            .map_err(|e| ChainError::DatabaseError(format!("Failed to read key: {}", e)))
    }

    fn put(&self, key: &[u8], value: &[u8], durable: bool) -> Result<()> {
        let conn = self.lock()?;
        Self::set_durability(&conn, durable)?;
        conn.execute(
            "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
            params![key, value],
        )
        .map_err(|e| ChainError::DatabaseError(format!("Failed to write key: {}", e)))?;
        Ok(())
    }

    fn delete(&self, key: &[u8], durable: bool) -> Result<()> {
        let conn = self.lock()?;
        Self::set_durability(&conn, durable)?;
        conn.execute("DELETE FROM kv WHERE key = ?1", params![key])
            .map_err(|e| ChainError::DatabaseError(format!("Failed to delete key: {}", e)))?;
        Ok(())
    }

    fn write_batch(&self, ops: Vec<BatchOp>, durable: bool) -> Result<()> {
        let conn_guard = self.lock()?;
        Self::set_durability(&conn_guard, durable)?;
        let tx = conn_guard.unchecked_transaction().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to start transaction: {}", e))
        })?;

        for op in &ops {
            let applied = match op {
                BatchOp::Put { key, value } => tx.execute(
                    "INSERT OR REPLACE INTO kv (key, value) VALUES (?1, ?2)",
                    params![key, value],
                ),
                BatchOp::Delete { key } => tx.execute("DELETE FROM kv WHERE key = ?1", params![key]),
            };
            applied.map_err(|e| ChainError::DatabaseError(format!("Failed to apply batch: {}", e)))?;
        }

        // Dropping `tx` without commit rolls the whole batch back.
        tx.commit().map_err(|e| {
            ChainError::DatabaseError(format!("Failed to commit transaction: {}", e))
        })?;

        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM kv WHERE substr(key, 1, ?2) = ?1 ORDER BY key")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map(params![prefix, prefix.len() as i64], |row| {
                Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?))
            })
            .map_err(|e| ChainError::DatabaseError(format!("Failed to scan prefix: {}", e)))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?,
            );
        }
        Ok(entries)
    }

    fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        let conn = self.lock()?;
        let mut stmt = conn
            .prepare("SELECT key, value FROM kv")
            .map_err(|e| ChainError::DatabaseError(format!("Failed to prepare query: {}", e)))?;

        let rows = stmt
            .query_map([], |row| Ok((row.get::<_, Vec<u8>>(0)?, row.get::<_, Vec<u8>>(1)?)))
            .map_err(|e| ChainError::DatabaseError(format!("Failed to snapshot: {}", e)))?;

        let mut snapshot = BTreeMap::new();
        for row in rows {
            let (key, value) =
                row.map_err(|e| ChainError::DatabaseError(format!("Failed to read row: {}", e)))?;
            snapshot.insert(key, value);
        }
        Ok(snapshot)
    }
}

/// Simple in-memory store useful for tests and ephemeral ledgers.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    entries: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for InMemoryStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8], _durable: bool) -> Result<()> {
        self.entries.write().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8], _durable: bool) -> Result<()> {
        self.entries.write().remove(key);
        Ok(())
    }

    fn write_batch(&self, ops: Vec<BatchOp>, _durable: bool) -> Result<()> {
        let mut entries = self.entries.write();
        for op in ops {
            match op {
                BatchOp::Put { key, value } => {
                    entries.insert(key, value);
                }
                BatchOp::Delete { key } => {
                    entries.remove(&key);
                }
            }
        }
        Ok(())
    }

    fn scan_prefix(&self, prefix: &[u8]) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let entries = self.entries.read();
        Ok(entries
            .range(prefix.to_vec()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect())
    }

    fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        Ok(self.entries.read().clone())
    }
}

/// Iterator over one partition, keys stripped of the partition prefix.
pub type DbIterator = std::vec::IntoIter<(Vec<u8>, Vec<u8>)>;

/// Owner of a store, handing out partition handles over it.
///
/// Clones share the same store; every repository opened on one provider sees
/// the same data.
#[derive(Clone)]
pub struct DbProvider {
    store: Arc<dyn KeyValueStore>,
}

impl DbProvider {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        DbProvider { store }
    }

    /// Opens (or creates) an SQLite-backed provider at `path`.
    pub fn open(path: &str) -> Result<Self> {
        Ok(Self::new(Arc::new(Database::open(path)?)))
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    pub fn handle(&self, name: &str) -> DbHandle {
        DbHandle {
            name: name.to_string(),
            store: Arc::clone(&self.store),
        }
    }

    /// Applies a batch spanning any number of partitions atomically.
    pub fn write_batch(&self, batch: WriteBatch, durable: bool) -> Result<()> {
        if batch.is_empty() {
            return Ok(());
        }
        self.store.write_batch(batch.ops, durable)
    }

    /// Every raw key/value pair in the store, partition prefixes included.
    pub fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        self.store.snapshot()
    }
}

/// A view of one named partition of the store.
#[derive(Clone)]
pub struct DbHandle {
    name: String,
    store: Arc<dyn KeyValueStore>,
}

impl DbHandle {
    fn prefix(&self) -> Vec<u8> {
        let mut prefix = Vec::with_capacity(self.name.len() + 1);
        prefix.extend_from_slice(self.name.as_bytes());
        prefix.push(b'_');
        prefix
    }

    fn db_key(&self, key: &[u8]) -> Vec<u8> {
        let mut db_key = self.prefix();
        db_key.extend_from_slice(key);
        db_key
    }

    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        self.store.get(&self.db_key(key))
    }

    pub fn put(&self, key: &[u8], value: &[u8], durable: bool) -> Result<()> {
        self.store.put(&self.db_key(key), value, durable)
    }

    pub fn delete(&self, key: &[u8], durable: bool) -> Result<()> {
        self.store.delete(&self.db_key(key), durable)
    }

    /// Applies puts (`Some`) and tombstones (`None`) to this partition atomically.
    pub fn write_batch(&self, kvs: HashMap<Vec<u8>, Option<Vec<u8>>>, durable: bool) -> Result<()> {
        let mut batch = WriteBatch::new();
        for (key, value) in kvs {
            match value {
                Some(value) => batch.put(self, &key, value),
                None => batch.delete(self, &key),
            }
        }
        self.store.write_batch(batch.ops, durable)
    }

    pub fn iter_prefix(&self) -> Result<DbIterator> {
        let prefix = self.prefix();
        let entries = self
            .store
            .scan_prefix(&prefix)?
            .into_iter()
            .map(|(key, value)| (key[prefix.len()..].to_vec(), value))
            .collect::<Vec<_>>();
        Ok(entries.into_iter())
    }

    /// Contents of this partition, keys stripped of the partition prefix.
    pub fn snapshot(&self) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        Ok(self.iter_prefix()?.collect())
    }
}

/// Mutations across partitions that commit together.
#[derive(Debug, Default)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, handle: &DbHandle, key: &[u8], value: Vec<u8>) {
        self.ops.push(BatchOp::Put {
            key: handle.db_key(key),
            value,
        });
    }

    pub fn delete(&mut self, handle: &DbHandle, key: &[u8]) {
        self.ops.push(BatchOp::Delete {
            key: handle.db_key(key),
        });
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}
