//! Key-value persistence for the newsdup engine.
//!
//! Every backend keeps keys in lexicographic order and applies a
//! [`WriteBatch`] atomically: either all of its operations become visible or
//! none do. Callers that need crash consistency across several records
//! (for example an article and the cluster it joins) put them in one batch.

pub mod memory;
pub mod redb;

use std::fmt;
use thiserror::Error;

/// Errors that can occur in KV store operations.
#[derive(Error, Debug)]
pub enum KVError {
    #[error("kv: not found")]
    NotFound,

    #[error("kv: storage error: {0}")]
    Storage(String),

    #[error("kv: serialization error: {0}")]
    Serialization(String),
}

/// Result type for KV operations.
pub type KVResult<T> = Result<T, KVError>;

/// A single mutation inside a [`WriteBatch`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOp {
    Set { key: String, value: Vec<u8> },
    Delete { key: String },
}

/// An ordered list of mutations committed as one unit.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    ops: Vec<WriteOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a set. Later operations on the same key win.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) -> &mut Self {
        self.ops.push(WriteOp::Set {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn delete(&mut self, key: impl Into<String>) -> &mut Self {
        self.ops.push(WriteOp::Delete { key: key.into() });
        self
    }

    pub fn ops(&self) -> &[WriteOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Ordered key-value store with atomic batches.
pub trait KVStore: Send + Sync {
    /// Get a value by key.
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>>;

    /// Return up to `limit` entries whose key starts with `prefix`, in key
    /// order, starting strictly after `after` when given.
    fn scan_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>>;

    /// Apply every operation in `batch` atomically.
    fn write(&self, batch: WriteBatch) -> KVResult<()>;

    /// Set a single key-value pair.
    fn set(&self, key: &str, value: &[u8]) -> KVResult<()> {
        let mut batch = WriteBatch::new();
        batch.set(key, value);
        self.write(batch)
    }

    /// Return every entry whose key starts with `prefix`, in key order.
    fn scan(&self, prefix: &str) -> KVResult<Vec<(String, Vec<u8>)>> {
        self.scan_after(prefix, None, usize::MAX)
    }
}

impl fmt::Debug for dyn KVStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "KVStore {{ ... }}")
    }
}

pub use self::memory::MemoryStore;
pub use self::redb::RedbStore;
