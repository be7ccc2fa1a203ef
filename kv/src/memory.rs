//! In-memory key-value store, used by tests and ephemeral runs.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::{Arc, Mutex};

use crate::{KVError, KVResult, KVStore, WriteBatch, WriteOp};

/// An in-memory key-value store backed by a `BTreeMap`.
///
/// Clones share the same underlying map.
#[derive(Clone, Default)]
pub struct MemoryStore {
    data: Arc<Mutex<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStore {
    /// Create a new empty memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        self.data.lock().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KVStore for MemoryStore {
    fn get(&self, key: &str) -> KVResult<Option<Vec<u8>>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        Ok(data.get(key).cloned())
    }

    fn scan_after(
        &self,
        prefix: &str,
        after: Option<&str>,
        limit: usize,
    ) -> KVResult<Vec<(String, Vec<u8>)>> {
        let data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        let lower = match after {
            Some(a) if a >= prefix => Bound::Excluded(a),
            _ => Bound::Included(prefix),
        };
        Ok(data
            .range::<str, _>((lower, Bound::Unbounded))
            .take_while(|(k, _)| k.starts_with(prefix))
            .take(limit)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn write(&self, batch: WriteBatch) -> KVResult<()> {
        let mut data = self
            .data
            .lock()
            .map_err(|e| KVError::Storage(e.to_string()))?;
        for op in batch.ops {
            match op {
                WriteOp::Set { key, value } => {
                    data.insert(key, value);
                }
                WriteOp::Delete { key } => {
                    data.remove(&key);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_operations() {
        let store = MemoryStore::new();

        store.set("key1", b"value1").unwrap();
        assert_eq!(store.get("key1").unwrap(), Some(b"value1".to_vec()));
        assert_eq!(store.get("nonexistent").unwrap(), None);

        let mut batch = WriteBatch::new();
        batch.delete("key1");
        store.write(batch).unwrap();
        assert_eq!(store.get("key1").unwrap(), None);
    }

    #[test]
    fn test_scan_is_ordered() {
        let store = MemoryStore::new();
        store.set("p:b", b"2").unwrap();
        store.set("p:a", b"1").unwrap();
        store.set("q:c", b"3").unwrap();

        let keys: Vec<String> = store.scan("p:").unwrap().into_iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["p:a", "p:b"]);
    }

    #[test]
    fn test_scan_after_pages() {
        let store = MemoryStore::new();
        for i in 0..5 {
            store.set(&format!("p:{i}"), b"x").unwrap();
        }
        store.set("z", b"x").unwrap();

        let first = store.scan_after("p:", None, 2).unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first[1].0, "p:1");

        let rest = store.scan_after("p:", Some("p:1"), 10).unwrap();
        let keys: Vec<&str> = rest.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["p:2", "p:3", "p:4"]);
    }

    #[test]
    fn test_batch_applies_in_order() {
        let store = MemoryStore::new();
        let mut batch = WriteBatch::new();
        batch.set("a", b"1".to_vec()).set("b", b"2".to_vec()).set("a", b"3".to_vec());
        store.write(batch).unwrap();

        assert_eq!(store.get("a").unwrap(), Some(b"3".to_vec()));
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_clones_share_data() {
        let store = MemoryStore::new();
        let other = store.clone();
        store.set("k", b"v").unwrap();
        assert_eq!(other.get("k").unwrap(), Some(b"v".to_vec()));
    }
}
