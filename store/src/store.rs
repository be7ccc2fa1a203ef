use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use newsdup_kv::{KVStore, WriteBatch};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::StoreError;
use crate::keys::{embedding_id_key, embedding_key, embedding_prefix, embedding_seq_key, parse_u64};

/// Number of log entries fetched per KV scan while iterating.
const PAGE_SIZE: usize = 256;

/// EmbeddingRecord is one entry of the embedding log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingRecord {
    #[serde(rename = "aid")]
    pub article_id: u64,

    /// Position in the creation-ordered log, starting at 1.
    #[serde(rename = "seq")]
    pub seq: u64,

    #[serde(rename = "dim")]
    pub dimension: usize,

    #[serde(rename = "ts")]
    pub created_at: DateTime<Utc>,

    #[serde(rename = "vec")]
    pub vector: Vec<f32>,
}

/// Outcome of [`EmbeddingStore::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Put {
    /// The embedding was written.
    Created,
    /// A byte-identical embedding was already stored; nothing was written.
    Unchanged,
}

/// EmbeddingStore persists one immutable vector per article.
///
/// Log positions are allocated by read-then-write, so concurrent writers
/// must be serialized by the caller.
pub struct EmbeddingStore {
    kv: Arc<dyn KVStore>,
    prefix: String,
    dim: usize,
}

impl EmbeddingStore {
    /// Create a store over `kv`. Panics if `dim` is 0.
    pub fn new(kv: Arc<dyn KVStore>, prefix: impl Into<String>, dim: usize) -> Self {
        assert!(dim > 0, "store: embedding dimension must be positive");
        Self {
            kv,
            prefix: prefix.into(),
            dim,
        }
    }

    /// The configured embedding dimension.
    pub fn dimension(&self) -> usize {
        self.dim
    }

    /// Persist the embedding of `article_id`, stamped with the current time.
    pub fn put(&self, article_id: u64, vector: &[f32]) -> Result<Put, StoreError> {
        self.put_at(article_id, vector, Utc::now())
    }

    /// Persist the embedding of `article_id` with an explicit creation time.
    ///
    /// Writing the same bytes twice is a no-op; writing different bytes for
    /// an existing article fails with [`StoreError::Conflict`].
    pub fn put_at(
        &self,
        article_id: u64,
        vector: &[f32],
        created_at: DateTime<Utc>,
    ) -> Result<Put, StoreError> {
        if vector.len() != self.dim {
            return Err(StoreError::DimensionMismatch {
                expected: self.dim,
                got: vector.len(),
            });
        }
        if vector.iter().any(|x| !x.is_finite()) {
            return Err(StoreError::NonFinite(article_id));
        }

        if let Some(existing) = self.find_record(article_id)? {
            if same_bits(&existing.vector, vector) {
                return Ok(Put::Unchanged);
            }
            return Err(StoreError::Conflict(article_id));
        }

        let seq = self.last_seq()? + 1;
        let record = EmbeddingRecord {
            article_id,
            seq,
            dimension: vector.len(),
            created_at,
            vector: vector.to_vec(),
        };
        let data = rmp_serde::to_vec_named(&record)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        let seq_text = seq.to_string();
        let mut batch = WriteBatch::new();
        batch
            .set(embedding_key(&self.prefix, seq), data)
            .set(embedding_id_key(&self.prefix, article_id), seq_text.as_bytes())
            .set(embedding_seq_key(&self.prefix), seq_text.as_bytes());
        self.kv.write(batch)?;

        debug!(article_id, seq, "stored embedding");
        Ok(Put::Created)
    }

    /// Return the stored vector of `article_id`.
    pub fn get(&self, article_id: u64) -> Result<Vec<f32>, StoreError> {
        Ok(self.get_record(article_id)?.vector)
    }

    /// Return the full log record of `article_id`.
    pub fn get_record(&self, article_id: u64) -> Result<EmbeddingRecord, StoreError> {
        self.find_record(article_id)?
            .ok_or(StoreError::NotFound(article_id))
    }

    pub fn contains(&self, article_id: u64) -> Result<bool, StoreError> {
        Ok(self
            .kv
            .get(&embedding_id_key(&self.prefix, article_id))?
            .is_some())
    }

    /// Number of stored embeddings.
    pub fn len(&self) -> Result<u64, StoreError> {
        self.last_seq()
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    /// Iterate every `(article_id, vector)` in creation order.
    ///
    /// The cursor pages through the KV store lazily. Calling `load_all`
    /// again starts over from the first embedding.
    pub fn load_all(&self) -> EmbeddingCursor<'_> {
        EmbeddingCursor::new(self, None, 0)
    }

    /// Iterate embeddings written after log position `seq`
    /// (see [`EmbeddingCursor::position`]).
    pub fn load_after(&self, seq: u64) -> EmbeddingCursor<'_> {
        EmbeddingCursor::new(self, Some(embedding_key(&self.prefix, seq)), seq)
    }

    fn find_record(&self, article_id: u64) -> Result<Option<EmbeddingRecord>, StoreError> {
        let seq = match self.kv.get(&embedding_id_key(&self.prefix, article_id))? {
            Some(data) => parse_u64(&data).map_err(StoreError::Serialization)?,
            None => return Ok(None),
        };
        let data = match self.kv.get(&embedding_key(&self.prefix, seq))? {
            Some(data) => data,
            None => return Ok(None),
        };
        let record: EmbeddingRecord = rmp_serde::from_slice(&data)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(Some(record))
    }

    fn last_seq(&self) -> Result<u64, StoreError> {
        match self.kv.get(&embedding_seq_key(&self.prefix))? {
            Some(data) => parse_u64(&data).map_err(StoreError::Serialization),
            None => Ok(0),
        }
    }
}

fn same_bits(a: &[f32], b: &[f32]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

/// Lazy iterator over the embedding log, in creation order.
pub struct EmbeddingCursor<'a> {
    store: &'a EmbeddingStore,
    after: Option<String>,
    position: u64,
    page: VecDeque<(String, Vec<u8>)>,
    exhausted: bool,
}

impl<'a> EmbeddingCursor<'a> {
    fn new(store: &'a EmbeddingStore, after: Option<String>, position: u64) -> Self {
        Self {
            store,
            after,
            position,
            page: VecDeque::new(),
            exhausted: false,
        }
    }

    /// Log position of the last embedding yielded (0 before the first).
    /// Pass it to [`EmbeddingStore::load_after`] to resume.
    pub fn position(&self) -> u64 {
        self.position
    }

    fn fetch(&mut self) -> Result<(), StoreError> {
        let prefix = embedding_prefix(&self.store.prefix);
        let page = self
            .store
            .kv
            .scan_after(&prefix, self.after.as_deref(), PAGE_SIZE)?;
        if page.len() < PAGE_SIZE {
            self.exhausted = true;
        }
        self.page.extend(page);
        Ok(())
    }
}

impl Iterator for EmbeddingCursor<'_> {
    type Item = Result<(u64, Vec<f32>), StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.page.is_empty() {
            if self.exhausted {
                return None;
            }
            if let Err(e) = self.fetch() {
                self.exhausted = true;
                return Some(Err(e));
            }
        }

        let (key, value) = self.page.pop_front()?;
        self.after = Some(key);
        match rmp_serde::from_slice::<EmbeddingRecord>(&value) {
            Ok(record) => {
                self.position = record.seq;
                Some(Ok((record.article_id, record.vector)))
            }
            Err(e) => Some(Err(StoreError::Serialization(e.to_string()))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use newsdup_kv::{MemoryStore, RedbStore};
    use newsdup_vecindex::{FlatIndex, Metric, VecIndex};

    fn mem_store(dim: usize) -> EmbeddingStore {
        EmbeddingStore::new(Arc::new(MemoryStore::new()), "t", dim)
    }

    #[test]
    fn put_and_get() {
        let store = mem_store(3);
        assert_eq!(store.put(7, &[0.1, 0.2, 0.3]).unwrap(), Put::Created);
        assert_eq!(store.get(7).unwrap(), vec![0.1, 0.2, 0.3]);
        assert_eq!(store.get_record(7).unwrap().seq, 1);
        assert!(store.contains(7).unwrap());
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn put_rejects_wrong_dimension() {
        let store = mem_store(3);
        let err = store.put(1, &[1.0, 2.0]).unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 3, got: 2 }));
        assert!(!store.contains(1).unwrap());
    }

    #[test]
    fn put_rejects_non_finite() {
        let store = mem_store(2);
        assert!(matches!(
            store.put(1, &[f32::NAN, 0.0]).unwrap_err(),
            StoreError::NonFinite(1)
        ));
    }

    #[test]
    fn put_is_idempotent_for_identical_bytes() {
        let store = mem_store(2);
        store.put(1, &[0.5, 0.25]).unwrap();
        assert_eq!(store.put(1, &[0.5, 0.25]).unwrap(), Put::Unchanged);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn put_conflicts_on_different_vector() {
        let store = mem_store(2);
        store.put(1, &[0.5, 0.25]).unwrap();
        assert!(matches!(store.put(1, &[0.5, 0.26]).unwrap_err(), StoreError::Conflict(1)));
        // Sign of zero is part of the bytes.
        store.put(2, &[0.0, 1.0]).unwrap();
        assert!(matches!(store.put(2, &[-0.0, 1.0]).unwrap_err(), StoreError::Conflict(2)));
    }

    #[test]
    fn get_missing_is_not_found() {
        let store = mem_store(2);
        assert!(matches!(store.get(99).unwrap_err(), StoreError::NotFound(99)));
    }

    #[test]
    fn load_all_follows_creation_order() {
        let store = mem_store(1);
        for id in [50u64, 3, 17] {
            store.put(id, &[id as f32]).unwrap();
        }
        let ids: Vec<u64> = store.load_all().map(|r| r.unwrap().0).collect();
        assert_eq!(ids, vec![50, 3, 17]);
    }

    #[test]
    fn load_all_pages_and_restarts() {
        let store = mem_store(2);
        let n = PAGE_SIZE as u64 * 2 + 10;
        for id in 0..n {
            store.put(id, &[id as f32, 1.0]).unwrap();
        }

        let first: Vec<u64> = store.load_all().map(|r| r.unwrap().0).collect();
        assert_eq!(first.len() as u64, n);
        assert!(first.windows(2).all(|w| w[0] < w[1]));

        let second: Vec<u64> = store.load_all().map(|r| r.unwrap().0).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn load_after_resumes() {
        let store = mem_store(1);
        for id in 1..=5u64 {
            store.put(id * 10, &[id as f32]).unwrap();
        }

        let mut cursor = store.load_all();
        cursor.next().unwrap().unwrap();
        cursor.next().unwrap().unwrap();
        let pos = cursor.position();
        assert_eq!(pos, 2);

        let rest: Vec<u64> = store.load_after(pos).map(|r| r.unwrap().0).collect();
        assert_eq!(rest, vec![30, 40, 50]);
    }

    #[test]
    fn redb_round_trip_preserves_bytes_and_rankings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("emb.redb");
        let vectors: Vec<(u64, Vec<f32>)> = vec![
            (1, vec![0.123_456_79, -0.5, 0.75]),
            (2, vec![0.9, 0.1, -0.2]),
            (3, vec![-0.3, 0.8, 0.1]),
        ];
        let query = [0.5f32, 0.2, 0.1];

        let original = FlatIndex::new(Metric::Cosine, 3);
        {
            let kv = Arc::new(RedbStore::open(&path).unwrap());
            let store = EmbeddingStore::new(kv, "t", 3);
            for (id, v) in &vectors {
                store.put(*id, v).unwrap();
                original.add(*id, v).unwrap();
            }
        }

        let kv = Arc::new(RedbStore::open(&path).unwrap());
        let store = EmbeddingStore::new(kv, "t", 3);
        let reloaded = FlatIndex::new(Metric::Cosine, 3);
        for item in store.load_all() {
            let (id, v) = item.unwrap();
            let expected = &vectors.iter().find(|(vid, _)| *vid == id).unwrap().1;
            assert!(same_bits(expected, &v), "article {id} changed bytes");
            reloaded.add(id, &v).unwrap();
        }

        assert_eq!(original.query(&query, 3).unwrap(), reloaded.query(&query, 3).unwrap());
    }
}
