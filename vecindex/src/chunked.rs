use parking_lot::RwLock;
use rayon::prelude::*;

use crate::error::VecError;
use crate::index::{Neighbor, VecIndex};
use crate::metric::Metric;
use crate::rows::{Rows, check_dim, to_neighbors, top_k};

const DEFAULT_CHUNK_ROWS: usize = 1024;

/// ChunkedIndex returns the same results as [`crate::FlatIndex`] but scores
/// fixed-size chunks of rows on the rayon pool, keeping a top-k per chunk and
/// merging them.
pub struct ChunkedIndex {
    metric: Metric,
    chunk_rows: usize,
    rows: RwLock<Rows>,
}

impl ChunkedIndex {
    /// Create an empty index. Panics if `dim` is 0.
    pub fn new(metric: Metric, dim: usize) -> Self {
        Self::with_chunk_rows(metric, dim, DEFAULT_CHUNK_ROWS)
    }

    /// Create an empty index scoring `chunk_rows` rows per task.
    pub fn with_chunk_rows(metric: Metric, dim: usize, chunk_rows: usize) -> Self {
        assert!(dim > 0, "vecindex: dim must be positive");
        Self {
            metric,
            chunk_rows: chunk_rows.max(1),
            rows: RwLock::new(Rows::new(dim)),
        }
    }
}

impl VecIndex for ChunkedIndex {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn dim(&self) -> usize {
        self.rows.read().dim
    }

    fn add(&self, id: u64, vector: &[f32]) -> Result<(), VecError> {
        check_dim(vector.len(), self.dim())?;
        let prepared = self.metric.prepare(vector)?;
        self.rows.write().push(id, prepared)
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VecError> {
        let rows = self.rows.read();
        if rows.len() == 0 || k == 0 {
            return Ok(vec![]);
        }
        check_dim(vector.len(), rows.dim)?;
        let q = self.metric.prepare(vector)?;

        let dim = rows.dim;
        let chunk_rows = self.chunk_rows;
        let metric = self.metric;
        let mut merged: Vec<(usize, f32)> = rows
            .data
            .par_chunks(dim * chunk_rows)
            .enumerate()
            .flat_map_iter(|(chunk, data)| {
                let base = chunk * chunk_rows;
                let mut local: Vec<(usize, f32)> = data
                    .chunks_exact(dim)
                    .enumerate()
                    .map(|(i, row)| (base + i, metric.score(&q, row)))
                    .collect();
                top_k(metric, &mut local, k);
                local
            })
            .collect();
        top_k(metric, &mut merged, k);
        Ok(to_neighbors(&rows, merged))
    }

    fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn contains(&self, id: u64) -> bool {
        self.rows.read().contains(id)
    }
}
