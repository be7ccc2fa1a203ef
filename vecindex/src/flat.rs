use parking_lot::RwLock;

use crate::error::VecError;
use crate::index::{Neighbor, VecIndex};
use crate::metric::Metric;
use crate::rows::{Rows, check_dim, to_neighbors, top_k};

/// FlatIndex is an exact VecIndex that scores every entry on each query.
pub struct FlatIndex {
    metric: Metric,
    rows: RwLock<Rows>,
}

impl FlatIndex {
    /// Create an empty index. Panics if `dim` is 0.
    pub fn new(metric: Metric, dim: usize) -> Self {
        assert!(dim > 0, "vecindex: dim must be positive");
        Self {
            metric,
            rows: RwLock::new(Rows::new(dim)),
        }
    }
}

impl VecIndex for FlatIndex {
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

        let mut scored: Vec<(usize, f32)> = rows
            .data
            .chunks_exact(rows.dim)
            .enumerate()
            .map(|(pos, row)| (pos, self.metric.score(&q, row)))
            .collect();
        top_k(self.metric, &mut scored, k);
        Ok(to_neighbors(&rows, scored))
    }

    fn len(&self) -> usize {
        self.rows.read().len()
    }

    fn contains(&self, id: u64) -> bool {
        self.rows.read().contains(id)
    }
}
