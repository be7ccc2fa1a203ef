use std::collections::HashSet;

use crate::error::VecError;
use crate::index::Neighbor;
use crate::metric::Metric;

/// Row-major storage shared by the exact indexes.
pub(crate) struct Rows {
    pub(crate) dim: usize,
    pub(crate) ids: Vec<u64>,
    pub(crate) data: Vec<f32>,
    seen: HashSet<u64>,
}

impl Rows {
    pub(crate) fn new(dim: usize) -> Self {
        Self {
            dim,
            ids: Vec::new(),
            data: Vec::new(),
            seen: HashSet::new(),
        }
    }

    pub(crate) fn push(&mut self, id: u64, prepared: Vec<f32>) -> Result<(), VecError> {
        if !self.seen.insert(id) {
            return Err(VecError::DuplicateId(id));
        }
        self.ids.push(id);
        self.data.extend_from_slice(&prepared);
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.ids.len()
    }

    pub(crate) fn contains(&self, id: u64) -> bool {
        self.seen.contains(&id)
    }
}

pub(crate) fn check_dim(got: usize, want: usize) -> Result<(), VecError> {
    if got != want {
        return Err(VecError::DimensionMismatch { got, want });
    }
    Ok(())
}

/// Sort `(position, score)` pairs closest first, breaking ties by insertion
/// position, and keep the first `k`.
pub(crate) fn top_k(metric: Metric, scored: &mut Vec<(usize, f32)>, k: usize) {
    scored.sort_by(|a, b| metric.rank(a.1, b.1).then(a.0.cmp(&b.0)));
    scored.truncate(k);
}

pub(crate) fn to_neighbors(rows: &Rows, scored: Vec<(usize, f32)>) -> Vec<Neighbor> {
    scored
        .into_iter()
        .map(|(pos, score)| Neighbor {
            id: rows.ids[pos],
            score,
        })
        .collect()
}
