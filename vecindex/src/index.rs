use serde::{Deserialize, Serialize};

use crate::chunked::ChunkedIndex;
use crate::error::VecError;
use crate::flat::FlatIndex;
use crate::metric::Metric;

/// A single result from a nearest-neighbor query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    /// Identifier given to [`VecIndex::add`].
    pub id: u64,

    /// Inner product of the normalized vectors (Cosine, higher is closer) or
    /// Euclidean distance (lower is closer).
    pub score: f32,
}

/// VecIndex is the interface for nearest-neighbor search over dense float32
/// vectors.
///
/// All implementations must be safe for concurrent use (Send + Sync). An
/// entry becomes visible to queries once `add` has returned, never earlier.
pub trait VecIndex: Send + Sync {
    /// Similarity mode the index was built with.
    fn metric(&self) -> Metric;

    /// Vector dimension accepted by `add` and `query`.
    fn dim(&self) -> usize;

    /// Append a vector. Ids are unique; adding one twice fails.
    fn add(&self, id: u64, vector: &[f32]) -> Result<(), VecError>;

    /// Return the `k` nearest entries, closest first. Entries with equal
    /// scores keep insertion order. An empty index yields an empty result.
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<Neighbor>, VecError>;

    /// Return the number of vectors in the index.
    fn len(&self) -> usize;

    /// Return true if the index contains no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Return true if `id` has been added.
    fn contains(&self, id: u64) -> bool;
}

/// Which [`VecIndex`] implementation to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    /// Sequential brute-force scan.
    #[default]
    Flat,
    /// Brute-force scan split into chunks scored in parallel.
    Chunked,
}

/// Construct an empty index. Panics if `dim` is 0.
pub fn build_index(kind: IndexKind, metric: Metric, dim: usize) -> Box<dyn VecIndex> {
    match kind {
        IndexKind::Flat => Box::new(FlatIndex::new(metric, dim)),
        IndexKind::Chunked => Box::new(ChunkedIndex::new(metric, dim)),
    }
}
