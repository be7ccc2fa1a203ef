//! Exact nearest-neighbor search over dense float32 vectors.
//!
//! Indexes are append-only: entries are never updated or removed, which
//! matches embeddings being immutable once written. Two implementations
//! share the [`VecIndex`] trait and are picked at runtime via [`IndexKind`].

pub mod chunked;
pub mod error;
pub mod flat;
pub mod index;
pub mod metric;
mod rows;

pub use chunked::ChunkedIndex;
pub use error::VecError;
pub use flat::FlatIndex;
pub use index::{IndexKind, Neighbor, VecIndex, build_index};
pub use metric::{Metric, cosine_similarity, dot, euclidean_distance, l2_normalize};
