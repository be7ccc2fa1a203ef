use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::error::VecError;

/// Similarity mode of an index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Metric {
    /// Vectors are L2-normalized on insert and query; the score is their
    /// inner product (higher is closer).
    #[default]
    Cosine,
    /// The score is the Euclidean distance (lower is closer).
    Euclidean,
}

impl Metric {
    /// Copy `v` into the form stored in (or queried against) an index.
    pub fn prepare(self, v: &[f32]) -> Result<Vec<f32>, VecError> {
        let mut out = v.to_vec();
        if self == Metric::Cosine && !l2_normalize(&mut out) {
            return Err(VecError::ZeroVector);
        }
        Ok(out)
    }

    /// Score two prepared vectors.
    ///
    /// Prepared cosine vectors are already unit length; dividing by their
    /// norms once more only absorbs f32 rounding, so a vector scored against
    /// itself yields exactly 1.0.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Metric::Cosine => cosine_similarity(a, b),
            Metric::Euclidean => euclidean_distance(a, b),
        }
    }

    /// Orders scores so that the closer one comes first.
    pub fn rank(self, a: f32, b: f32) -> Ordering {
        match self {
            Metric::Cosine => b.total_cmp(&a),
            Metric::Euclidean => a.total_cmp(&b),
        }
    }

    /// Map a score onto a similarity where larger means closer.
    ///
    /// Cosine scores pass through. Euclidean distances map to
    /// `1 / (1 + d)`, which lies in `(0, 1]`.
    pub fn similarity(self, score: f32) -> f32 {
        match self {
            Metric::Cosine => score,
            Metric::Euclidean => 1.0 / (1.0 + score.max(0.0)),
        }
    }
}

/// Scale `v` to unit length in place. Returns false (leaving `v` untouched)
/// when its norm is zero or not finite.
pub fn l2_normalize(v: &mut [f32]) -> bool {
    let norm: f64 = v.iter().map(|&x| (x as f64) * (x as f64)).sum::<f64>().sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return false;
    }
    for x in v.iter_mut() {
        *x = ((*x as f64) / norm) as f32;
    }
    true
}

/// Inner product with f64 accumulation.
pub fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| (x as f64) * (y as f64))
        .sum::<f64>() as f32
}

pub fn euclidean_distance(a: &[f32], b: &[f32]) -> f32 {
    a.iter()
        .zip(b)
        .map(|(&x, &y)| {
            let d = (x as f64) - (y as f64);
            d * d
        })
        .sum::<f64>()
        .sqrt() as f32
}

/// Textbook cosine similarity of two unnormalized vectors.
///
/// Returns 0.0 for zero vectors or dimension mismatches.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let mut dot: f64 = 0.0;
    let mut norm_a: f64 = 0.0;
    let mut norm_b: f64 = 0.0;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (x as f64, y as f64);
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b).sqrt()).clamp(-1.0, 1.0) as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_identical() {
        let s = cosine_similarity(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]);
        assert!((s - 1.0).abs() < 1e-6, "identical: got {s}");
    }

    #[test]
    fn test_orthogonal() {
        let s = cosine_similarity(&[1.0, 0.0, 0.0], &[0.0, 1.0, 0.0]);
        assert!(s.abs() < 1e-6, "orthogonal: got {s}");
    }

    #[test]
    fn test_zero_vector() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert_eq!(Metric::Cosine.prepare(&[0.0, 0.0]), Err(VecError::ZeroVector));
        assert!(Metric::Euclidean.prepare(&[0.0, 0.0]).is_ok());
    }

    #[test]
    fn test_self_score_is_exactly_one() {
        let v = Metric::Cosine.prepare(&[0.3, -1.7, 2.9, 0.01]).unwrap();
        assert_eq!(Metric::Cosine.score(&v, &v), 1.0);
    }

    #[test]
    fn test_rank_direction() {
        assert_eq!(Metric::Cosine.rank(0.9, 0.1), Ordering::Less);
        assert_eq!(Metric::Euclidean.rank(0.9, 0.1), Ordering::Greater);
    }

    #[test]
    fn test_euclidean_similarity() {
        assert_eq!(Metric::Euclidean.similarity(0.0), 1.0);
        assert!((Metric::Euclidean.similarity(1.0) - 0.5).abs() < 1e-6);
        assert_eq!(Metric::Cosine.similarity(0.42), 0.42);
    }

    fn nonzero_vec() -> impl Strategy<Value = Vec<f32>> {
        prop::collection::vec(-100.0f32..100.0, 8)
            .prop_filter("non-zero norm", |v| v.iter().any(|x| x.abs() > 1e-3))
    }

    proptest! {
        #[test]
        fn normalized_dot_matches_cosine(a in nonzero_vec(), b in nonzero_vec()) {
            let pa = Metric::Cosine.prepare(&a).unwrap();
            let pb = Metric::Cosine.prepare(&b).unwrap();
            let via_index = Metric::Cosine.score(&pa, &pb);
            let textbook = cosine_similarity(&a, &b);
            prop_assert!((via_index - textbook).abs() < 1e-6, "{via_index} vs {textbook}");
        }

        #[test]
        fn normalized_vectors_have_unit_norm(a in nonzero_vec()) {
            let pa = Metric::Cosine.prepare(&a).unwrap();
            prop_assert!((dot(&pa, &pa) - 1.0).abs() < 1e-5);
        }
    }
}
