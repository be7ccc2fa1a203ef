use newsdup_vecindex::{IndexKind, Metric, Neighbor, VecIndex, build_index};
use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::KnnError;
use crate::evaluate::Evaluation;
use crate::tally::VoteTally;

/// Controls classifier behavior.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KnnConfig {
    /// Neighbors consulted per query; also the confidence denominator.
    pub k: usize,
    pub metric: Metric,
    pub index: IndexKind,
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self {
            k: 5,
            metric: Metric::Cosine,
            index: IndexKind::Flat,
        }
    }
}

/// Result of classifying one embedding.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,

    /// Votes for `label` divided by the requested k.
    pub confidence: f32,

    pub votes: VoteTally,

    /// Neighbor positions in the training corpus with their scores.
    #[serde(skip)]
    pub neighbors: Vec<Neighbor>,
}

struct Model {
    index: Box<dyn VecIndex>,
    labels: Vec<String>,
}

/// Majority-vote k-nearest-neighbor classifier.
///
/// Fitting replaces the whole model. Classification only reads the model,
/// so a fitted classifier can serve queries from many threads.
pub struct KnnClassifier {
    cfg: KnnConfig,
    model: Option<Model>,
}

impl std::fmt::Debug for KnnClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnnClassifier")
            .field("cfg", &self.cfg)
            .field("rows", &self.len())
            .finish()
    }
}

impl KnnClassifier {
    pub fn new(cfg: KnnConfig) -> Self {
        Self { cfg, model: None }
    }

    pub fn config(&self) -> &KnnConfig {
        &self.cfg
    }

    pub fn is_trained(&self) -> bool {
        self.model.is_some()
    }

    /// Number of training rows, 0 before fitting.
    pub fn len(&self) -> usize {
        self.model.as_ref().map_or(0, |m| m.labels.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Train on `rows` labeled by `labels`.
    ///
    /// On error the previous model, if any, is kept.
    pub fn fit<S: AsRef<str>>(&mut self, rows: &[Vec<f32>], labels: &[S]) -> Result<(), KnnError> {
        if self.cfg.k == 0 {
            return Err(KnnError::InvalidK);
        }
        if rows.is_empty() {
            return Err(KnnError::EmptyCorpus);
        }
        if rows.len() != labels.len() {
            return Err(KnnError::LengthMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }
        let dim = rows[0].len();
        if dim == 0 {
            return Err(KnnError::DimensionMismatch { expected: 1, got: 0 });
        }
        if let Some(bad) = rows.iter().find(|r| r.len() != dim) {
            return Err(KnnError::DimensionMismatch {
                expected: dim,
                got: bad.len(),
            });
        }

        let index = build_index(self.cfg.index, self.cfg.metric, dim);
        for (pos, row) in rows.iter().enumerate() {
            index.add(pos as u64, row)?;
        }
        self.model = Some(Model {
            index,
            labels: labels.iter().map(|l| l.as_ref().to_string()).collect(),
        });
        info!(rows = rows.len(), dim, k = self.cfg.k, "fitted knn classifier");
        Ok(())
    }

    /// Classify `query` by majority vote among its `k` nearest neighbors.
    ///
    /// With fewer than `k` training rows every row votes, and confidence is
    /// still divided by `k`.
    pub fn classify(&self, query: &[f32], k: usize) -> Result<Prediction, KnnError> {
        if k == 0 {
            return Err(KnnError::InvalidK);
        }
        let model = self.model.as_ref().ok_or(KnnError::NotTrained)?;
        let neighbors = model.index.query(query, k.min(model.labels.len()))?;

        let mut votes = VoteTally::new();
        for n in &neighbors {
            if let Some(label) = model.labels.get(n.id as usize) {
                votes.add(label);
            }
        }
        let (label, count) = votes
            .winner()
            .map(|(l, c)| (l.to_string(), c))
            .ok_or(KnnError::EmptyCorpus)?;
        debug!(label = %label, count, k, "classified");

        Ok(Prediction {
            label,
            confidence: count as f32 / k as f32,
            votes,
            neighbors,
        })
    }

    /// Classify every query in parallel. Results keep input order.
    pub fn classify_batch(&self, queries: &[Vec<f32>], k: usize) -> Result<Vec<Prediction>, KnnError> {
        queries.par_iter().map(|q| self.classify(q, k)).collect()
    }

    /// Classify a labeled test set with the configured k and score it.
    pub fn evaluate<S: AsRef<str>>(&self, rows: &[Vec<f32>], labels: &[S]) -> Result<Evaluation, KnnError> {
        if !self.is_trained() {
            return Err(KnnError::NotTrained);
        }
        if rows.is_empty() {
            return Err(KnnError::EmptyTestSet);
        }
        if rows.len() != labels.len() {
            return Err(KnnError::LengthMismatch {
                rows: rows.len(),
                labels: labels.len(),
            });
        }

        let predictions = self.classify_batch(rows, self.cfg.k)?;
        let truth: Vec<&str> = labels.iter().map(|l| l.as_ref()).collect();
        let predicted: Vec<&str> = predictions.iter().map(|p| p.label.as_str()).collect();
        let confidences: Vec<f32> = predictions.iter().map(|p| p.confidence).collect();
        let ev = Evaluation::from_predictions(&truth, &predicted, &confidences)?;
        info!(
            support = ev.support,
            accuracy = ev.accuracy,
            f1_macro = ev.f1_macro,
            "evaluated knn classifier"
        );
        Ok(ev)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(deg: f32) -> Vec<f32> {
        let r = deg.to_radians();
        vec![r.cos(), r.sin()]
    }

    fn corpus() -> (Vec<Vec<f32>>, Vec<&'static str>) {
        let rows = vec![unit(0.0), unit(2.0), unit(4.0), unit(6.0), unit(8.0), unit(90.0), unit(92.0)];
        let labels = vec!["economia", "economia", "economia", "economia", "politica", "politica", "politica"];
        (rows, labels)
    }

    #[test]
    fn majority_of_five_gives_point_eight() {
        let (rows, labels) = corpus();
        let mut clf = KnnClassifier::new(KnnConfig::default());
        clf.fit(&rows, &labels).unwrap();

        let p = clf.classify(&unit(3.0), 5).unwrap();
        assert_eq!(p.label, "economia");
        assert!((p.confidence - 0.8).abs() < 1e-6);
        assert_eq!(p.votes.get("politica"), 1);
        assert_eq!(p.neighbors.len(), 5);
    }

    #[test]
    fn before_fit_is_not_trained() {
        let clf = KnnClassifier::new(KnnConfig::default());
        assert_eq!(clf.classify(&[1.0, 0.0], 5).unwrap_err(), KnnError::NotTrained);
        assert_eq!(
            clf.evaluate(&[vec![1.0, 0.0]], &["x"]).unwrap_err(),
            KnnError::NotTrained
        );
    }

    #[test]
    fn fit_rejects_bad_input() {
        let mut clf = KnnClassifier::new(KnnConfig::default());
        let none: [&str; 0] = [];
        assert_eq!(clf.fit(&[], &none).unwrap_err(), KnnError::EmptyCorpus);
        assert!(matches!(
            clf.fit(&[vec![1.0, 0.0]], &["a", "b"]).unwrap_err(),
            KnnError::LengthMismatch { rows: 1, labels: 2 }
        ));
        assert!(matches!(
            clf.fit(&[vec![1.0, 0.0], vec![1.0]], &["a", "b"]).unwrap_err(),
            KnnError::DimensionMismatch { expected: 2, got: 1 }
        ));
        assert!(!clf.is_trained());
    }

    #[test]
    fn small_corpus_reduces_confidence() {
        let mut clf = KnnClassifier::new(KnnConfig::default());
        clf.fit(&[unit(0.0), unit(1.0)], &["a", "a"]).unwrap();
        let p = clf.classify(&unit(0.5), 5).unwrap();
        assert_eq!(p.label, "a");
        assert!((p.confidence - 0.4).abs() < 1e-6);
    }

    #[test]
    fn zero_k_is_invalid() {
        let (rows, labels) = corpus();
        let mut clf = KnnClassifier::new(KnnConfig::default());
        clf.fit(&rows, &labels).unwrap();
        assert_eq!(clf.classify(&unit(0.0), 0).unwrap_err(), KnnError::InvalidK);

        let mut bad = KnnClassifier::new(KnnConfig { k: 0, ..KnnConfig::default() });
        assert_eq!(bad.fit(&rows, &labels).unwrap_err(), KnnError::InvalidK);
    }

    #[test]
    fn query_dimension_is_checked() {
        let (rows, labels) = corpus();
        let mut clf = KnnClassifier::new(KnnConfig::default());
        clf.fit(&rows, &labels).unwrap();
        assert_eq!(
            clf.classify(&[1.0, 0.0, 0.0], 5).unwrap_err(),
            KnnError::DimensionMismatch { expected: 2, got: 3 }
        );
    }

    #[test]
    fn batch_matches_sequential() {
        let (rows, labels) = corpus();
        let mut clf = KnnClassifier::new(KnnConfig {
            k: 3,
            metric: Metric::Cosine,
            index: IndexKind::Chunked,
        });
        clf.fit(&rows, &labels).unwrap();

        let queries: Vec<Vec<f32>> = (0..40).map(|i| unit(i as f32 * 3.0)).collect();
        let batch = clf.classify_batch(&queries, 3).unwrap();
        for (q, p) in queries.iter().zip(&batch) {
            assert_eq!(&clf.classify(q, 3).unwrap(), p);
        }
    }

    #[test]
    fn evaluate_uses_configured_k() {
        let (rows, labels) = corpus();
        let mut clf = KnnClassifier::new(KnnConfig { k: 1, ..KnnConfig::default() });
        clf.fit(&rows, &labels).unwrap();

        let test = vec![unit(1.0), unit(91.0)];
        let ev = clf.evaluate(&test, &["economia", "politica"]).unwrap();
        assert_eq!(ev.support, 2);
        assert!((ev.accuracy - 1.0).abs() < 1e-9);
        assert!((ev.avg_confidence - 1.0).abs() < 1e-9);
    }
}
