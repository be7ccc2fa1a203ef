use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::KnnError;

/// Counts of (true label, predicted label) pairs.
///
/// Labels are the sorted union of true and predicted labels. `counts[t][p]`
/// is the number of test rows with true label `labels[t]` predicted as
/// `labels[p]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfusionMatrix {
    pub labels: Vec<String>,
    pub counts: Vec<Vec<usize>>,
}

impl ConfusionMatrix {
    pub fn build<S: AsRef<str>>(truth: &[S], predicted: &[S]) -> Self {
        let labels: Vec<String> = truth
            .iter()
            .chain(predicted)
            .map(|s| s.as_ref().to_string())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let mut counts = vec![vec![0usize; labels.len()]; labels.len()];
        for (t, p) in truth.iter().zip(predicted) {
            let ti = position(&labels, t.as_ref());
            let pi = position(&labels, p.as_ref());
            if let (Some(ti), Some(pi)) = (ti, pi) {
                counts[ti][pi] += 1;
            }
        }
        Self { labels, counts }
    }

    /// Count for one (true, predicted) pair; 0 for unknown labels.
    pub fn get(&self, truth: &str, predicted: &str) -> usize {
        match (position(&self.labels, truth), position(&self.labels, predicted)) {
            (Some(t), Some(p)) => self.counts[t][p],
            _ => 0,
        }
    }

    fn true_positives(&self, i: usize) -> usize {
        self.counts[i][i]
    }

    /// Rows predicted as label `i`.
    fn predicted_total(&self, i: usize) -> usize {
        self.counts.iter().map(|row| row[i]).sum()
    }

    /// Rows whose true label is `i`.
    fn actual_total(&self, i: usize) -> usize {
        self.counts[i].iter().sum()
    }
}

fn position(labels: &[String], label: &str) -> Option<usize> {
    labels.binary_search_by(|l| l.as_str().cmp(label)).ok()
}

fn ratio(num: usize, den: usize) -> f64 {
    if den == 0 { 0.0 } else { num as f64 / den as f64 }
}

/// Classification quality over a labeled test set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Evaluation {
    pub accuracy: f64,
    pub precision_macro: f64,
    pub recall_macro: f64,
    pub f1_macro: f64,
    pub avg_confidence: f64,
    /// Number of test rows.
    pub support: usize,
    pub confusion: ConfusionMatrix,
}

impl Evaluation {
    /// Score predictions against ground truth.
    ///
    /// Macro averages weigh every label in the union of true and predicted
    /// labels equally. F1 is averaged per label.
    pub fn from_predictions<S: AsRef<str>>(
        truth: &[S],
        predicted: &[S],
        confidences: &[f32],
    ) -> Result<Self, KnnError> {
        if truth.is_empty() {
            return Err(KnnError::EmptyTestSet);
        }
        if predicted.len() != truth.len() || confidences.len() != truth.len() {
            return Err(KnnError::LengthMismatch {
                rows: truth.len(),
                labels: predicted.len().min(confidences.len()),
            });
        }

        let confusion = ConfusionMatrix::build(truth, predicted);
        let n = truth.len();
        let correct: usize = (0..confusion.labels.len())
            .map(|i| confusion.true_positives(i))
            .sum();

        let (mut p_sum, mut r_sum, mut f_sum) = (0.0, 0.0, 0.0);
        for i in 0..confusion.labels.len() {
            let tp = confusion.true_positives(i);
            let p = ratio(tp, confusion.predicted_total(i));
            let r = ratio(tp, confusion.actual_total(i));
            let f = if p + r == 0.0 { 0.0 } else { 2.0 * p * r / (p + r) };
            p_sum += p;
            r_sum += r;
            f_sum += f;
        }
        let labels = confusion.labels.len() as f64;

        Ok(Self {
            accuracy: ratio(correct, n),
            precision_macro: p_sum / labels,
            recall_macro: r_sum / labels,
            f1_macro: f_sum / labels,
            avg_confidence: confidences.iter().map(|&c| c as f64).sum::<f64>() / n as f64,
            support: n,
            confusion,
        })
    }
}
