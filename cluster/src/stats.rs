use serde::{Deserialize, Serialize};

/// Running mean and variance of the similarity scores observed when
/// non-centroid articles join a cluster (Welford's online algorithm).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimilarityStats {
    /// Number of samples seen.
    pub samples: u64,
    /// Mean of the samples.
    pub mean: f64,
    /// Sum of squared deviations from the mean.
    pub m2: f64,
}

impl SimilarityStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample.
    pub fn push(&mut self, x: f64) {
        self.samples += 1;
        let delta = x - self.mean;
        self.mean += delta / self.samples as f64;
        self.m2 += delta * (x - self.mean);
    }

    /// Return a copy with `x` fed in.
    pub fn with(mut self, x: f64) -> Self {
        self.push(x);
        self
    }

    /// Sample variance, `M2 / (n - 1)`; 0 with fewer than two samples.
    pub fn variance(&self) -> f64 {
        if self.samples > 1 {
            self.m2 / (self.samples - 1) as f64
        } else {
            0.0
        }
    }

    pub fn std_dev(&self) -> f64 {
        self.variance().sqrt()
    }
}
