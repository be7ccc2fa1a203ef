use newsdup_vecindex::VecError;
use thiserror::Error;

/// Errors returned by the classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnnError {
    #[error("knn: empty training corpus")]
    EmptyCorpus,

    #[error("knn: classifier has not been fitted")]
    NotTrained,

    #[error("knn: k must be at least 1")]
    InvalidK,

    #[error("knn: {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("knn: dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("knn: empty test set")]
    EmptyTestSet,

    #[error("knn: index error: {0}")]
    Index(String),
}

impl From<VecError> for KnnError {
    fn from(e: VecError) -> Self {
        match e {
            VecError::DimensionMismatch { got, want } => KnnError::DimensionMismatch {
                expected: want,
                got,
            },
            other => KnnError::Index(other.to_string()),
        }
    }
}
