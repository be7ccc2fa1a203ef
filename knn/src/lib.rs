//! K-nearest-neighbor category classification.
//!
//! [`KnnClassifier`] indexes a labeled embedding corpus and labels queries
//! by majority vote among their nearest neighbors. [`Evaluation`] scores a
//! batch of predictions with accuracy and macro-averaged precision, recall
//! and F1.

pub mod classifier;
pub mod error;
pub mod evaluate;
pub mod tally;

pub use classifier::{KnnClassifier, KnnConfig, Prediction};
pub use error::KnnError;
pub use evaluate::{ConfusionMatrix, Evaluation};
pub use tally::VoteTally;
