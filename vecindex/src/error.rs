use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VecError {
    #[error("vecindex: dimension mismatch: got {got}, want {want}")]
    DimensionMismatch { got: usize, want: usize },

    #[error("vecindex: id {0} already indexed")]
    DuplicateId(u64),

    #[error("vecindex: zero vector cannot be normalized")]
    ZeroVector,
}
