#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TreeError {
    #[error("insert value is absent")]
    InvalidInput,
    #[error("tree invariant violated: {0}")]
    InvariantViolation(String),
}
