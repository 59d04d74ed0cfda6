//! Error types for rank-learn.

use std::fmt;

/// Errors from feature extraction or from invoking an external LTR trainer.
#[derive(Debug, Clone, PartialEq)]
pub enum LearnError {
    /// Feature extraction was asked to run over an empty candidate set.
    EmptyInput,
    /// A field referenced by a feature was not present in the index.
    UnknownField(String),
    /// A parameter (e.g. a trainer binary path) was missing or malformed.
    InvalidParameter(String),
    /// The configured trainer binary could not be spawned.
    IoError(String),
    /// The trainer subprocess exited with a non-zero status.
    ProcessFailed { exit_code: Option<i32>, stderr: String },
}

impl fmt::Display for LearnError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LearnError::EmptyInput => write!(f, "empty input"),
            LearnError::UnknownField(field) => write!(f, "unknown field: {}", field),
            LearnError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            LearnError::IoError(msg) => write!(f, "I/O error: {}", msg),
            LearnError::ProcessFailed { exit_code, stderr } => {
                write!(f, "trainer process failed (exit code {:?}): {}", exit_code, stderr)
            }
        }
    }
}

impl std::error::Error for LearnError {}

impl From<std::io::Error> for LearnError {
    fn from(e: std::io::Error) -> Self {
        LearnError::IoError(e.to_string())
    }
}
