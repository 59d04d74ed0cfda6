//! Error types for the `rank-rank` CLI and pipeline glue (§7).

use std::fmt;

/// Run-level error kinds not already covered by `rank_retrieve::RetrieveError`
/// or `rank_learn::LearnError`. Maps onto the exit-code table in §6/§7:
/// `ParameterMissing`/`ParameterMalformed` and `IndexUnavailable` are fatal
/// to the whole run; `IOError` on output is logged and the run continues
/// unless it is the output-path open itself.
#[derive(Debug)]
pub enum RunError {
    ParameterMissing(String),
    ParameterMalformed(String),
    IndexUnavailable(String),
    IOError(String),
    Retrieve(rank_retrieve::RetrieveError),
    Learn(rank_learn::LearnError),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunError::ParameterMissing(key) => write!(f, "missing required parameter: {}", key),
            RunError::ParameterMalformed(msg) => write!(f, "malformed parameter: {}", msg),
            RunError::IndexUnavailable(msg) => write!(f, "index unavailable: {}", msg),
            RunError::IOError(msg) => write!(f, "I/O error: {}", msg),
            RunError::Retrieve(e) => write!(f, "{}", e),
            RunError::Learn(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for RunError {}

impl From<std::io::Error> for RunError {
    fn from(e: std::io::Error) -> Self {
        RunError::IOError(e.to_string())
    }
}

impl From<rank_retrieve::RetrieveError> for RunError {
    fn from(e: rank_retrieve::RetrieveError) -> Self {
        RunError::Retrieve(e)
    }
}

impl From<rank_learn::LearnError> for RunError {
    fn from(e: rank_learn::LearnError) -> Self {
        RunError::Learn(e)
    }
}
