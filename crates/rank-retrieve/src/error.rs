//! Error types for rank-retrieve.

use std::fmt;

/// Errors that can occur during index access, query evaluation, or PRF expansion.
#[derive(Debug, Clone, PartialEq)]
pub enum RetrieveError {
    /// Empty query provided.
    EmptyQuery,
    /// Empty index (no documents indexed).
    EmptyIndex,
    /// Invalid parameter value.
    InvalidParameter(String),
    /// The index facade could not be opened or read.
    IndexUnavailable(String),
    /// A field name not present in the index was referenced.
    UnknownField(String),
    /// An internal docid outside `0..numDocs()` was referenced.
    UnknownDocid(u32),
    /// The query expression could not be parsed.
    QueryParseError(String),
    /// A scoring operator was asked to score a docid it does not currently match.
    ScoringInvariantViolated(String),
    /// A retrieval model and operator combination has no defined scoring rule.
    UnsupportedOperator(String),
    /// Other error (for extensibility).
    Other(String),
}

impl fmt::Display for RetrieveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetrieveError::EmptyQuery => write!(f, "query is empty"),
            RetrieveError::EmptyIndex => write!(f, "index is empty"),
            RetrieveError::InvalidParameter(msg) => write!(f, "invalid parameter: {}", msg),
            RetrieveError::IndexUnavailable(msg) => write!(f, "index unavailable: {}", msg),
            RetrieveError::UnknownField(field) => write!(f, "unknown field: {}", field),
            RetrieveError::UnknownDocid(d) => write!(f, "unknown docid: {}", d),
            RetrieveError::QueryParseError(msg) => write!(f, "query parse error: {}", msg),
            RetrieveError::ScoringInvariantViolated(msg) => {
                write!(f, "scoring invariant violated: {}", msg)
            }
            RetrieveError::UnsupportedOperator(msg) => write!(f, "unsupported operator: {}", msg),
            RetrieveError::Other(msg) => write!(f, "error: {}", msg),
        }
    }
}

impl std::error::Error for RetrieveError {}
