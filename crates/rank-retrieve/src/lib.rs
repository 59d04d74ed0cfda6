//! Operator-tree query evaluation over an inverted index.
//!
//! This crate evaluates a structured query expression — already compiled
//! into a tree of positional and scoring operators by an external parser —
//! against an inverted index, producing a ranked list of documents under
//! one of four retrieval models (Unranked Boolean, Ranked Boolean, BM25,
//! Indri). It can expand a query via pseudo-relevance feedback from an
//! initial ranking.
//!
//! # Pipeline
//!
//! - **Index Facade** ([`index`]): read-only corpus statistics, doc-id
//!   mapping, and postings.
//! - **Positional operators** ([`operators::positional`]): Term, Synonym,
//!   Ordered Near/k, Unordered Window/k — synthesize new postings from
//!   child postings.
//! - **Scoring operators** ([`operators::scoring`]): Score, And, Or, Sum,
//!   WAnd, WSum — dispatch across retrieval models.
//! - **Retrieval models** ([`model`]): value objects for k1/b/k3/mu/lambda.
//! - **Query evaluator** ([`evaluator`]): drives the root operator,
//!   collects a `ScoreList`, sorts and truncates.
//! - **PRF expansion** ([`prf`]): Indri-style expansion-term scoring and
//!   expanded-query construction.
//!
//! # Example
//!
//! ```rust
//! use rank_retrieve::index::{IndexFacade, MemoryIndex};
//! use rank_retrieve::model::RetrievalModel;
//! use rank_retrieve::operators::positional::PositionalExpr;
//! use rank_retrieve::operators::scoring::ScoringExpr;
//! use rank_retrieve::evaluator::process_query;
//!
//! let mut index = MemoryIndex::new();
//! index.add_document("doc-a", "body", &["the", "quick", "fox"]);
//!
//! let root = ScoringExpr::Score(PositionalExpr::Term {
//!     field: "body".to_string(),
//!     term: "quick".to_string(),
//! });
//! let model = RetrievalModel::bm25_default();
//! let results = process_query(&root, 10, &model, &index, None).unwrap();
//! assert!(!results.is_empty());
//! ```

/// Error types for index access, query evaluation, and PRF expansion.
pub mod error;

/// Posting and inverted-list data model (C2).
pub mod posting;

/// Index Facade (C1): corpus statistics, doc-id mapping, postings, term
/// vectors.
pub mod index;

/// Retrieval Models (C5): value objects and dispatch identity.
pub mod model;

/// Positional (C3) and scoring (C4) operator trees.
pub mod operators;

/// Query Evaluator (C6): drive a root operator, collect a `ScoreList`.
pub mod evaluator;

/// Pseudo-Relevance Feedback expansion (C7).
pub mod prf;

pub use error::RetrieveError;

/// Re-exports of the commonly used types.
pub mod prelude {
    pub use crate::error::RetrieveError;
    pub use crate::evaluator::{process_queries, process_query, QueryOutcome, ScoreList};
    pub use crate::index::{IndexFacade, MemoryIndex, TermVector};
    pub use crate::model::RetrievalModel;
    pub use crate::operators::positional::{PositionalExpr, PositionalNode};
    pub use crate::operators::scoring::{ScoringExpr, ScoringNode};
    pub use crate::prf::{build_expanded_query, expand_terms};
}
