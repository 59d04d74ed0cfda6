//! # rank-rank
//!
//! The query evaluator and run orchestrator for the `rank-*` information
//! retrieval ecosystem: read a parameter file, run every query in a query
//! file through an operator-tree evaluator over an inverted index (C1-C6),
//! optionally expand with pseudo-relevance feedback (C7), optionally
//! diversify (C8), and write a TREC-format ranking (C9). `retrievalAlgorithm
//! = ltr` additionally writes an LTR feature file for an external trainer
//! (C10, via [`rank_learn`]).
//!
//! ```no_run
//! use std::path::Path;
//!
//! rank_rank::pipeline::run(Path::new("params.txt")).unwrap();
//! ```
//!
//! # Modules
//!
//! - [`config`]: parameter-file parsing into a resolved [`config::RunConfig`].
//! - [`corpus`]: a minimal corpus loader into [`rank_retrieve::index::MemoryIndex`].
//! - [`query_parser`]: the query-expression parser (§6's operator syntax).
//! - [`io`]: query-file, intents-file, and TREC-ranking-file readers.
//! - [`diversify`]: xQuAD and PM2 re-ranking (C8).
//! - [`output`]: TREC six-column result writer (C9).
//! - [`pipeline`]: the end-to-end run, tying every module above together.

pub mod config;
pub mod corpus;
pub mod diversify;
pub mod error;
pub mod io;
pub mod output;
pub mod pipeline;
pub mod query_parser;

pub mod prelude {
    pub use crate::config::{Algorithm, DiversityAlgorithm, RunConfig};
    pub use crate::error::RunError;
    pub use crate::pipeline::run;
    pub use rank_retrieve::prelude::*;
}
