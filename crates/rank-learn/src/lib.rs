//! Learning-to-rank glue.
//!
//! Model fitting itself is a non-goal: the actual LambdaMART/ranking-SVM
//! training runs in an external trainer (`svm_rank`, RankLib), invoked here
//! as an opaque subprocess. This crate's job is the part upstream of that
//! boundary — extracting a per-field feature vector for a `(query, doc)`
//! pair using the same scoring machinery `rank-retrieve` uses for live
//! retrieval — and the part downstream of it — shelling out to the
//! configured trainer binary with those features written in its expected
//! format.
//!
//! # Quick start
//!
//! ```rust
//! use rank_retrieve::index::MemoryIndex;
//! use rank_retrieve::model::RetrievalModel;
//! use rank_learn::features::extract_features;
//!
//! let mut index = MemoryIndex::new();
//! let docid = index.add_document("doc-a", "body", &["the", "quick", "fox"]);
//!
//! let features = extract_features(
//!     &index,
//!     &["quick".to_string()],
//!     docid,
//!     RetrievalModel::bm25_default(),
//! ).unwrap();
//! assert!(features.scores[0] > 0.0);
//! ```

/// Error types for feature extraction and trainer invocation.
pub mod error;

/// LTR Feature Extractor (C10): per-field BM25 feature vectors.
pub mod features;

/// Subprocess glue for external trainers (`svm_rank`, RankLib).
pub mod trainer;

pub use error::LearnError;

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::error::LearnError;
    pub use crate::features::{extract_features, format_training_line, FeatureVector, FEATURE_FIELDS};
    pub use crate::trainer::{invoke, TrainerConfig, TrainingExample};
}
