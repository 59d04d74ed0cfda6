//! Retrieval Models (C5): value objects holding k1, b, k3, mu, lambda and
//! the dispatch identity every scoring operator branches on.
//!
//! Grounded on the teacher's `Bm25Params`/`SmoothingMethod` (bm25.rs,
//! query_likelihood.rs), but unified into the single tagged enum the spec's
//! §9 "Dynamic dispatch over retrieval models" design note calls for, since
//! scoring (C4) now dispatches by variant rather than by feature-gated type.

/// The `origWeight` open question (§9): does it belong on the model or on
/// the PRF config? We decided it belongs on the model, since `Indri` is
/// exactly where the teacher's `RetrievalModelIndri` carried the (unreached)
/// 3-arg constructor; PRF reads it from here rather than duplicating it in
/// `prf.rs`'s own config. See DESIGN.md.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetrievalModel {
    UnrankedBoolean,
    RankedBoolean,
    Bm25 { k1: f64, b: f64, k3: f64 },
    Indri { mu: f64, lambda: f64, orig_weight: Option<f64> },
}

impl RetrievalModel {
    pub fn bm25_default() -> Self {
        RetrievalModel::Bm25 { k1: 1.2, b: 0.75, k3: 0.0 }
    }

    pub fn indri_default() -> Self {
        RetrievalModel::Indri { mu: 2500.0, lambda: 0.4, orig_weight: None }
    }

    /// The outermost implicit operator a bare query string is wrapped in
    /// (§4.5): `and` for Indri, `sum` for BM25, `or` for the two Boolean
    /// models.
    pub fn default_qry_sop_name(&self) -> &'static str {
        match self {
            RetrievalModel::UnrankedBoolean => "or",
            RetrievalModel::RankedBoolean => "or",
            RetrievalModel::Bm25 { .. } => "sum",
            RetrievalModel::Indri { .. } => "and",
        }
    }

    pub fn is_indri(&self) -> bool {
        matches!(self, RetrievalModel::Indri { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_qry_sop_name_matches_spec_table() {
        assert_eq!(RetrievalModel::UnrankedBoolean.default_qry_sop_name(), "or");
        assert_eq!(RetrievalModel::RankedBoolean.default_qry_sop_name(), "or");
        assert_eq!(RetrievalModel::bm25_default().default_qry_sop_name(), "sum");
        assert_eq!(RetrievalModel::indri_default().default_qry_sop_name(), "and");
    }
}
