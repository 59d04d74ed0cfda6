//! LTR Feature Extractor (C10, glue).
//!
//! `spec.md` §1 describes this component as "a predictable bag of per-field
//! scores" emitted for external learners, not a component with its own
//! design. We extract one BM25 score per field (four fields, the glossary's
//! `body`/`title`/`url`/`inlink` example) for a `(query, document)` pair,
//! using `rank_retrieve`'s operator tree for the scoring itself so the
//! features are computed the same way retrieval scores are.

use rank_retrieve::index::IndexFacade;
use rank_retrieve::model::RetrievalModel;
use rank_retrieve::operators::positional::PositionalExpr;
use rank_retrieve::operators::scoring::ScoringExpr;

use crate::error::LearnError;

/// The four fields a feature vector is computed over.
pub const FEATURE_FIELDS: [&str; 4] = ["body", "title", "url", "inlink"];

/// A per-(query, doc) feature vector: one BM25 score per field in
/// [`FEATURE_FIELDS`] order. `0.0` means the field did not match any query
/// term for this document, not that it scored exactly zero.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct FeatureVector {
    pub scores: [f64; 4],
}

/// Extract a feature vector for one `(query_terms, docid)` pair. Terms that
/// do not occur in a given field for this document contribute `0.0` to that
/// field's score (BM25's `Or` semantics: score is the max over matching
/// query terms, or `0.0` if none match).
pub fn extract_features(
    index: &dyn IndexFacade,
    query_terms: &[String],
    docid: u32,
    bm25: RetrievalModel,
) -> Result<FeatureVector, LearnError> {
    if query_terms.is_empty() {
        return Err(LearnError::EmptyInput);
    }

    let mut scores = [0.0; 4];
    for (i, field) in FEATURE_FIELDS.iter().enumerate() {
        scores[i] = score_field_for_doc(index, field, query_terms, docid, &bm25)?;
    }
    Ok(FeatureVector { scores })
}

fn score_field_for_doc(
    index: &dyn IndexFacade,
    field: &str,
    query_terms: &[String],
    docid: u32,
    model: &RetrievalModel,
) -> Result<f64, LearnError> {
    if index.doc_count(field).is_err() {
        // Field absent from this index entirely: contributes nothing.
        return Ok(0.0);
    }

    let root = ScoringExpr::Or(
        query_terms
            .iter()
            .map(|t| ScoringExpr::Score(PositionalExpr::Term { field: field.to_string(), term: t.clone() }))
            .collect(),
    );
    let mut node = root
        .initialize(index)
        .map_err(|e| LearnError::InvalidParameter(e.to_string()))?;

    while node.has_match() {
        let d = node.current_docid();
        if d == docid {
            return node.score(model, index).map_err(|e| LearnError::InvalidParameter(e.to_string()));
        }
        if d > docid {
            break;
        }
        node.advance_past(d);
    }
    Ok(0.0)
}

/// Write one line per `(docid, relevance, feature vector)` in the
/// space-separated `qid:<id>` SVMlight-style format both `svm_rank` and
/// `RankLib` accept.
pub fn format_training_line(query_id: &str, relevance: u8, features: &FeatureVector) -> String {
    let mut line = format!("{} qid:{}", relevance, query_id);
    for (i, score) in features.scores.iter().enumerate() {
        line.push_str(&format!(" {}:{}", i + 1, score));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_retrieve::index::MemoryIndex;

    #[test]
    fn missing_field_contributes_zero_not_an_error() {
        let mut index = MemoryIndex::new();
        let docid = index.add_document("d1", "body", &["dog", "run"]);
        let model = RetrievalModel::bm25_default();
        let fv = extract_features(&index, &["dog".to_string()], docid, model).unwrap();
        assert!(fv.scores[0] > 0.0);
        assert_eq!(fv.scores[1], 0.0);
        assert_eq!(fv.scores[2], 0.0);
        assert_eq!(fv.scores[3], 0.0);
    }

    #[test]
    fn training_line_has_one_to_one_field_index() {
        let fv = FeatureVector { scores: [1.0, 0.0, 2.5, 0.0] };
        let line = format_training_line("7", 2, &fv);
        assert_eq!(line, "2 qid:7 1:1 2:0 3:2.5 4:0");
    }
}
