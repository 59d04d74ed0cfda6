//! Query Evaluator (C6): drive the root operator's iterator, collect
//! `(docid, score)` pairs into a ranked list, sort and truncate (§4.6).
//!
//! Wrapping a bare query string in its model's default operator and parsing
//! the expression into a `ScoringExpr` are both external-parser concerns
//! (§1); `process_query` here takes the already-parsed root operator, which
//! is exactly step 3 onward of §4.6's five-step recipe.

use std::time::Instant;

use crate::error::RetrieveError;
use crate::index::IndexFacade;
use crate::model::RetrievalModel;
use crate::operators::scoring::ScoringExpr;

/// An ordered sequence of `(docid, score)` pairs (§3). Sort order after
/// `sort_and_truncate`: score descending, ties broken by external-docid
/// ascending.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScoreList {
    entries: Vec<(u32, f64)>,
}

impl ScoreList {
    pub fn new() -> Self {
        ScoreList::default()
    }

    pub fn push(&mut self, docid: u32, score: f64) {
        self.entries.push((docid, score));
    }

    pub fn entries(&self) -> &[(u32, f64)] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Sort by (score desc, external-docid asc) and truncate to `top_n`.
    /// Idempotent: calling this twice on an already-sorted, already-
    /// truncated list is a no-op (§8 law).
    pub fn sort_and_truncate(&mut self, top_n: usize, index: &dyn IndexFacade) -> Result<(), RetrieveError> {
        let mut external = Vec::with_capacity(self.entries.len());
        for &(docid, _) in &self.entries {
            external.push(index.external_docid(docid)?);
        }
        let mut indices: Vec<usize> = (0..self.entries.len()).collect();
        indices.sort_by(|&a, &b| {
            let (_, sa) = self.entries[a];
            let (_, sb) = self.entries[b];
            sb.partial_cmp(&sa)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| external[a].cmp(&external[b]))
        });
        let sorted: Vec<(u32, f64)> = indices.iter().map(|&i| self.entries[i]).collect();
        self.entries = sorted;
        self.entries.truncate(top_n);
        Ok(())
    }
}

/// `processQuery` (§4.6), steps 3-5: initialize the (already-parsed,
/// already-wrapped) root operator, collect matches, sort and truncate.
/// Returns an empty `ScoreList` if the root has no children (step 2's
/// "return empty if root has zero children" reduced to the pre-parsed
/// form: an empty composite).
pub fn process_query(
    root: &ScoringExpr,
    top_n: usize,
    model: &RetrievalModel,
    index: &dyn IndexFacade,
    deadline: Option<Instant>,
) -> Result<ScoreList, RetrieveError> {
    if root.child_count() == 0 {
        return Ok(ScoreList::new());
    }

    let mut node = root.initialize(index)?;
    let mut list = ScoreList::new();

    while node.has_match() {
        if let Some(deadline) = deadline {
            if Instant::now() >= deadline {
                break;
            }
        }
        let d = node.current_docid();
        let score = node.score(model, index)?;
        list.push(d, score);
        node.advance_past(d);
    }

    list.sort_and_truncate(top_n, index)?;
    Ok(list)
}

/// One `(queryId, ScoreList)` pair, or a failure recorded against that
/// query id (propagated as the empty-result placeholder per §7, with the
/// cause retained for the caller to report on stderr).
pub enum QueryOutcome {
    Ok(String, ScoreList),
    Failed(String, RetrieveError),
}

/// Batch entry point (supplemented, grounded on the teacher's
/// `batch_retrieve_bm25`): run `process_query` once per `(queryId,
/// ScoringExpr)` pair, continuing past per-query `QueryParseError`,
/// `ScoringInvariantViolated`, or `UnsupportedOperator` per the §7
/// propagation rule (those are fatal to the query, not the run).
pub fn process_queries(
    queries: &[(String, ScoringExpr)],
    top_n: usize,
    model: &RetrievalModel,
    index: &dyn IndexFacade,
    deadline_per_query: Option<std::time::Duration>,
) -> Vec<QueryOutcome> {
    queries
        .iter()
        .map(|(id, root)| {
            let deadline = deadline_per_query.map(|d| Instant::now() + d);
            match process_query(root, top_n, model, index, deadline) {
                Ok(list) => QueryOutcome::Ok(id.clone(), list),
                Err(e) => QueryOutcome::Failed(id.clone(), e),
            }
        })
        .collect()
}

impl ScoringExpr {
    fn child_count(&self) -> usize {
        match self {
            ScoringExpr::Score(_) => 1,
            ScoringExpr::And(c) | ScoringExpr::Or(c) | ScoringExpr::Sum(c) => c.len(),
            ScoringExpr::WAnd(c) | ScoringExpr::WSum(c) => c.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::operators::positional::PositionalExpr;

    fn sample_index() -> MemoryIndex {
        let mut idx = MemoryIndex::new();
        idx.add_document("doc-a", "body", &["dog", "run"]);
        idx.add_document("doc-b", "body", &["dog", "dog", "cat"]);
        idx.add_document("doc-c", "body", &["cat"]);
        idx
    }

    #[test]
    fn process_query_sorts_descending_by_score() {
        let idx = sample_index();
        let model = RetrievalModel::bm25_default();
        let root = ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "dog".into() });
        let list = process_query(&root, 10, &model, &idx, None).unwrap();
        assert_eq!(list.len(), 2);
        assert!(list.entries()[0].1 >= list.entries()[1].1);
    }

    #[test]
    fn sort_and_truncate_is_idempotent() {
        let idx = sample_index();
        let model = RetrievalModel::UnrankedBoolean;
        let root = ScoringExpr::Or(vec![
            ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "dog".into() }),
            ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "cat".into() }),
        ]);
        let mut list = process_query(&root, 10, &model, &idx, None).unwrap();
        let once = list.clone();
        list.sort_and_truncate(10, &idx).unwrap();
        assert_eq!(once, list);
    }

    #[test]
    fn empty_root_yields_empty_score_list() {
        let idx = sample_index();
        let model = RetrievalModel::bm25_default();
        let root = ScoringExpr::Sum(vec![]);
        let list = process_query(&root, 10, &model, &idx, None).unwrap();
        assert!(list.is_empty());
    }
}
