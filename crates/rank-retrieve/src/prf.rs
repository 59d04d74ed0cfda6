//! Pseudo-Relevance Feedback expansion (C7, §4.7).
//!
//! From a top-k ranking, compute Indri-style expansion-term scores with the
//! `sumOfPrevDocs` accumulator shortcut, then build an expanded `#WAND`
//! query combining the original query with the expansion terms.
//!
//! The accumulator shortcut factors the background (zero-tf) contribution
//! out of the per-document, per-term loop: `rawSumOfPrevDocs = Σᵢ
//! μ·sᵢ/(Lᵢ+μ)` is identical for every term, so it is computed once; each
//! term's tf-bearing contribution is then accumulated only over the
//! documents in which it actually occurs, and the two are combined at the
//! end (`idf(t)·(tfPart(t) + pTC(t)·rawSumOfPrevDocs)`), which is
//! algebraically identical to summing `contribᵢ(t)` (tf-bearing or
//! zero-tf) over every document directly. Crucially, this means a term
//! with `tfPart(t) == 0` (absent from every top-k document) still gets a
//! real score — the pure background term `idf(t)·pTC(t)·rawSumOfPrevDocs` —
//! so the candidate term set is the whole field vocabulary, not just the
//! terms observed with tf>0 in a ranked document.

use std::collections::{HashMap, HashSet};

use crate::error::RetrieveError;
use crate::evaluator::ScoreList;
use crate::index::IndexFacade;
use crate::operators::positional::PositionalExpr;
use crate::operators::scoring::ScoringExpr;

fn is_expansion_candidate(term: &str) -> bool {
    !term.is_empty() && !term.contains('.') && !term.contains(',') && term.is_ascii()
}

/// Compute expansion-term scores from a (already truncated to `prf:numDocs`)
/// top-k ranking, returning the top `num_terms` by score descending, tied
/// by term ascending (the Expansion-Term-List sort order, §3).
pub fn expand_terms(
    ranking: &ScoreList,
    expansion_field: &str,
    mu: f64,
    num_terms: usize,
    index: &dyn IndexFacade,
) -> Result<Vec<(String, f64)>, RetrieveError> {
    let total_field_length = index.sum_of_field_lengths(expansion_field)?.max(1) as f64;

    let mut raw_sum_of_prev_docs = 0.0;
    let mut tf_part: HashMap<String, f64> = HashMap::new();

    for &(docid, score) in ranking.entries() {
        let length = index.field_length(expansion_field, docid)? as f64;
        raw_sum_of_prev_docs += mu * score / (length + mu);

        let term_vector = index.term_vector(docid, expansion_field)?;
        for (i, stem) in term_vector.stems.iter().enumerate() {
            let Some(term) = stem else { continue };
            if !is_expansion_candidate(term) {
                continue;
            }
            let tf = term_vector.stem_freq[i] as f64;
            if tf == 0.0 {
                continue;
            }
            *tf_part.entry(term.clone()).or_insert(0.0) += score * tf / (length + mu);
        }
    }

    // The Accumulator Identity (§8) holds for *every* collection term, not
    // only ones observed with tf>0 in a ranked doc: a term absent from every
    // top-k document still gets a pure background-only score via
    // `raw_sum_of_prev_docs`. Seed the term universe from the whole
    // collection's vocabulary for this field, not just `tf_part`'s keys.
    let mut vocabulary: HashSet<String> = tf_part.keys().cloned().collect();
    for docid in 0..index.num_docs() {
        let term_vector = index.term_vector(docid as u32, expansion_field)?;
        for stem in term_vector.stems.iter().flatten() {
            if is_expansion_candidate(stem) {
                vocabulary.insert(stem.clone());
            }
        }
    }

    let mut scored: Vec<(String, f64)> = Vec::with_capacity(vocabulary.len());
    for term in vocabulary {
        let ctf = index.total_term_freq(expansion_field, &term)? as f64;
        if ctf == 0.0 {
            continue;
        }
        let tf_contribution = tf_part.get(&term).copied().unwrap_or(0.0);
        let p_tc = ctf / total_field_length;
        let idf = (total_field_length / ctf).ln();
        let score = idf * (tf_contribution + p_tc * raw_sum_of_prev_docs);
        scored.push((term, score));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal).then_with(|| a.0.cmp(&b.0))
    });
    scored.truncate(num_terms);
    Ok(scored)
}

/// Build `#WAND(w · defaultOp(originalQuery)  (1−w) · #WAND(<score> <term>
/// …))` (§4.7), ready for re-evaluation via C6. `original_root` is the
/// already-parsed, already-wrapped original query.
pub fn build_expanded_query(
    original_root: ScoringExpr,
    expansion_terms: &[(String, f64)],
    expansion_field: &str,
    orig_weight: f64,
) -> ScoringExpr {
    let expansion_children = expansion_terms
        .iter()
        .map(|(term, score)| {
            (
                *score,
                ScoringExpr::Score(PositionalExpr::Term {
                    field: expansion_field.to_string(),
                    term: term.clone(),
                }),
            )
        })
        .collect();

    ScoringExpr::WAnd(vec![
        (orig_weight, original_root),
        (1.0 - orig_weight, ScoringExpr::WAnd(expansion_children)),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;

    #[test]
    fn accumulator_identity_for_term_missing_from_every_doc() {
        // §8 Law: for a term in no top-k doc, score == idf(t) · (Σᵢ
        // sᵢ·μ·pTC(t)/(Lᵢ+μ)), the pure background contribution — not an
        // absent term.
        let mut idx = MemoryIndex::new();
        let mut d1_tokens = vec!["alpha"; 3];
        d1_tokens.extend(std::iter::repeat("filler").take(97));
        idx.add_document("d1", "body", &d1_tokens);
        let mut d2_tokens = vec!["beta"; 1];
        d2_tokens.extend(std::iter::repeat("filler").take(49));
        idx.add_document("d2", "body", &d2_tokens);
        // Seed "ghost" into collection stats via a third, unranked document.
        idx.add_document("d3", "body", &["ghost", "ghost"]);

        let d1 = idx.internal_docid("d1").unwrap();
        let d2 = idx.internal_docid("d2").unwrap();
        let mut ranking = ScoreList::new();
        ranking.push(d1, 0.1);
        ranking.push(d2, 0.05);

        let mu = 2500.0;
        let scores = expand_terms(&ranking, "body", mu, 10, &idx).unwrap();
        let (_, ghost_score) =
            scores.iter().find(|(t, _)| t == "ghost").expect("ghost gets a pure background score");

        let total_field_length = idx.sum_of_field_lengths("body").unwrap() as f64;
        let raw_sum_of_prev_docs = mu * 0.1 / (100.0 + mu) + mu * 0.05 / (50.0 + mu);
        let ctf = idx.total_term_freq("body", "ghost").unwrap() as f64;
        let p_tc = ctf / total_field_length;
        let idf = (total_field_length / ctf).ln();
        let expected = idf * p_tc * raw_sum_of_prev_docs;

        assert!((ghost_score - expected).abs() < 1e-9);
        assert!(*ghost_score > 0.0);
    }

    #[test]
    fn expansion_scores_favor_terms_concentrated_in_top_document() {
        // §8 concrete scenario 5 (shape, not exact constants): alpha occurs
        // only in the higher-scored document.
        let mut idx = MemoryIndex::new();
        let mut d1_tokens = vec!["alpha"; 3];
        d1_tokens.extend(std::iter::repeat("filler").take(97));
        idx.add_document("d1", "body", &d1_tokens);
        let mut d2_tokens = vec!["filler"; 50];
        idx.add_document("d2", "body", &d2_tokens);
        idx.add_document("d3", "body", &["alpha", "alpha"]);

        let d1 = idx.internal_docid("d1").unwrap();
        let d2 = idx.internal_docid("d2").unwrap();
        let mut ranking = ScoreList::new();
        ranking.push(d1, 0.1);
        ranking.push(d2, 0.05);

        let scores = expand_terms(&ranking, "body", 2500.0, 10, &idx).unwrap();
        let alpha_score = scores.iter().find(|(t, _)| t == "alpha").unwrap().1;
        assert!(alpha_score > 0.0);
    }

    #[test]
    fn filters_punctuation_and_non_ascii_terms() {
        assert!(!is_expansion_candidate("foo."));
        assert!(!is_expansion_candidate("foo,bar"));
        assert!(!is_expansion_candidate("café"));
        assert!(is_expansion_candidate("dog"));
    }
}
