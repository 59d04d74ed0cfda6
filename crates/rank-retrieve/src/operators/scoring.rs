//! Scoring Operators (C4): `Score`, `And`, `Or`, `Sum`, `WAnd`, `WSum`,
//! each dispatching across the four retrieval models (§4.4). Composite
//! nodes own either other scoring nodes (weighted variants also own a
//! parallel `weights` vector and cache `total_weight`, per §3).

use crate::error::RetrieveError;
use crate::index::IndexFacade;
use crate::model::RetrievalModel;
use crate::operators::positional::{PositionalExpr, PositionalNode};

/// A scoring sub-expression, prior to evaluation against an index.
#[derive(Debug, Clone)]
pub enum ScoringExpr {
    Score(PositionalExpr),
    And(Vec<ScoringExpr>),
    Or(Vec<ScoringExpr>),
    Sum(Vec<ScoringExpr>),
    WAnd(Vec<(f64, ScoringExpr)>),
    WSum(Vec<(f64, ScoringExpr)>),
}

/// A scoring operator after `initialize`.
#[derive(Debug, Clone)]
pub enum ScoringNode {
    Score(PositionalNode),
    And(Vec<ScoringNode>),
    Or(Vec<ScoringNode>),
    Sum(Vec<ScoringNode>),
    WAnd(Vec<(f64, ScoringNode)>, f64),
    WSum(Vec<(f64, ScoringNode)>, f64),
}

impl ScoringExpr {
    pub fn initialize(&self, index: &dyn IndexFacade) -> Result<ScoringNode, RetrieveError> {
        Ok(match self {
            ScoringExpr::Score(p) => ScoringNode::Score(p.initialize(index)?),
            ScoringExpr::And(cs) => ScoringNode::And(init_all(cs, index)?),
            ScoringExpr::Or(cs) => ScoringNode::Or(init_all(cs, index)?),
            ScoringExpr::Sum(cs) => ScoringNode::Sum(init_all(cs, index)?),
            ScoringExpr::WAnd(cs) => {
                let children = init_weighted(cs, index)?;
                let total = children.iter().map(|(w, _)| w).sum();
                ScoringNode::WAnd(children, total)
            }
            ScoringExpr::WSum(cs) => {
                let children = init_weighted(cs, index)?;
                let total = children.iter().map(|(w, _)| w).sum();
                ScoringNode::WSum(children, total)
            }
        })
    }
}

fn init_all(cs: &[ScoringExpr], index: &dyn IndexFacade) -> Result<Vec<ScoringNode>, RetrieveError> {
    cs.iter().map(|c| c.initialize(index)).collect()
}

fn init_weighted(
    cs: &[(f64, ScoringExpr)],
    index: &dyn IndexFacade,
) -> Result<Vec<(f64, ScoringNode)>, RetrieveError> {
    cs.iter().map(|(w, c)| Ok((*w, c.initialize(index)?))).collect()
}

impl ScoringNode {
    /// `has_match(model)` (§4.4 table). `And` requires strict intersection
    /// (aligning children, per C2's `has_match_all`); the union operators
    /// (`Or`/`Sum`/`WAnd`/`WSum`) need at least one matching child
    /// (`has_match_min`). Mutates child cursors when alignment is needed;
    /// idempotent otherwise, per the C2 invariant.
    pub fn has_match(&mut self) -> bool {
        match self {
            ScoringNode::Score(p) => p.has_match(),
            ScoringNode::And(children) => align_intersection(children),
            ScoringNode::Or(children) | ScoringNode::Sum(children) => {
                // Every child must be visited even after one reports a match:
                // a later sibling can be a composite `And`/`WAnd` node whose
                // own `has_match()` performs cursor-aligning side effects
                // that `has_match_unchecked()`/`score()` depend on.
                children.iter_mut().map(|c| c.has_match()).collect::<Vec<_>>().into_iter().any(|m| m)
            }
            ScoringNode::WAnd(children, _) | ScoringNode::WSum(children, _) => children
                .iter_mut()
                .map(|(_, c)| c.has_match())
                .collect::<Vec<_>>()
                .into_iter()
                .any(|m| m),
        }
    }

    pub fn current_docid(&self) -> u32 {
        match self {
            ScoringNode::Score(p) => p.current_docid(),
            ScoringNode::And(children) => children[0].current_docid(),
            ScoringNode::Or(children) | ScoringNode::Sum(children) => {
                children.iter().filter(|c| c.has_match_unchecked()).map(|c| c.current_docid()).min().unwrap()
            }
            ScoringNode::WAnd(children, _) | ScoringNode::WSum(children, _) => children
                .iter()
                .filter(|(_, c)| c.has_match_unchecked())
                .map(|(_, c)| c.current_docid())
                .min()
                .unwrap(),
        }
    }

    /// Read-only match check used once alignment/has_match has already run;
    /// never advances a cursor. Safe to call repeatedly.
    fn has_match_unchecked(&self) -> bool {
        match self {
            ScoringNode::Score(p) => p.has_match(),
            ScoringNode::And(children) => children.iter().all(|c| c.has_match_unchecked()),
            ScoringNode::Or(children) | ScoringNode::Sum(children) => {
                children.iter().any(|c| c.has_match_unchecked())
            }
            ScoringNode::WAnd(children, _) | ScoringNode::WSum(children, _) => {
                children.iter().any(|(_, c)| c.has_match_unchecked())
            }
        }
    }

    pub fn advance_past(&mut self, d: u32) {
        match self {
            ScoringNode::Score(p) => p.advance_past(d),
            ScoringNode::And(children) => {
                for c in children.iter_mut() {
                    c.advance_past(d);
                }
            }
            ScoringNode::Or(children) | ScoringNode::Sum(children) => {
                for c in children.iter_mut() {
                    if c.has_match() && c.current_docid() == d {
                        c.advance_past(d);
                    }
                }
            }
            ScoringNode::WAnd(children, _) | ScoringNode::WSum(children, _) => {
                for (_, c) in children.iter_mut() {
                    if c.has_match() && c.current_docid() == d {
                        c.advance_past(d);
                    }
                }
            }
        }
    }

    /// `score(model)`: the caller must have just confirmed `has_match()`.
    pub fn score(&mut self, model: &RetrievalModel, index: &dyn IndexFacade) -> Result<f64, RetrieveError> {
        if !self.has_match_unchecked() {
            return Err(RetrieveError::ScoringInvariantViolated(
                "score() called on a non-matching operator".into(),
            ));
        }
        match model {
            RetrievalModel::UnrankedBoolean => Ok(1.0),
            RetrievalModel::RankedBoolean => self.score_ranked_boolean(index),
            RetrievalModel::Bm25 { k1, b, k3 } => self.score_bm25(*k1, *b, *k3, index),
            RetrievalModel::Indri { mu, lambda, .. } => {
                let d = self.current_docid();
                self.score_indri(*mu, *lambda, index, d)
            }
        }
    }

    /// `default_score(model, d)` (§4.4): the smoothed background probability
    /// used in place of a child's score when it does not match `d`. Only
    /// Indri defines a non-zero default; the other models are not weighted
    /// combinations of probabilities and so contribute nothing when absent.
    pub fn default_score(
        &self,
        model: &RetrievalModel,
        index: &dyn IndexFacade,
        docid: u32,
    ) -> Result<f64, RetrieveError> {
        match model {
            RetrievalModel::Indri { mu, lambda, .. } => self.default_score_indri(*mu, *lambda, index, docid),
            _ => Ok(0.0),
        }
    }

    // --- Ranked Boolean --------------------------------------------------

    fn score_ranked_boolean(&mut self, index: &dyn IndexFacade) -> Result<f64, RetrieveError> {
        match self {
            ScoringNode::Score(p) => Ok(p.tf_of_doc() as f64),
            ScoringNode::And(children) => matching_child_scores_ranked(children, index)?
                .into_iter()
                .fold(None, |acc, s| Some(acc.map_or(s, |m: f64| m.min(s))))
                .ok_or_else(|| {
                    RetrieveError::ScoringInvariantViolated("And with no matching children".into())
                }),
            ScoringNode::Or(children) => matching_child_scores_ranked(children, index)?
                .into_iter()
                .fold(None, |acc, s| Some(acc.map_or(s, |m: f64| m.max(s))))
                .ok_or_else(|| {
                    RetrieveError::ScoringInvariantViolated("Or with no matching children".into())
                }),
            ScoringNode::Sum(children) => {
                Ok(matching_child_scores_ranked(children, index)?.into_iter().sum())
            }
            // Ranked Boolean is silent on weighted operators; documented
            // choice (DESIGN.md): WAnd mirrors And (min, weights unused)
            // and WSum mirrors a weighted Sum.
            ScoringNode::WAnd(children, _) => {
                let mut scores = Vec::new();
                for (_, c) in children.iter_mut() {
                    if c.has_match_unchecked() {
                        scores.push(c.score_ranked_boolean(index)?);
                    }
                }
                scores
                    .into_iter()
                    .fold(None, |acc, s| Some(acc.map_or(s, |m: f64| m.min(s))))
                    .ok_or_else(|| {
                        RetrieveError::ScoringInvariantViolated("WAnd with no matching children".into())
                    })
            }
            ScoringNode::WSum(children, _) => {
                let mut total = 0.0;
                for (w, c) in children.iter_mut() {
                    if c.has_match_unchecked() {
                        total += *w * c.score_ranked_boolean(index)?;
                    }
                }
                Ok(total)
            }
        }
    }

    // --- BM25 --------------------------------------------------------------

    fn score_bm25(&mut self, k1: f64, b: f64, k3: f64, index: &dyn IndexFacade) -> Result<f64, RetrieveError> {
        match self {
            ScoringNode::Score(p) => bm25_leaf_score(p, k1, b, k3, 1.0, index),
            ScoringNode::And(children) | ScoringNode::Sum(children) => {
                let mut total = 0.0;
                for c in children.iter_mut() {
                    if c.has_match_unchecked() {
                        total += c.score_bm25(k1, b, k3, index)?;
                    }
                }
                Ok(total)
            }
            ScoringNode::Or(children) => {
                let mut best: Option<f64> = None;
                for c in children.iter_mut() {
                    if c.has_match_unchecked() {
                        let s = c.score_bm25(k1, b, k3, index)?;
                        best = Some(best.map_or(s, |b| b.max(s)));
                    }
                }
                best.ok_or_else(|| RetrieveError::ScoringInvariantViolated("Or with no matching children".into()))
            }
            ScoringNode::WSum(children, _) => {
                let mut total = 0.0;
                for (w, c) in children.iter_mut() {
                    if c.has_match_unchecked() {
                        total += *w * c.score_bm25(k1, b, k3, index)?;
                    }
                }
                Ok(total)
            }
            // Open question (§9): BM25 WAnd short-circuits to 0 as soon as
            // any matching child scores exactly 0, unlike Sum/WSum which
            // simply omit non-matching children. We preserve that
            // short-circuit rather than silently reconciling it with Sum.
            ScoringNode::WAnd(children, _) => {
                let mut total = 0.0;
                for (w, c) in children.iter_mut() {
                    if c.has_match_unchecked() {
                        let s = c.score_bm25(k1, b, k3, index)?;
                        if s == 0.0 {
                            return Ok(0.0);
                        }
                        total += *w * s;
                    }
                }
                Ok(total)
            }
        }
    }

    // --- Indri ---------------------------------------------------------

    fn score_indri(&mut self, mu: f64, lambda: f64, index: &dyn IndexFacade, d: u32) -> Result<f64, RetrieveError> {
        match self {
            ScoringNode::Score(p) => indri_leaf_score(p, mu, lambda, index),
            ScoringNode::And(children) => {
                let vals = score_or_default_indri_all(children.iter_mut(), mu, lambda, index, d)?;
                let n = vals.len() as f64;
                Ok(vals.iter().map(|v| v.ln() / n).sum::<f64>().exp())
            }
            ScoringNode::Or(children) => {
                let vals = score_or_default_indri_all(children.iter_mut(), mu, lambda, index, d)?;
                Ok(1.0 - vals.iter().map(|v| 1.0 - v).product::<f64>())
            }
            ScoringNode::Sum(children) => {
                let vals = score_or_default_indri_all(children.iter_mut(), mu, lambda, index, d)?;
                let n = vals.len() as f64;
                Ok(vals.iter().sum::<f64>() / n)
            }
            ScoringNode::WAnd(children, total_weight) => {
                let tw = *total_weight;
                let pairs = score_or_default_indri_weighted(children.iter_mut(), mu, lambda, index, d)?;
                Ok(pairs.iter().map(|(w, v)| (w / tw) * v.ln()).sum::<f64>().exp())
            }
            ScoringNode::WSum(children, total_weight) => {
                let tw = *total_weight;
                let pairs = score_or_default_indri_weighted(children.iter_mut(), mu, lambda, index, d)?;
                Ok(pairs.iter().map(|(w, v)| (w / tw) * v).sum())
            }
        }
    }

    fn default_score_indri(
        &self,
        mu: f64,
        lambda: f64,
        index: &dyn IndexFacade,
        docid: u32,
    ) -> Result<f64, RetrieveError> {
        match self {
            ScoringNode::Score(p) => indri_leaf_default_score(p, mu, lambda, index, docid),
            ScoringNode::And(children) => {
                let n = children.len() as f64;
                let mut total = 0.0;
                for c in children {
                    total += c.default_score_indri(mu, lambda, index, docid)?.ln();
                }
                Ok((total / n).exp())
            }
            ScoringNode::Or(children) => {
                let mut product = 1.0;
                for c in children {
                    product *= 1.0 - c.default_score_indri(mu, lambda, index, docid)?;
                }
                Ok(1.0 - product)
            }
            ScoringNode::Sum(children) => {
                let n = children.len() as f64;
                let mut total = 0.0;
                for c in children {
                    total += c.default_score_indri(mu, lambda, index, docid)?;
                }
                Ok(total / n)
            }
            ScoringNode::WAnd(children, total_weight) => {
                let mut total = 0.0;
                for (w, c) in children {
                    total += (w / total_weight) * c.default_score_indri(mu, lambda, index, docid)?.ln();
                }
                Ok(total.exp())
            }
            ScoringNode::WSum(children, total_weight) => {
                let mut total = 0.0;
                for (w, c) in children {
                    total += (w / total_weight) * c.default_score_indri(mu, lambda, index, docid)?;
                }
                Ok(total)
            }
        }
    }
}

fn align_intersection(children: &mut [ScoringNode]) -> bool {
    loop {
        if children.iter_mut().any(|c| !c.has_match()) {
            return false;
        }
        let target = children.iter().map(|c| c.current_docid()).max().unwrap();
        let mut all_eq = true;
        for c in children.iter_mut() {
            while c.has_match() && c.current_docid() < target {
                let cur = c.current_docid();
                c.advance_past(cur);
            }
            if !c.has_match() {
                return false;
            }
            if c.current_docid() != target {
                all_eq = false;
            }
        }
        if all_eq {
            return true;
        }
    }
}

fn matching_child_scores_ranked(
    children: &mut [ScoringNode],
    index: &dyn IndexFacade,
) -> Result<Vec<f64>, RetrieveError> {
    let mut out = Vec::new();
    for c in children.iter_mut() {
        if c.has_match_unchecked() {
            out.push(c.score_ranked_boolean(index)?);
        }
    }
    Ok(out)
}

fn score_or_default_indri(
    child: &mut ScoringNode,
    mu: f64,
    lambda: f64,
    index: &dyn IndexFacade,
    d: u32,
) -> Result<f64, RetrieveError> {
    if child.has_match() && child.current_docid() == d {
        child.score_indri(mu, lambda, index, d)
    } else {
        child.default_score_indri(mu, lambda, index, d)
    }
}

fn score_or_default_indri_all<'a>(
    children: impl Iterator<Item = &'a mut ScoringNode>,
    mu: f64,
    lambda: f64,
    index: &dyn IndexFacade,
    d: u32,
) -> Result<Vec<f64>, RetrieveError> {
    children.map(|c| score_or_default_indri(c, mu, lambda, index, d)).collect()
}

fn score_or_default_indri_weighted<'a>(
    children: impl Iterator<Item = &'a mut (f64, ScoringNode)>,
    mu: f64,
    lambda: f64,
    index: &dyn IndexFacade,
    d: u32,
) -> Result<Vec<(f64, f64)>, RetrieveError> {
    children
        .map(|(w, c)| Ok((*w, score_or_default_indri(c, mu, lambda, index, d)?)))
        .collect()
}

fn bm25_leaf_score(
    p: &PositionalNode,
    k1: f64,
    b: f64,
    k3: f64,
    qtf: f64,
    index: &dyn IndexFacade,
) -> Result<f64, RetrieveError> {
    let field = p.field();
    let docid = p.current_docid();
    let tf = p.tf_of_doc() as f64;
    let df = p.df() as f64;
    let n = index.doc_count(field)? as f64;
    let l = index.field_length(field, docid)? as f64;
    let avg_l = index.sum_of_field_lengths(field)? as f64 / n.max(1.0);

    let rsj = (((n - df + 0.5) / (df + 0.5)).ln()).max(0.0);
    let tf_w = tf / (tf + k1 * ((1.0 - b) + b * l / avg_l.max(1e-9)));
    let user_w = (k3 + 1.0) * qtf / (k3 + qtf);
    Ok(rsj * tf_w * user_w)
}

fn indri_p_mle(ctf: u64, total_field_length: u64) -> f64 {
    let total = (total_field_length.max(1)) as f64;
    if ctf == 0 {
        0.5 / total
    } else {
        ctf as f64 / total
    }
}

fn indri_leaf_score(p: &PositionalNode, mu: f64, lambda: f64, index: &dyn IndexFacade) -> Result<f64, RetrieveError> {
    let field = p.field();
    let docid = p.current_docid();
    let tf = p.tf_of_doc() as f64;
    let l = index.field_length(field, docid)? as f64;
    let total = index.sum_of_field_lengths(field)?;
    let p_mle = indri_p_mle(p.ctf(), total);
    Ok((1.0 - lambda) * (tf + mu * p_mle) / (l + mu) + lambda * p_mle)
}

fn indri_leaf_default_score(
    p: &PositionalNode,
    mu: f64,
    lambda: f64,
    index: &dyn IndexFacade,
    docid: u32,
) -> Result<f64, RetrieveError> {
    let field = p.field();
    let l = index.field_length(field, docid)? as f64;
    let total = index.sum_of_field_lengths(field)?;
    let p_mle = indri_p_mle(p.ctf(), total);
    Ok((1.0 - lambda) * (mu * p_mle) / (l + mu) + lambda * p_mle)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;
    use crate::operators::positional::PositionalExpr;

    fn bm25_index() -> MemoryIndex {
        // Concrete scenario 1 (§8): 10 docs, field body, term "dog" with
        // df=3, ctf=5: d0(tf=3,L=100), d1(tf=2,L=200), d2(tf=1,L=50),
        // remaining 7 docs carry only filler tokens for their length.
        let mut idx = MemoryIndex::new();
        let mut doc = |tokens: Vec<&'static str>| tokens;
        let d0: Vec<&str> = {
            let mut v = vec!["dog"; 3];
            v.extend(std::iter::repeat("filler").take(97));
            v
        };
        let d1: Vec<&str> = {
            let mut v = vec!["dog"; 2];
            v.extend(std::iter::repeat("filler").take(198));
            v
        };
        let d2: Vec<&str> = {
            let mut v = vec!["dog"; 1];
            v.extend(std::iter::repeat("filler").take(49));
            v
        };
        idx.add_document("d0", "body", &doc(d0));
        idx.add_document("d1", "body", &doc(d1));
        idx.add_document("d2", "body", &doc(d2));
        for i in 3..10 {
            idx.add_document(&format!("d{i}"), "body", &vec!["filler"; 10]);
        }
        idx
    }

    #[test]
    fn bm25_score_ranks_by_tf_and_length() {
        let idx = bm25_index();
        let expr = ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "dog".into() });
        let model = RetrievalModel::Bm25 { k1: 1.2, b: 0.75, k3: 0.0 };
        let mut node = expr.initialize(&idx).unwrap();

        let mut scores = Vec::new();
        while node.has_match() {
            let d = node.current_docid();
            scores.push((d, node.score(&model, &idx).unwrap()));
            node.advance_past(d);
        }
        assert_eq!(scores.len(), 3);
        // d0 has the highest tf and shortest relative length: highest score.
        assert!(scores[0].1 > scores[1].1);
        assert!(scores[1].1 > scores[2].1);
    }

    #[test]
    fn bm25_sum_over_single_term_equals_score() {
        let idx = bm25_index();
        let model = RetrievalModel::Bm25 { k1: 1.2, b: 0.75, k3: 0.0 };
        let term = PositionalExpr::Term { field: "body".into(), term: "dog".into() };

        let mut score_node = ScoringExpr::Score(term.clone()).initialize(&idx).unwrap();
        let mut sum_node = ScoringExpr::Sum(vec![ScoringExpr::Score(term)]).initialize(&idx).unwrap();

        assert!(score_node.has_match());
        assert!(sum_node.has_match());
        let d = score_node.current_docid();
        assert_eq!(d, sum_node.current_docid());
        let s1 = score_node.score(&model, &idx).unwrap();
        let s2 = sum_node.score(&model, &idx).unwrap();
        assert!((s1 - s2).abs() < 1e-9);
    }

    #[test]
    fn indri_and_uses_default_score_for_missing_term() {
        // Concrete scenario 2 (§8).
        let mut idx = MemoryIndex::new();
        let mut tokens = vec!["dog"; 2];
        tokens.extend(std::iter::repeat("filler").take(98));
        idx.add_document("d1", "body", &tokens);
        // Seed collection stats for "cat" elsewhere without it occurring in d1.
        idx.add_document("d2", "body", &["cat", "cat", "cat", "cat"]);

        let model = RetrievalModel::Indri { mu: 2500.0, lambda: 0.4, orig_weight: None };
        let expr = ScoringExpr::And(vec![
            ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "dog".into() }),
            ScoringExpr::Score(PositionalExpr::Term { field: "body".into(), term: "cat".into() }),
        ]);
        let mut node = expr.initialize(&idx).unwrap();
        assert!(node.has_match());
        let d1 = idx.internal_docid("d1").unwrap();
        assert_eq!(node.current_docid(), d1);
        let score = node.score(&model, &idx).unwrap();
        assert!(score > 0.0);
    }

    #[test]
    fn unranked_boolean_scores_are_always_one() {
        let idx = bm25_index();
        let model = RetrievalModel::UnrankedBoolean;
        let term = PositionalExpr::Term { field: "body".into(), term: "dog".into() };
        let mut node = ScoringExpr::Or(vec![ScoringExpr::Score(term)]).initialize(&idx).unwrap();
        while node.has_match() {
            let d = node.current_docid();
            assert_eq!(node.score(&model, &idx).unwrap(), 1.0);
            node.advance_past(d);
        }
    }
}
