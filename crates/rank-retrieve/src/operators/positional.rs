//! Positional Operators (C3): Term, Synonym, Ordered Near/k, Unordered
//! Window/k. Every operator evaluates eagerly at `initialize` (§4.3) and
//! caches a synthesized inverted list; once built, a `PositionalNode`
//! exposes exactly the `IopBase` cursor contract from C2 plus the four
//! accessors (`field`, `tf_of_doc`, `ctf`, `df`) every positional operator
//! needs. This collapses the "operator polymorphism" design note (§9) into
//! one concrete node type: the variants below only describe *how* to build
//! the synthesized list, not a separate runtime interface.

use crate::error::RetrieveError;
use crate::index::IndexFacade;
use crate::posting::{InvertedList, Posting, PostingCursor};

/// A positional sub-expression, prior to evaluation against an index.
#[derive(Debug, Clone)]
pub enum PositionalExpr {
    Term { field: String, term: String },
    Synonym(Vec<PositionalExpr>),
    OrderedNear { k: u32, children: Vec<PositionalExpr> },
    UnorderedWindow { k: u32, children: Vec<PositionalExpr> },
}

/// A positional operator after `initialize`: a field name and a cursor over
/// its synthesized inverted list.
#[derive(Debug, Clone)]
pub struct PositionalNode {
    field: String,
    cursor: PostingCursor,
}

impl PositionalNode {
    pub fn has_match(&self) -> bool {
        self.cursor.has_match()
    }

    pub fn current_docid(&self) -> u32 {
        self.cursor.current_docid()
    }

    pub fn current_posting(&self) -> &Posting {
        self.cursor.current_posting()
    }

    pub fn advance_past(&mut self, d: u32) {
        self.cursor.advance_past(d);
    }

    /// Advance until `current_docid() >= min_docid` or exhausted.
    fn advance_to(&mut self, min_docid: u32) {
        while self.has_match() && self.current_docid() < min_docid {
            let cur = self.current_docid();
            self.advance_past(cur);
        }
    }

    pub fn field(&self) -> &str {
        &self.field
    }

    /// `getTfOfDoc()`: length of the current posting's positions.
    pub fn tf_of_doc(&self) -> usize {
        self.current_posting().tf()
    }

    /// `getCtf()`: collection term frequency of the synthesized list.
    pub fn ctf(&self) -> u64 {
        self.cursor.list().ctf()
    }

    /// `getDf()`: number of postings in the synthesized list.
    pub fn df(&self) -> usize {
        self.cursor.list().df()
    }
}

impl PositionalExpr {
    pub fn initialize(&self, index: &dyn IndexFacade) -> Result<PositionalNode, RetrieveError> {
        match self {
            PositionalExpr::Term { field, term } => {
                let list = index.postings(field, term)?;
                Ok(PositionalNode { field: field.clone(), cursor: PostingCursor::new(list) })
            }
            PositionalExpr::Synonym(children) => {
                let mut nodes = initialize_children(children, index)?;
                let field = common_field(&nodes)?;
                let mut out = Vec::new();
                loop {
                    let Some(d) = nodes.iter().filter(|n| n.has_match()).map(|n| n.current_docid()).min()
                    else {
                        break;
                    };
                    let mut merged: Vec<u32> = Vec::new();
                    for n in nodes.iter_mut() {
                        if n.has_match() && n.current_docid() == d {
                            merged.extend_from_slice(&n.current_posting().positions);
                            n.advance_past(d);
                        }
                    }
                    merged.sort_unstable();
                    merged.dedup();
                    if !merged.is_empty() {
                        out.push(Posting::new(d, merged));
                    }
                }
                Ok(PositionalNode { field, cursor: PostingCursor::new(InvertedList::new(out)) })
            }
            PositionalExpr::OrderedNear { k, children } => {
                let mut nodes = initialize_children(children, index)?;
                let field = common_field(&nodes)?;
                let mut out = Vec::new();
                while let Some(d) = next_common_docid(&mut nodes) {
                    let lists: Vec<&[u32]> =
                        nodes.iter().map(|n| n.current_posting().positions.as_slice()).collect();
                    let positions = ordered_near_positions(*k, &lists);
                    if !positions.is_empty() {
                        out.push(Posting::new(d, positions));
                    }
                    for n in nodes.iter_mut() {
                        n.advance_past(d);
                    }
                }
                Ok(PositionalNode { field, cursor: PostingCursor::new(InvertedList::new(out)) })
            }
            PositionalExpr::UnorderedWindow { k, children } => {
                let mut nodes = initialize_children(children, index)?;
                let field = common_field(&nodes)?;
                let mut out = Vec::new();
                while let Some(d) = next_common_docid(&mut nodes) {
                    let lists: Vec<&[u32]> =
                        nodes.iter().map(|n| n.current_posting().positions.as_slice()).collect();
                    let positions = unordered_window_positions(*k, &lists);
                    if !positions.is_empty() {
                        out.push(Posting::new(d, positions));
                    }
                    for n in nodes.iter_mut() {
                        n.advance_past(d);
                    }
                }
                Ok(PositionalNode { field, cursor: PostingCursor::new(InvertedList::new(out)) })
            }
        }
    }
}

fn initialize_children(
    children: &[PositionalExpr],
    index: &dyn IndexFacade,
) -> Result<Vec<PositionalNode>, RetrieveError> {
    children.iter().map(|c| c.initialize(index)).collect()
}

fn common_field(nodes: &[PositionalNode]) -> Result<String, RetrieveError> {
    let first = nodes
        .first()
        .ok_or_else(|| RetrieveError::InvalidParameter("positional operator with no children".into()))?
        .field()
        .to_string();
    if nodes.iter().any(|n| n.field() != first) {
        return Err(RetrieveError::InvalidParameter(
            "positional operator children span different fields".into(),
        ));
    }
    Ok(first)
}

/// Find the next docid common to every node (the true intersection), by
/// repeatedly advancing whichever nodes trail the current maximum. Returns
/// `None` once any node is exhausted.
fn next_common_docid(nodes: &mut [PositionalNode]) -> Option<u32> {
    loop {
        if nodes.iter().any(|n| !n.has_match()) {
            return None;
        }
        let target = nodes.iter().map(|n| n.current_docid()).max().unwrap();
        for n in nodes.iter_mut() {
            n.advance_to(target);
        }
        if nodes.iter().all(|n| n.has_match() && n.current_docid() == target) {
            return Some(target);
        }
    }
}

/// §4.3 Ordered Near/k: walk a cursor per child starting at the lowest
/// position of the first child; for each subsequent child, find a position
/// strictly greater than the running position and within `k` tokens. Emit
/// the rightmost position on success and advance every cursor past it; on
/// failure at step j, advance only the first child's cursor.
fn ordered_near_positions(k: u32, lists: &[&[u32]]) -> Vec<u32> {
    let n = lists.len();
    if n == 0 {
        return Vec::new();
    }
    let mut idx = vec![0usize; n];
    let mut out = Vec::new();
    while idx[0] < lists[0].len() {
        let mut cur_pos = lists[0][idx[0]];
        let mut step_cursors = idx.clone();
        let mut ok = true;
        for (j, &list_j) in lists.iter().enumerate().skip(1) {
            let mut cj = step_cursors[j];
            while cj < list_j.len() && list_j[cj] <= cur_pos {
                cj += 1;
            }
            if cj < list_j.len() && list_j[cj] - cur_pos <= k {
                step_cursors[j] = cj;
                cur_pos = list_j[cj];
            } else {
                ok = false;
                break;
            }
        }
        if ok {
            out.push(cur_pos);
            for j in 0..n {
                idx[j] = step_cursors[j] + 1;
            }
        } else {
            idx[0] += 1;
        }
    }
    out
}

/// §4.3 Unordered Window/k: repeatedly compute the min/max position across
/// every child's current cursor; if the span is within `k`, emit the max
/// and advance all cursors, else advance whichever cursor(s) hold the min.
fn unordered_window_positions(k: u32, lists: &[&[u32]]) -> Vec<u32> {
    let n = lists.len();
    if n == 0 {
        return Vec::new();
    }
    let mut idx = vec![0usize; n];
    let mut out = Vec::new();
    loop {
        if (0..n).any(|j| idx[j] >= lists[j].len()) {
            break;
        }
        let cur: Vec<u32> = (0..n).map(|j| lists[j][idx[j]]).collect();
        let pmin = *cur.iter().min().unwrap();
        let pmax = *cur.iter().max().unwrap();
        if pmax - pmin < k {
            out.push(pmax);
            for j in 0..n {
                idx[j] += 1;
            }
        } else {
            for j in 0..n {
                if cur[j] == pmin {
                    idx[j] += 1;
                }
            }
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index::MemoryIndex;

    #[test]
    fn ordered_near_2_rightmost_emission() {
        let a: &[u32] = &[1, 10, 20];
        let b: &[u32] = &[2, 15, 21];
        assert_eq!(ordered_near_positions(2, &[a, b]), vec![2, 21]);
    }

    #[test]
    fn unordered_window_3_spans() {
        let a: &[u32] = &[5, 30];
        let b: &[u32] = &[6, 29];
        assert_eq!(unordered_window_positions(3, &[a, b]), vec![6, 30]);
    }

    #[test]
    fn synonym_unions_across_docs_with_dedup() {
        let mut index = MemoryIndex::new();
        index.add_document("d1", "body", &["run", "jog", "run"]);
        index.add_document("d2", "body", &["jog"]);
        let expr = PositionalExpr::Synonym(vec![
            PositionalExpr::Term { field: "body".into(), term: "run".into() },
            PositionalExpr::Term { field: "body".into(), term: "jog".into() },
        ]);
        let node = expr.initialize(&index).unwrap();
        assert_eq!(node.df(), 2);
        assert_eq!(node.ctf(), 4);
    }

    #[test]
    fn synthesized_list_docids_strictly_ascending() {
        let mut index = MemoryIndex::new();
        for i in 0..5 {
            index.add_document(&format!("d{i}"), "body", &["alpha", "beta"]);
        }
        let expr = PositionalExpr::OrderedNear {
            k: 2,
            children: vec![
                PositionalExpr::Term { field: "body".into(), term: "alpha".into() },
                PositionalExpr::Term { field: "body".into(), term: "beta".into() },
            ],
        };
        let node = expr.initialize(&index).unwrap();
        let docids: Vec<u32> = node.cursor.list().postings().iter().map(|p| p.docid).collect();
        assert!(docids.windows(2).all(|w| w[0] < w[1]));
    }
}
