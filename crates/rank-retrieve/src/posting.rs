//! Posting and inverted-list data model (C2).
//!
//! A posting is a `(docid, positions)` pair; an inverted list is a sequence
//! of postings sorted by docid ascending with unique docids. Both raw
//! (index-backed) and synthesized (positional-operator-produced) inverted
//! lists share this representation.

/// A single document's occurrences of a term (or synthesized match) within
/// a field. `positions` is strictly ascending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Posting {
    pub docid: u32,
    pub positions: Vec<u32>,
}

impl Posting {
    pub fn new(docid: u32, positions: Vec<u32>) -> Self {
        Posting { docid, positions }
    }

    pub fn tf(&self) -> usize {
        self.positions.len()
    }
}

/// A sorted, docid-unique sequence of postings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InvertedList {
    postings: Vec<Posting>,
}

impl InvertedList {
    pub fn new(postings: Vec<Posting>) -> Self {
        debug_assert!(postings.windows(2).all(|w| w[0].docid < w[1].docid));
        InvertedList { postings }
    }

    pub fn empty() -> Self {
        InvertedList { postings: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.postings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.postings.is_empty()
    }

    pub fn postings(&self) -> &[Posting] {
        &self.postings
    }

    /// Collection term frequency: sum of `tf` over every posting in the list.
    pub fn ctf(&self) -> u64 {
        self.postings.iter().map(|p| p.tf() as u64).sum()
    }

    /// Document frequency: number of postings in the list.
    pub fn df(&self) -> usize {
        self.postings.len()
    }
}

/// A cursor over an `InvertedList`, giving the `IopBase` contract from §4.2:
/// `has_match`, `current_docid`, `current_posting`, `advance_past`.
#[derive(Debug, Clone)]
pub struct PostingCursor {
    list: InvertedList,
    i: usize,
}

impl PostingCursor {
    pub fn new(list: InvertedList) -> Self {
        PostingCursor { list, i: 0 }
    }

    pub fn has_match(&self) -> bool {
        self.i < self.list.len()
    }

    pub fn current_docid(&self) -> u32 {
        debug_assert!(self.has_match());
        self.list.postings()[self.i].docid
    }

    pub fn current_posting(&self) -> &Posting {
        debug_assert!(self.has_match());
        &self.list.postings()[self.i]
    }

    /// Advance the cursor to the least index with `docid > d`.
    pub fn advance_past(&mut self, d: u32) {
        while self.i < self.list.len() && self.list.postings()[self.i].docid <= d {
            self.i += 1;
        }
    }

    pub fn list(&self) -> &InvertedList {
        &self.list
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(docids: &[u32]) -> InvertedList {
        InvertedList::new(docids.iter().map(|&d| Posting::new(d, vec![0])).collect())
    }

    #[test]
    fn advance_past_skips_to_strictly_greater_docid() {
        let mut c = PostingCursor::new(list(&[1, 3, 5, 9]));
        c.advance_past(3);
        assert_eq!(c.current_docid(), 5);
        c.advance_past(100);
        assert!(!c.has_match());
    }

    #[test]
    fn empty_list_never_matches() {
        let c = PostingCursor::new(InvertedList::empty());
        assert!(!c.has_match());
    }
}
