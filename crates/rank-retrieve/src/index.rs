//! Index Facade (C1): read-only corpus statistics, doc-id mapping, postings,
//! and term vectors.
//!
//! `spec.md` treats the physical on-disk index format as out of scope; only
//! the read API is specified. `MemoryIndex` is the one concrete
//! implementation in this crate, grounded on the teacher's `InvertedIndex`
//! (`bm25.rs`) but generalized to be multi-field and to retain term
//! positions (needed by C3's positional operators, which the teacher's
//! term-frequency-only index did not support).

use std::collections::HashMap;

use crate::error::RetrieveError;
use crate::posting::{InvertedList, Posting};

/// A term vector for a single `(docid, field)`: the distinct stems that
/// occur, parallel frequency arrays, and the position-to-stem-index
/// sequence, per §3.
#[derive(Debug, Clone, Default)]
pub struct TermVector {
    /// Index 0 is reserved as null; `stems[1..]` are the distinct stems.
    pub stems: Vec<Option<String>>,
    pub stem_freq: Vec<u32>,
    pub total_stem_freq: Vec<u64>,
    pub positions: Vec<u32>,
}

impl TermVector {
    pub fn stem_index(&self, term: &str) -> Option<usize> {
        self.stems
            .iter()
            .position(|s| s.as_deref() == Some(term))
    }
}

/// Read-only facade over corpus statistics and postings (§4.1).
pub trait IndexFacade {
    fn num_docs(&self) -> u64;
    fn doc_count(&self, field: &str) -> Result<u64, RetrieveError>;
    fn sum_of_field_lengths(&self, field: &str) -> Result<u64, RetrieveError>;
    fn field_length(&self, field: &str, docid: u32) -> Result<u64, RetrieveError>;
    fn doc_freq(&self, field: &str, term: &str) -> Result<u64, RetrieveError>;
    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64, RetrieveError>;
    fn internal_docid(&self, external: &str) -> Result<u32, RetrieveError>;
    fn external_docid(&self, docid: u32) -> Result<String, RetrieveError>;
    fn attribute(&self, name: &str, docid: u32) -> Result<Option<String>, RetrieveError>;
    /// Returns an empty list for an unknown term, per §4.1 (`UnknownTerm` is
    /// not an error).
    fn postings(&self, field: &str, term: &str) -> Result<InvertedList, RetrieveError>;
    fn term_vector(&self, docid: u32, field: &str) -> Result<TermVector, RetrieveError>;
}

#[derive(Debug, Clone, Default)]
struct FieldData {
    /// term -> postings, built incrementally by `add_document`.
    postings: HashMap<String, Vec<Posting>>,
    field_length: HashMap<u32, u64>,
    sum_of_field_lengths: u64,
}

/// In-memory, multi-field index facade. Construct with `add_document`, then
/// use as an `IndexFacade`. Not optimized for large corpora; intended for
/// tests, small runs, and driving the CLI when no external physical index is
/// wired in.
#[derive(Debug, Clone, Default)]
pub struct MemoryIndex {
    fields: HashMap<String, FieldData>,
    external_docids: Vec<String>,
    internal_docids: HashMap<String, u32>,
    attributes: HashMap<(String, u32), String>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        MemoryIndex::default()
    }

    /// Index one field of one document. `tokens` is the field's token
    /// sequence in order; positions are assigned 0-based within this call.
    /// `external_docid` must be stable across fields of the same document.
    pub fn add_document(&mut self, external_docid: &str, field: &str, tokens: &[&str]) -> u32 {
        let docid = *self
            .internal_docids
            .entry(external_docid.to_string())
            .or_insert_with(|| {
                let id = self.external_docids.len() as u32;
                self.external_docids.push(external_docid.to_string());
                id
            });

        let fd = self.fields.entry(field.to_string()).or_default();
        let mut by_position: HashMap<&str, Vec<u32>> = HashMap::new();
        for (pos, &tok) in tokens.iter().enumerate() {
            by_position.entry(tok).or_default().push(pos as u32);
        }
        for (term, positions) in by_position {
            let list = fd.postings.entry(term.to_string()).or_default();
            list.push(Posting::new(docid, positions));
        }
        *fd.field_length.entry(docid).or_insert(0) += tokens.len() as u64;
        fd.sum_of_field_lengths += tokens.len() as u64;

        docid
    }

    pub fn set_attribute(&mut self, name: &str, docid: u32, value: &str) {
        self.attributes
            .insert((name.to_string(), docid), value.to_string());
    }

    fn field(&self, field: &str) -> Result<&FieldData, RetrieveError> {
        self.fields
            .get(field)
            .ok_or_else(|| RetrieveError::UnknownField(field.to_string()))
    }
}

impl IndexFacade for MemoryIndex {
    fn num_docs(&self) -> u64 {
        self.external_docids.len() as u64
    }

    fn doc_count(&self, field: &str) -> Result<u64, RetrieveError> {
        Ok(self.field(field)?.field_length.len() as u64)
    }

    fn sum_of_field_lengths(&self, field: &str) -> Result<u64, RetrieveError> {
        Ok(self.field(field)?.sum_of_field_lengths)
    }

    fn field_length(&self, field: &str, docid: u32) -> Result<u64, RetrieveError> {
        Ok(self
            .field(field)?
            .field_length
            .get(&docid)
            .copied()
            .unwrap_or(0))
    }

    fn doc_freq(&self, field: &str, term: &str) -> Result<u64, RetrieveError> {
        Ok(self
            .field(field)?
            .postings
            .get(term)
            .map(|p| p.len() as u64)
            .unwrap_or(0))
    }

    fn total_term_freq(&self, field: &str, term: &str) -> Result<u64, RetrieveError> {
        Ok(self
            .field(field)?
            .postings
            .get(term)
            .map(|p| p.iter().map(|x| x.tf() as u64).sum())
            .unwrap_or(0))
    }

    fn internal_docid(&self, external: &str) -> Result<u32, RetrieveError> {
        self.internal_docids
            .get(external)
            .copied()
            .ok_or_else(|| RetrieveError::UnknownDocid(u32::MAX))
    }

    fn external_docid(&self, docid: u32) -> Result<String, RetrieveError> {
        self.external_docids
            .get(docid as usize)
            .cloned()
            .ok_or(RetrieveError::UnknownDocid(docid))
    }

    fn attribute(&self, name: &str, docid: u32) -> Result<Option<String>, RetrieveError> {
        Ok(self.attributes.get(&(name.to_string(), docid)).cloned())
    }

    fn postings(&self, field: &str, term: &str) -> Result<InvertedList, RetrieveError> {
        let fd = self.field(field)?;
        let mut postings = match fd.postings.get(term) {
            Some(p) => p.clone(),
            None => return Ok(InvertedList::empty()),
        };
        postings.sort_by_key(|p| p.docid);
        Ok(InvertedList::new(postings))
    }

    fn term_vector(&self, docid: u32, field: &str) -> Result<TermVector, RetrieveError> {
        let fd = self.field(field)?;
        let mut stems = vec![None];
        let mut stem_freq = vec![0u32];
        let mut total_stem_freq = vec![0u64];
        let field_len = self.field_length(field, docid)?;
        let mut positions = vec![0u32; field_len as usize];

        let mut terms: Vec<&String> = fd.postings.keys().collect();
        terms.sort();
        for term in terms {
            let term_postings = &fd.postings[term];
            let Some(posting) = term_postings.iter().find(|p| p.docid == docid) else {
                continue;
            };
            let idx = stems.len();
            stems.push(Some(term.clone()));
            stem_freq.push(posting.tf() as u32);
            total_stem_freq.push(term_postings.iter().map(|p| p.tf() as u64).sum());
            for &pos in &posting.positions {
                if (pos as usize) < positions.len() {
                    positions[pos as usize] = idx as u32;
                }
            }
        }

        Ok(TermVector {
            stems,
            stem_freq,
            total_stem_freq,
            positions,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> MemoryIndex {
        let mut idx = MemoryIndex::new();
        idx.add_document("doc-a", "body", &["the", "dog", "ran"]);
        idx.add_document("doc-b", "body", &["the", "cat", "dog", "dog"]);
        idx
    }

    #[test]
    fn doc_freq_counts_documents_not_occurrences() {
        let idx = sample();
        assert_eq!(idx.doc_freq("body", "dog").unwrap(), 2);
    }

    #[test]
    fn total_term_freq_counts_occurrences() {
        let idx = sample();
        assert_eq!(idx.total_term_freq("body", "dog").unwrap(), 3);
    }

    #[test]
    fn unknown_term_yields_empty_postings_not_error() {
        let idx = sample();
        let list = idx.postings("body", "zzz").unwrap();
        assert!(list.is_empty());
    }

    #[test]
    fn unknown_field_is_an_error() {
        let idx = sample();
        assert!(idx.doc_freq("title", "dog").is_err());
    }

    #[test]
    fn term_vector_round_trips_positions() {
        let idx = sample();
        let docid = idx.internal_docid("doc-b").unwrap();
        let tv = idx.term_vector(docid, "body").unwrap();
        let dog_idx = tv.stem_index("dog").unwrap();
        let occurrences = tv.positions.iter().filter(|&&p| p as usize == dog_idx).count();
        assert_eq!(occurrences, 2);
    }
}
