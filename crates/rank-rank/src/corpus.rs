//! Minimal corpus loader for `indexPath` (§6).
//!
//! `spec.md` §1 puts the physical inverted-index storage format out of
//! scope — only its read API (C1's `IndexFacade`) is specified. This crate
//! still needs *something* to turn `indexPath` into an `IndexFacade` for the
//! CLI to run end-to-end, so it defines one small, explicitly out-of-spec
//! line format of its own: `externalDocid\tfield\ttoken token token…`, one
//! line per (document, field), loaded into `rank_retrieve::MemoryIndex`.
//! Swapping in a real on-disk index only requires a different
//! `IndexFacade` implementation; nothing downstream depends on this format.

use std::fs;
use std::path::Path;

use rank_retrieve::index::MemoryIndex;

use crate::error::RunError;

pub fn load_memory_index(path: &Path) -> Result<MemoryIndex, RunError> {
    let text = fs::read_to_string(path).map_err(|e| RunError::IndexUnavailable(e.to_string()))?;
    let mut index = MemoryIndex::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.splitn(3, '\t');
        let (Some(docid), Some(field), Some(body)) = (parts.next(), parts.next(), parts.next()) else {
            return Err(RunError::IndexUnavailable(format!("malformed corpus line: {line:?}")));
        };
        let tokens: Vec<&str> = body.split_whitespace().collect();
        index.add_document(docid, field, &tokens);
    }
    Ok(index)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rank_retrieve::index::IndexFacade;
    use std::io::Write;

    #[test]
    fn loads_multi_field_documents() {
        let mut path = std::env::temp_dir();
        path.push("rank-rank-corpus-test.tsv");
        let mut file = fs::File::create(&path).unwrap();
        writeln!(file, "doc-a\tbody\tthe quick fox").unwrap();
        writeln!(file, "doc-a\ttitle\tfox story").unwrap();
        drop(file);

        let index = load_memory_index(&path).unwrap();
        assert_eq!(index.num_docs(), 1);
        assert_eq!(index.doc_count("title").unwrap(), 1);
        fs::remove_file(&path).ok();
    }
}
