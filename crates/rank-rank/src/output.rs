//! Output Formatter (C9, §4.9): TREC six-column result lines.

use std::io::Write;

use crate::error::RunError;

const DEFAULT_RUN_ID: &str = "?";

/// Write one query's results: `<queryId> Q0 <externalDocid> <rank> <score>
/// <runId>` per record, 1-based rank. An empty result set gets a single
/// placeholder line instead of zero lines.
pub fn write_query_results(
    out: &mut impl Write,
    query_id: &str,
    results: &[(String, f64)],
    run_id: Option<&str>,
) -> Result<(), RunError> {
    let run_id = run_id.unwrap_or(DEFAULT_RUN_ID);
    if results.is_empty() {
        writeln!(out, "{query_id} Q0 dummyRecord 1 0 {run_id}")?;
        return Ok(());
    }
    for (rank, (external_docid, score)) in results.iter().enumerate() {
        writeln!(out, "{query_id} Q0 {external_docid} {} {score} {run_id}", rank + 1)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_results_emit_placeholder_line() {
        let mut buf = Vec::new();
        write_query_results(&mut buf, "7", &[], None).unwrap();
        assert_eq!(String::from_utf8(buf).unwrap(), "7 Q0 dummyRecord 1 0 ?\n");
    }

    #[test]
    fn results_are_one_based_rank() {
        let mut buf = Vec::new();
        let results = vec![("doc-a".to_string(), 1.5), ("doc-b".to_string(), 0.9)];
        write_query_results(&mut buf, "7", &results, None).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "7 Q0 doc-a 1 1.5 ?");
        assert_eq!(lines[1], "7 Q0 doc-b 2 0.9 ?");
    }
}
