//! File-format readers for the external interfaces in §6: the query file,
//! the intents file, and the TREC-format initial-ranking file (the same
//! six-column shape the output formatter (C9) writes).

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::error::RunError;

/// One line of a query file: `queryId:queryExpression`.
pub fn parse_query_file(path: &Path) -> Result<Vec<(String, String)>, RunError> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id, expr)) = line.split_once(':') else {
            return Err(RunError::ParameterMalformed(format!(
                "query file line missing ':': {line:?}"
            )));
        };
        out.push((id.trim().to_string(), expr.trim().to_string()));
    }
    Ok(out)
}

/// One line of an intents file: `queryId.intentNumber:intentText`.
pub fn parse_intents_file(path: &Path) -> Result<Vec<(String, u32, String)>, RunError> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let Some((id_part, text_part)) = line.split_once(':') else {
            return Err(RunError::ParameterMalformed(format!(
                "intents file line missing ':': {line:?}"
            )));
        };
        let Some((query_id, intent_str)) = id_part.rsplit_once('.') else {
            return Err(RunError::ParameterMalformed(format!(
                "intents file id missing '.intentNumber': {id_part:?}"
            )));
        };
        let intent: u32 = intent_str.parse().map_err(|_| {
            RunError::ParameterMalformed(format!("intents file intent number not an integer: {intent_str:?}"))
        })?;
        out.push((query_id.to_string(), intent, text_part.trim().to_string()));
    }
    Ok(out)
}

/// One parsed line of a TREC-format ranking: `queryId Q0 externalDocid rank
/// score runId`. A query id containing a dot (`X.Y`) denotes intent `Y` of
/// query `X`.
#[derive(Debug, Clone)]
pub struct RankingRecord {
    pub query_id: String,
    pub external_docid: String,
    pub rank: u32,
    pub score: f64,
}

pub fn parse_trec_ranking_file(path: &Path) -> Result<Vec<RankingRecord>, RunError> {
    let text = fs::read_to_string(path)?;
    let mut out = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 6 {
            return Err(RunError::ParameterMalformed(format!(
                "ranking file line has fewer than 6 fields: {line:?}"
            )));
        }
        if fields[2] == "dummyRecord" {
            continue;
        }
        let rank: u32 = fields[3]
            .parse()
            .map_err(|_| RunError::ParameterMalformed(format!("ranking file rank not an integer: {line:?}")))?;
        let score: f64 = fields[4]
            .parse()
            .map_err(|_| RunError::ParameterMalformed(format!("ranking file score not a number: {line:?}")))?;
        out.push(RankingRecord {
            query_id: fields[0].to_string(),
            external_docid: fields[2].to_string(),
            rank,
            score,
        });
    }
    Ok(out)
}

/// Group ranking records by query id, preserving file order within a group.
pub fn group_by_query_id(records: Vec<RankingRecord>) -> HashMap<String, Vec<RankingRecord>> {
    let mut groups: HashMap<String, Vec<RankingRecord>> = HashMap::new();
    for record in records {
        groups.entry(record.query_id.clone()).or_default().push(record);
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(contents: &str) -> std::path::PathBuf {
        let mut path = std::env::temp_dir();
        path.push(format!("rank-rank-io-test-{:p}", contents.as_ptr()));
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn query_file_splits_on_first_colon_only() {
        let path = write_temp("101:#AND(dog cat)\n102:title:foo\n");
        let queries = parse_query_file(&path).unwrap();
        assert_eq!(queries[0], ("101".to_string(), "#AND(dog cat)".to_string()));
        assert_eq!(queries[1], ("102".to_string(), "title:foo".to_string()));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn intents_file_parses_dotted_query_id() {
        let path = write_temp("7.1:dog breeds\n7.2:dog food\n");
        let intents = parse_intents_file(&path).unwrap();
        assert_eq!(intents[0], ("7".to_string(), 1, "dog breeds".to_string()));
        assert_eq!(intents[1], ("7".to_string(), 2, "dog food".to_string()));
        fs::remove_file(&path).ok();
    }

    #[test]
    fn ranking_file_skips_dummy_placeholder_lines() {
        let path = write_temp("7 Q0 dummyRecord 1 0 ?\n8 Q0 doc-a 1 1.5 ?\n");
        let records = parse_trec_ranking_file(&path).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].external_docid, "doc-a");
        fs::remove_file(&path).ok();
    }
}
