//! Parameter-file parsing (§6): a line-oriented `key = value` reader, in the
//! same unglamorous style as the teacher's builder-pattern config structs
//! (`Bm25Params`, `QueryExpander`) — a plain struct with `Default` and a
//! loader function, not a derive-heavy config framework.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use rank_retrieve::model::RetrievalModel;

use crate::error::RunError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
    UnrankedBoolean,
    RankedBoolean,
    Bm25,
    Indri,
    Ltr,
}

impl Algorithm {
    fn parse(s: &str) -> Result<Self, RunError> {
        match s.to_ascii_lowercase().as_str() {
            "unrankedboolean" => Ok(Algorithm::UnrankedBoolean),
            "rankedboolean" => Ok(Algorithm::RankedBoolean),
            "bm25" => Ok(Algorithm::Bm25),
            "indri" => Ok(Algorithm::Indri),
            "ltr" => Ok(Algorithm::Ltr),
            other => Err(RunError::ParameterMalformed(format!(
                "retrievalAlgorithm: unrecognized value {other:?}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiversityAlgorithm {
    XQuAD,
    Pm2,
}

impl DiversityAlgorithm {
    fn parse(s: &str) -> Result<Self, RunError> {
        match s {
            "xQuAD" => Ok(DiversityAlgorithm::XQuAD),
            "PM2" => Ok(DiversityAlgorithm::Pm2),
            other => Err(RunError::ParameterMalformed(format!(
                "diversity:algorithm: unrecognized value {other:?}"
            ))),
        }
    }
}

/// A fully resolved run configuration (§6). Required keys have no default
/// and are a `ParameterMissing` error if absent; everything else below
/// documents the default applied when the key is not set.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub index_path: PathBuf,
    pub query_file_path: PathBuf,
    pub trec_eval_output_path: PathBuf,
    pub retrieval_algorithm: Algorithm,

    /// Default 1000, a conventional TREC per-query cutoff.
    pub trec_eval_output_length: usize,

    pub bm25_k1: f64,
    pub bm25_b: f64,
    pub bm25_k3: f64,
    pub indri_mu: f64,
    pub indri_lambda: f64,

    pub prf: bool,
    pub prf_num_docs: usize,
    pub prf_num_terms: usize,
    pub prf_indri_mu: f64,
    pub prf_indri_orig_weight: f64,
    pub prf_expansion_field: String,
    pub prf_initial_ranking_file: Option<PathBuf>,
    pub prf_expansion_query_file: Option<PathBuf>,

    pub diversity: bool,
    pub diversity_algorithm: DiversityAlgorithm,
    pub diversity_lambda: f64,
    pub diversity_max_input_rankings_length: usize,
    pub diversity_max_result_ranking_length: usize,
    pub diversity_intents_file: Option<PathBuf>,
    pub diversity_initial_ranking_file: Option<PathBuf>,

    /// `ltr:*` keys, kept as raw strings: feature/training paths and trainer
    /// invocation arguments are consumed by the `rank-learn` glue, not by
    /// this crate.
    pub ltr: HashMap<String, String>,
}

fn parse_kv(text: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let Some((key, value)) = line.split_once('=') else {
            continue;
        };
        map.insert(key.trim().to_string(), value.trim().to_string());
    }
    map
}

fn required(map: &HashMap<String, String>, key: &str) -> Result<String, RunError> {
    map.get(key)
        .cloned()
        .ok_or_else(|| RunError::ParameterMissing(key.to_string()))
}

fn parse_f64(map: &HashMap<String, String>, key: &str, default: f64) -> Result<f64, RunError> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| RunError::ParameterMalformed(format!("{key}: expected a number, got {v:?}"))),
    }
}

fn parse_usize(map: &HashMap<String, String>, key: &str, default: usize) -> Result<usize, RunError> {
    match map.get(key) {
        None => Ok(default),
        Some(v) => v
            .parse()
            .map_err(|_| RunError::ParameterMalformed(format!("{key}: expected an integer, got {v:?}"))),
    }
}

fn truthy(map: &HashMap<String, String>, key: &str) -> bool {
    match map.get(key).map(|v| v.to_ascii_lowercase()) {
        Some(v) => matches!(v.as_str(), "true" | "1" | "yes" | "on"),
        None => false,
    }
}

impl RunConfig {
    pub fn from_file(path: &Path) -> Result<Self, RunError> {
        let text = fs::read_to_string(path)?;
        let map = parse_kv(&text);

        let ltr = map
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("ltr:").map(|suffix| (suffix.to_string(), v.clone())))
            .collect();

        Ok(RunConfig {
            index_path: PathBuf::from(required(&map, "indexPath")?),
            query_file_path: PathBuf::from(required(&map, "queryFilePath")?),
            trec_eval_output_path: PathBuf::from(required(&map, "trecEvalOutputPath")?),
            retrieval_algorithm: Algorithm::parse(&required(&map, "retrievalAlgorithm")?)?,
            trec_eval_output_length: parse_usize(&map, "trecEvalOutputLength", 1000)?,

            bm25_k1: parse_f64(&map, "BM25:k_1", 1.2)?,
            bm25_b: parse_f64(&map, "BM25:b", 0.75)?,
            bm25_k3: parse_f64(&map, "BM25:k_3", 0.0)?,
            indri_mu: parse_f64(&map, "Indri:mu", 2500.0)?,
            indri_lambda: parse_f64(&map, "Indri:lambda", 0.4)?,

            prf: truthy(&map, "prf"),
            prf_num_docs: parse_usize(&map, "prf:numDocs", 10)?,
            prf_num_terms: parse_usize(&map, "prf:numTerms", 20)?,
            prf_indri_mu: parse_f64(&map, "prf:Indri:mu", 2500.0)?,
            prf_indri_orig_weight: parse_f64(&map, "prf:Indri:origWeight", 0.5)?,
            prf_expansion_field: map.get("prf:expansionField").cloned().unwrap_or_else(|| "body".to_string()),
            prf_initial_ranking_file: map.get("prf:initialRankingFile").map(PathBuf::from),
            prf_expansion_query_file: map.get("prf:expansionQueryFile").map(PathBuf::from),

            diversity: truthy(&map, "diversity"),
            diversity_algorithm: match map.get("diversity:algorithm") {
                Some(v) => DiversityAlgorithm::parse(v)?,
                None => DiversityAlgorithm::XQuAD,
            },
            diversity_lambda: parse_f64(&map, "diversity:lambda", 0.5)?,
            diversity_max_input_rankings_length: parse_usize(&map, "diversity:maxInputRankingsLength", 1000)?,
            diversity_max_result_ranking_length: parse_usize(&map, "diversity:maxResultRankingLength", 100)?,
            diversity_intents_file: map.get("diversity:intentsFile").map(PathBuf::from),
            diversity_initial_ranking_file: map.get("diversity:initialRankingFile").map(PathBuf::from),

            ltr,
        })
    }

    /// Build the `RetrievalModel` dispatch value from the resolved
    /// parameters (§4.5). `Ltr` has no scoring model of its own: it reuses
    /// BM25 for the per-field feature scores (C10), so it maps to the same
    /// `RetrievalModel::Bm25` the `bm25` algorithm uses.
    pub fn retrieval_model(&self) -> RetrievalModel {
        match self.retrieval_algorithm {
            Algorithm::UnrankedBoolean => RetrievalModel::UnrankedBoolean,
            Algorithm::RankedBoolean => RetrievalModel::RankedBoolean,
            Algorithm::Bm25 | Algorithm::Ltr => {
                RetrievalModel::Bm25 { k1: self.bm25_k1, b: self.bm25_b, k3: self.bm25_k3 }
            }
            Algorithm::Indri => RetrievalModel::Indri {
                mu: self.indri_mu,
                lambda: self.indri_lambda,
                orig_weight: Some(self.prf_indri_orig_weight),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_required_key_is_an_error() {
        let map = parse_kv("queryFilePath = q.txt\n");
        assert!(required(&map, "indexPath").is_err());
    }

    #[test]
    fn truthy_accepts_common_spellings() {
        let map = parse_kv("prf = true\ndiversity = 1\n");
        assert!(truthy(&map, "prf"));
        assert!(truthy(&map, "diversity"));
        assert!(!truthy(&map, "ltr"));
    }

    #[test]
    fn ltr_keys_are_collected_without_prefix() {
        let map = parse_kv("ltr:trainerPath = /usr/bin/svm_rank_learn\nindexPath = x\n");
        let ltr: HashMap<String, String> = map
            .iter()
            .filter_map(|(k, v)| k.strip_prefix("ltr:").map(|s| (s.to_string(), v.clone())))
            .collect();
        assert_eq!(ltr.get("trainerPath").unwrap(), "/usr/bin/svm_rank_learn");
    }
}
