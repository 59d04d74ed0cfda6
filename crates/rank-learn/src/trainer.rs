//! External-trainer glue (supplemented, §1: "the external learning-to-rank
//! trainers (svm_rank, RankLib — treated as opaque subprocesses)").
//!
//! No gradient computation and no loss function live here: fitting the
//! model is explicitly the subprocess's job (a spec Non-goal). This module
//! only writes the feature file in the trainer's expected line format and
//! shells out to the configured binary.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::LearnError;
use crate::features::{format_training_line, FeatureVector};

/// `ltr:*` parameter-file keys (§6), resolved by `rank-rank::config` and
/// passed in here.
#[derive(Debug, Clone)]
pub struct TrainerConfig {
    /// Path to the `svm_rank_learn` or RankLib-wrapping binary.
    pub binary_path: PathBuf,
    /// Extra arguments passed through to the trainer binary, in order.
    pub extra_args: Vec<String>,
    /// Where the generated feature file is written before invoking the
    /// trainer.
    pub feature_file_path: PathBuf,
    /// Where the trainer is expected to write its fitted model.
    pub model_output_path: PathBuf,
}

/// One labeled training example: a query id, a relevance grade, and the
/// feature vector C10 produced for it.
pub struct TrainingExample {
    pub query_id: String,
    pub relevance: u8,
    pub features: FeatureVector,
}

fn write_feature_file(path: &Path, examples: &[TrainingExample]) -> Result<(), LearnError> {
    let mut file = std::fs::File::create(path)?;
    for example in examples {
        writeln!(file, "{}", format_training_line(&example.query_id, example.relevance, &example.features))?;
    }
    Ok(())
}

/// Write the feature file, then invoke the configured trainer binary.
/// Returns the model path on success, or `LearnError::ProcessFailed` on a
/// non-zero exit. Does not interpret the model file's contents — fitting
/// and serialization format are the trainer's concern.
pub fn invoke(config: &TrainerConfig, examples: &[TrainingExample]) -> Result<PathBuf, LearnError> {
    if examples.is_empty() {
        return Err(LearnError::EmptyInput);
    }

    write_feature_file(&config.feature_file_path, examples)?;

    let output = Command::new(&config.binary_path)
        .args(&config.extra_args)
        .arg(&config.feature_file_path)
        .arg(&config.model_output_path)
        .output()?;

    if !output.status.success() {
        return Err(LearnError::ProcessFailed {
            exit_code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    Ok(config.model_output_path.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn refuses_to_invoke_with_no_training_examples() {
        let config = TrainerConfig {
            binary_path: PathBuf::from("/bin/true"),
            extra_args: vec![],
            feature_file_path: PathBuf::from("/tmp/does-not-matter.features"),
            model_output_path: PathBuf::from("/tmp/does-not-matter.model"),
        };
        assert_eq!(invoke(&config, &[]), Err(LearnError::EmptyInput));
    }
}
