//! Run configuration with environment-variable defaults

use crate::annotator::DEFAULT_UNRESOLVED_PREVIEW;
use std::path::PathBuf;

pub const DEFAULT_SPLITS: [&str; 3] = ["test", "train", "valid"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcileConfig {
    pub knowledge_path: PathBuf, // JSON-lines knowledge corpus
    pub input_dir: PathBuf,      // grounded-dialogue splits, <split>.json
    pub output_dir: PathBuf,
    pub splits: Vec<String>,
    pub unresolved_preview: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            knowledge_path: PathBuf::from("data/wizard_of_wikipedia/data.json"),
            input_dir: PathBuf::from("data/FaithDial"),
            output_dir: PathBuf::from("data/FaithDialOR"),
            splits: DEFAULT_SPLITS.iter().map(|s| s.to_string()).collect(),
            unresolved_preview: DEFAULT_UNRESOLVED_PREVIEW,
        }
    }
}

impl ReconcileConfig {
    /// Defaults overridden by `RECONCILE_*` environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("RECONCILE_KNOWLEDGE") {
            config.knowledge_path = PathBuf::from(path);
        }
        if let Ok(dir) = std::env::var("RECONCILE_INPUT_DIR") {
            config.input_dir = PathBuf::from(dir);
        }
        if let Ok(dir) = std::env::var("RECONCILE_OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }
        if let Ok(splits) = std::env::var("RECONCILE_SPLITS") {
            let splits = parse_splits(&splits);
            if !splits.is_empty() {
                config.splits = splits;
            }
        }
        config.unresolved_preview = std::env::var("RECONCILE_UNRESOLVED_PREVIEW")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(config.unresolved_preview);
        config
    }

    pub fn input_path(&self, split: &str) -> PathBuf {
        self.input_dir.join(format!("{}.json", split))
    }

    pub fn output_path(&self, split: &str) -> PathBuf {
        self.output_dir.join(format!("{}.json", split))
    }
}

/// Comma-separated split names, blanks dropped
pub fn parse_splits(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
