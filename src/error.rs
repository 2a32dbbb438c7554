//! Error types for corpus loading and annotation

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReconcileError {
    /// A line of the knowledge corpus is not a JSON array of dialogue records.
    #[error("Malformed knowledge record on line {line}: {source}")]
    MalformedRecord {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    /// A knowledge-providing turn lacks a field the index needs.
    #[error("Knowledge dialogue {dialogue}, turn {turn}: missing field '{field}'")]
    MissingField {
        dialogue: usize,
        turn: usize,
        field: &'static str,
    },

    /// Category counts do not cover every utterance exactly once.
    #[error("Tally mismatch: {accounted} utterances categorized out of {total}")]
    TallyMismatch { total: usize, accounted: usize },

    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid dialogue corpus {}: {source}", .path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

pub type Result<T> = std::result::Result<T, ReconcileError>;
