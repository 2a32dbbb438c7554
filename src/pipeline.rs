//! Batch pipeline: load the knowledge corpus once, then annotate each split

use crate::annotator::{Annotator, Tally};
use crate::config::ReconcileConfig;
use crate::error::ReconcileError;
use crate::index::KnowledgeIndex;
use crate::types::Dialogue;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Result of annotating one split
#[derive(Debug, Serialize)]
pub struct SplitReport {
    pub split: String,
    pub output_path: PathBuf,
    pub tally: Tally,
}

/// Read and index the knowledge corpus
pub async fn load_knowledge(path: &Path) -> Result<KnowledgeIndex> {
    let start = Instant::now();
    let text = read_file(path).await?;
    let index = tokio::task::spawn_blocking(move || KnowledgeIndex::from_json_lines(&text))
        .await?
        .with_context(|| format!("Failed to index knowledge corpus {}", path.display()))?;

    info!(
        "Loaded knowledge corpus {} in {}ms",
        path.display(),
        start.elapsed().as_millis()
    );
    Ok(index)
}

/// Read a grounded-dialogue split (a single JSON array)
pub async fn load_dialogues(path: &Path) -> Result<Vec<Dialogue>> {
    let text = read_file(path).await?;
    let dialogues: Vec<Dialogue> =
        serde_json::from_str(&text).map_err(|source| ReconcileError::Json {
            path: path.to_path_buf(),
            source,
        })?;
    debug!("Read {} dialogues from {}", dialogues.len(), path.display());
    Ok(dialogues)
}

/// Write dialogues as four-space indented JSON, creating parent directories
pub async fn write_dialogues(path: &Path, dialogues: &[Dialogue]) -> Result<()> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    dialogues.serialize(&mut ser).map_err(|source| ReconcileError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|source| io_error(parent, source))?;
    }
    tokio::fs::write(path, buf)
        .await
        .map_err(|source| io_error(path, source))?;
    Ok(())
}

/// Annotate one split against the shared index and write it out
pub async fn process_split(
    index: Arc<KnowledgeIndex>,
    config: &ReconcileConfig,
    split: &str,
) -> Result<SplitReport> {
    let input = config.input_path(split);
    let output = config.output_path(split);
    let preview = config.unresolved_preview;

    info!("Processing {}: {}", split, input.display());
    let mut dialogues = load_dialogues(&input).await?;

    let (dialogues, tally) = tokio::task::spawn_blocking(move || {
        let tally = Annotator::new(&index)
            .with_unresolved_preview(preview)
            .annotate(&mut dialogues)?;
        Ok::<_, ReconcileError>((dialogues, tally))
    })
    .await?
    .with_context(|| format!("Annotation of split '{}' failed", split))?;

    write_dialogues(&output, &dialogues).await?;
    info!(
        "Split {} done: {}/{} utterances annotated -> {}",
        split,
        tally.annotated(),
        tally.total,
        output.display()
    );

    Ok(SplitReport {
        split: split.to_string(),
        output_path: output,
        tally,
    })
}

/// Full run: one index build, then each configured split in order.
///
/// `on_report` sees every split as soon as its output is written, so a
/// failure in a later split cannot hide the results of earlier ones.
pub async fn run<F>(config: &ReconcileConfig, mut on_report: F) -> Result<Vec<SplitReport>>
where
    F: FnMut(&SplitReport),
{
    let index = Arc::new(load_knowledge(&config.knowledge_path).await?);

    let mut reports = Vec::with_capacity(config.splits.len());
    for split in &config.splits {
        let report = process_split(Arc::clone(&index), config, split).await?;
        on_report(&report);
        reports.push(report);
    }
    Ok(reports)
}

async fn read_file(path: &Path) -> Result<String> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| io_error(path, source))?;
    Ok(text)
}

fn io_error(path: &Path, source: std::io::Error) -> ReconcileError {
    ReconcileError::Io {
        path: path.to_path_buf(),
        source,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn write_json(path: &Path, value: &Value) {
        std::fs::write(path, serde_json::to_string(value).unwrap()).unwrap();
    }

    fn knowledge_corpus() -> Value {
        json!([{ "dialog": [
            {"speaker": "0_Apprentice", "text": "I love blue."},
            {
                "speaker": "1_Wizard",
                "text": "Blue is one of the three primary colours.",
                "checked_sentence": {"chosen_Blue_0": "Blue is one of the three primary colours of pigments."},
                "checked_passage": {"chosen_Blue": "Blue"},
                "retrieved_passages": [{"Blue": ["Blue is one of the three primary colours of pigments."]}],
                "retrieved_topics": ["Blue"],
            },
        ]}])
    }

    #[tokio::test]
    async fn test_run_writes_annotated_splits() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("in");
        std::fs::create_dir_all(&input_dir).unwrap();
        let knowledge_path = dir.path().join("data.json");
        write_json(&knowledge_path, &knowledge_corpus());

        write_json(
            &input_dir.join("test.json"),
            &json!([{
                "dialog_idx": 7,
                "utterances": [
                    {
                        "original_response": "Blue is one of the three primary colours.",
                        "knowledge": "Blue is one of the three primary colours of pigments.",
                        "response": "Blue is a primary colour.",
                    },
                    {
                        "original_response": null,
                        "knowledge": "primary colours of pigments",
                        "response": "It is primary.",
                    }
                ]
            }]),
        );

        let config = ReconcileConfig {
            knowledge_path,
            input_dir,
            output_dir: dir.path().join("out"),
            splits: vec!["test".to_string()],
            unresolved_preview: 9,
        };

        let reports = run(&config, |_| {}).await.unwrap();
        assert_eq!(reports.len(), 1);
        let tally = &reports[0].tally;
        assert_eq!(tally.total, 2);
        assert_eq!(tally.direct, 1);
        assert_eq!(tally.cross_utterance, 1);

        let written = std::fs::read_to_string(config.output_path("test")).unwrap();
        assert!(written.contains("\n    {"), "four-space indentation");
        let out: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(out[0]["dialog_idx"], json!(7));
        let second = &out[0]["utterances"][1];
        assert_eq!(second["response"], json!("It is primary."));
        assert_eq!(second["topics"], json!(["Blue"]));
        assert_eq!(second["checked_passage"], json!({"chosen_Blue": "Blue"}));
    }

    #[tokio::test]
    async fn test_missing_split_fails() {
        let dir = tempfile::tempdir().unwrap();
        let knowledge_path = dir.path().join("data.json");
        write_json(&knowledge_path, &knowledge_corpus());

        let config = ReconcileConfig {
            knowledge_path,
            input_dir: dir.path().join("absent"),
            output_dir: dir.path().join("out"),
            splits: vec!["train".to_string()],
            unresolved_preview: 9,
        };

        let err = run(&config, |_| {}).await.unwrap_err();
        assert!(err.to_string().contains("train.json"));
        assert!(!config.output_path("train").exists());
    }

    #[tokio::test]
    async fn test_earlier_split_reported_before_later_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input_dir = dir.path().join("in");
        std::fs::create_dir_all(&input_dir).unwrap();
        let knowledge_path = dir.path().join("data.json");
        write_json(&knowledge_path, &knowledge_corpus());

        write_json(
            &input_dir.join("test.json"),
            &json!([{ "utterances": [{
                "original_response": "Blue is one of the three primary colours.",
                "knowledge": "Blue",
            }]}]),
        );
        // valid prefix, truncated at the end
        std::fs::write(
            input_dir.join("train.json"),
            "[{\"utterances\": [{\"original_response\": null, \"knowledge\": \"x\"}]}",
        )
        .unwrap();

        let config = ReconcileConfig {
            knowledge_path,
            input_dir,
            output_dir: dir.path().join("out"),
            splits: vec!["test".to_string(), "train".to_string()],
            unresolved_preview: 9,
        };

        let mut seen = Vec::new();
        let result = run(&config, |report| {
            seen.push((report.split.clone(), report.tally.to_string()))
        })
        .await;

        assert!(result.is_err());
        assert!(config.output_path("test").exists());
        assert!(!config.output_path("train").exists());
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].0, "test");
        assert!(seen[0].1.contains("Resolved by original_response: 1"));
    }

    #[tokio::test]
    async fn test_malformed_knowledge_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let knowledge_path = dir.path().join("data.json");
        std::fs::write(&knowledge_path, "[{\"dialog\": [{\"speaker\": 1}]}]").unwrap();

        let err = load_knowledge(&knowledge_path).await.unwrap_err();
        let root = err.downcast_ref::<ReconcileError>().unwrap();
        assert!(matches!(root, ReconcileError::MalformedRecord { line: 1, .. }));
    }
}
