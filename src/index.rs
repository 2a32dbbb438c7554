//! Knowledge index built once from the knowledge corpus

use crate::error::{ReconcileError, Result};
use crate::types::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// Normalized utterance text -> structured knowledge (last writer wins)
pub type ExactKeyIndex = HashMap<String, KnowledgeEntry>;

/// Topic id -> trimmed passage sentences (first writer wins)
pub type HardKnowledgeIndex = HashMap<String, Vec<String>>;

/// Normalize knowledge-corpus text into a lookup key.
///
/// The grounded-dialogue corpus replaced `"` with `''` upstream, so the
/// knowledge side has to do the same for keys to line up.
pub fn normalize_key(text: &str) -> String {
    text.trim().replace('"', "''")
}

/// Both indexes over the knowledge corpus. Read-only once built.
#[derive(Debug, Default)]
pub struct KnowledgeIndex {
    exact: ExactKeyIndex,
    hard: HardKnowledgeIndex,
    dialogues_seen: usize,
}

impl KnowledgeIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from already-parsed dialogue records
    pub fn build<'a, I>(dialogues: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a KnowledgeDialogue>,
    {
        let mut index = Self::new();
        for dialogue in dialogues {
            index.add_dialogue(dialogue)?;
        }
        Ok(index)
    }

    /// Build from corpus text where every non-blank line is a JSON array of
    /// dialogue records
    pub fn from_json_lines(text: &str) -> Result<Self> {
        let mut index = Self::new();
        for (line_no, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let dialogues: Vec<KnowledgeDialogue> = serde_json::from_str(line)
                .map_err(|source| ReconcileError::MalformedRecord {
                    line: line_no + 1,
                    source,
                })?;
            for dialogue in &dialogues {
                index.add_dialogue(dialogue)?;
            }
        }

        info!(
            "Knowledge index built: {} dialogues, {} keys, {} topics",
            index.dialogues_seen,
            index.exact.len(),
            index.hard.len()
        );
        Ok(index)
    }

    /// Index every knowledge-providing turn of one dialogue
    pub fn add_dialogue(&mut self, dialogue: &KnowledgeDialogue) -> Result<()> {
        let position = self.dialogues_seen;
        self.dialogues_seen += 1;

        for (turn_no, turn) in dialogue.dialog.iter().enumerate() {
            if !turn.provides_knowledge() {
                continue;
            }
            let missing = |field| ReconcileError::MissingField {
                dialogue: position,
                turn: turn_no,
                field,
            };

            let checked_sentence = turn
                .checked_sentence
                .as_ref()
                .ok_or_else(|| missing("checked_sentence"))?;
            let checked_passage = turn
                .checked_passage
                .as_ref()
                .ok_or_else(|| missing("checked_passage"))?;
            let groups = turn
                .retrieved_passages
                .as_ref()
                .ok_or_else(|| missing("retrieved_passages"))?;
            let topics = turn
                .retrieved_topics
                .as_ref()
                .ok_or_else(|| missing("retrieved_topics"))?;

            let retrieved_passages: Vec<String> = groups
                .iter()
                .flat_map(|group| group.topics())
                .flat_map(|(_, sentences)| sentences.iter().cloned())
                .collect();

            for (topic, sentences) in groups.iter().flat_map(|group| group.topics()) {
                if !self.hard.contains_key(topic) {
                    self.hard.insert(
                        topic.to_string(),
                        sentences.iter().map(|s| s.trim().to_string()).collect(),
                    );
                }
            }

            let key = normalize_key(&turn.text);
            let entry = KnowledgeEntry {
                checked_sentence: checked_sentence.clone(),
                checked_passage: checked_passage.clone(),
                retrieved_passages,
                retrieved_topics: topics.clone(),
            };
            if self.exact.insert(key, entry).is_some() {
                debug!(
                    "Duplicate knowledge key in dialogue {}, turn {}; keeping latest",
                    position, turn_no
                );
            }
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&KnowledgeEntry> {
        self.exact.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.exact.contains_key(key)
    }

    /// Passage sentences stored for a topic id
    pub fn topic_passages(&self, topic: &str) -> Option<&[String]> {
        self.hard.get(topic).map(Vec::as_slice)
    }

    /// Whether any topic's passages contain `text` as a substring
    pub fn attests(&self, text: &str) -> bool {
        self.hard
            .values()
            .any(|sentences| sentences.iter().any(|s| s.contains(text)))
    }

    pub fn len(&self) -> usize {
        self.exact.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exact.is_empty()
    }
}
