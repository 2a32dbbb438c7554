//! Core type definitions for both dialogue corpora

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

/// Speaker tag of the knowledge-providing party in the knowledge corpus
pub const KNOWLEDGE_SPEAKER: &str = "1_Wizard";

/// Checked sentence / passage as stored in the knowledge corpus.
///
/// Most records carry a single-entry object keyed by a label such as
/// `chosen_Blue_0`, some carry plain text. Both are copied through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CheckedField {
    Text(String),
    Labeled(BTreeMap<String, String>),
}

impl CheckedField {
    /// The sentence text, ignoring any label
    pub fn text(&self) -> Option<&str> {
        match self {
            CheckedField::Text(text) => Some(text.as_str()),
            CheckedField::Labeled(map) => map.values().next().map(String::as_str),
        }
    }
}

/// One retrieval group: topic id -> passage sentences, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassageGroup(pub Vec<(String, Vec<String>)>);

impl PassageGroup {
    pub fn topics(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(topic, sentences)| (topic.as_str(), sentences.as_slice()))
    }
}

impl<'de> Deserialize<'de> for PassageGroup {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct GroupVisitor;

        impl<'de> Visitor<'de> for GroupVisitor {
            type Value = PassageGroup;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of topic to passage sentences")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<PassageGroup, A::Error> {
                let mut topics = Vec::with_capacity(map.size_hint().unwrap_or(1));
                while let Some((topic, sentences)) = map.next_entry::<String, Vec<String>>()? {
                    topics.push((topic, sentences));
                }
                Ok(PassageGroup(topics))
            }
        }

        deserializer.deserialize_map(GroupVisitor)
    }
}

/// A turn of the knowledge corpus.
///
/// Only knowledge-providing turns are required to carry the checked and
/// retrieved fields, so they are optional here and validated by the index.
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeTurn {
    pub speaker: String,
    pub text: String,
    #[serde(default)]
    pub checked_sentence: Option<CheckedField>,
    #[serde(default)]
    pub checked_passage: Option<CheckedField>,
    #[serde(default)]
    pub retrieved_passages: Option<Vec<PassageGroup>>,
    #[serde(default)]
    pub retrieved_topics: Option<Vec<String>>,
}

impl KnowledgeTurn {
    pub fn provides_knowledge(&self) -> bool {
        self.speaker == KNOWLEDGE_SPEAKER
    }
}

/// A dialogue record of the knowledge corpus
#[derive(Debug, Clone, Deserialize)]
pub struct KnowledgeDialogue {
    pub dialog: Vec<KnowledgeTurn>,
}

/// Structured knowledge recovered for one knowledge-providing turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnowledgeEntry {
    pub checked_sentence: CheckedField,
    pub checked_passage: CheckedField,
    pub retrieved_passages: Vec<String>, // flattened across all groups
    pub retrieved_topics: Vec<String>,
}

/// A dialogue of the target corpus
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dialogue {
    pub utterances: Vec<Utterance>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A turn of the target corpus.
///
/// Fields this crate does not interpret (`response`, `history`, tags) ride
/// along in `extra` and are written back unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Utterance {
    #[serde(default)]
    pub original_response: Option<String>, // direct key, null for some turns
    pub knowledge: String,

    // Attached on structured match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passages: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub topics: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_sentence: Option<CheckedField>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checked_passage: Option<CheckedField>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Utterance {
    pub fn new(original_response: Option<&str>, knowledge: &str) -> Self {
        Self {
            original_response: original_response.map(str::to_string),
            knowledge: knowledge.to_string(),
            ..Default::default()
        }
    }

    /// Copy the structured fields of `entry` onto this utterance
    pub fn attach(&mut self, entry: &KnowledgeEntry) {
        self.passages = Some(entry.retrieved_passages.clone());
        self.topics = Some(entry.retrieved_topics.clone());
        self.checked_sentence = Some(entry.checked_sentence.clone());
        self.checked_passage = Some(entry.checked_passage.clone());
    }

    pub fn is_annotated(&self) -> bool {
        self.passages.is_some()
    }
}

/// Terminal outcome of one utterance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Direct,         // corrected original_response found in the exact index
    CrossUtterance, // knowledge found in a sibling's retrieved passages
    PassageOnly,    // knowledge attested in some topic's passages, nothing attached
    Unresolved,
    KeyError,       // original_response present but absent from the index
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Direct,
        Category::CrossUtterance,
        Category::PassageOnly,
        Category::Unresolved,
        Category::KeyError,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Direct => "direct",
            Category::CrossUtterance => "cross_utterance",
            Category::PassageOnly => "passage_only",
            Category::Unresolved => "unresolved",
            Category::KeyError => "key_error",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passage_group_keeps_file_order() {
        let raw = r#"{"Zebra": ["z1"], "Apple": ["a1", "a2"]}"#;
        let group: PassageGroup = serde_json::from_str(raw).unwrap();
        let topics: Vec<&str> = group.topics().map(|(t, _)| t).collect();
        assert_eq!(topics, vec!["Zebra", "Apple"]);
    }

    #[test]
    fn test_checked_field_shapes() {
        let labeled: CheckedField =
            serde_json::from_value(json!({"chosen_Blue_0": "Blue is a color."})).unwrap();
        assert_eq!(labeled.text(), Some("Blue is a color."));

        let plain: CheckedField = serde_json::from_value(json!("no_passages_used")).unwrap();
        assert_eq!(plain, CheckedField::Text("no_passages_used".to_string()));
    }

    #[test]
    fn test_utterance_preserves_unknown_fields() {
        let raw = json!({
            "original_response": null,
            "knowledge": "Blue is a color.",
            "response": "I like blue.",
            "BEGIN": ["Hallucination"]
        });
        let utt: Utterance = serde_json::from_value(raw).unwrap();
        assert!(utt.original_response.is_none());
        assert_eq!(utt.extra.get("response"), Some(&json!("I like blue.")));

        let back = serde_json::to_value(&utt).unwrap();
        assert_eq!(back["original_response"], Value::Null);
        assert_eq!(back["BEGIN"], json!(["Hallucination"]));
        assert!(back.get("passages").is_none());
    }

    #[test]
    fn test_passthrough_fields_keep_file_order() {
        let raw = r#"{"knowledge": "k", "response": "r", "history": [], "BEGIN": []}"#;
        let utt: Utterance = serde_json::from_str(raw).unwrap();
        let keys: Vec<&str> = utt.extra.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["response", "history", "BEGIN"]);

        let written = serde_json::to_string(&utt).unwrap();
        let response_at = written.find("\"response\"").unwrap();
        let begin_at = written.find("\"BEGIN\"").unwrap();
        assert!(response_at < begin_at);
    }
}
