//! Ordered fallback resolution of an utterance to its knowledge entry
//!
//! Stages, first success wins:
//! 1. direct: corrected `original_response` looked up in the exact index
//! 2. cross-utterance: `knowledge` found in a sibling's retrieved passages
//! 3. passage-only: `knowledge` attested in some topic's passages
//!
//! Stages 2 and 3 run only when `original_response` is null. A non-null key
//! that misses the index is reported as dangling and never falls back.

use crate::corrections::correct;
use crate::index::KnowledgeIndex;
use crate::types::*;
use tracing::{debug, warn};

/// Outcome of resolving one utterance
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    Direct { key: String, entry: &'a KnowledgeEntry },
    CrossUtterance { key: String, entry: &'a KnowledgeEntry },
    PassageOnly,
    Unresolved,
    DanglingKey { key: String },
}

impl<'a> Resolution<'a> {
    pub fn category(&self) -> Category {
        match self {
            Resolution::Direct { .. } => Category::Direct,
            Resolution::CrossUtterance { .. } => Category::CrossUtterance,
            Resolution::PassageOnly => Category::PassageOnly,
            Resolution::Unresolved => Category::Unresolved,
            Resolution::DanglingKey { .. } => Category::KeyError,
        }
    }

    /// Resolved knowledge key, if any stage produced one
    pub fn key(&self) -> Option<&str> {
        match self {
            Resolution::Direct { key, .. }
            | Resolution::CrossUtterance { key, .. }
            | Resolution::DanglingKey { key } => Some(key.as_str()),
            Resolution::PassageOnly | Resolution::Unresolved => None,
        }
    }

    /// Structured knowledge to attach
    pub fn entry(&self) -> Option<&'a KnowledgeEntry> {
        match self {
            Resolution::Direct { entry, .. } | Resolution::CrossUtterance { entry, .. } => {
                Some(*entry)
            }
            _ => None,
        }
    }
}

/// Corrected direct key of an utterance
pub fn direct_key(utterance: &Utterance) -> Option<&str> {
    utterance.original_response.as_deref().map(correct)
}

pub struct Resolver<'a> {
    index: &'a KnowledgeIndex,
}

impl<'a> Resolver<'a> {
    pub fn new(index: &'a KnowledgeIndex) -> Self {
        Self { index }
    }

    /// Resolve `utterance`, a member of `dialogue`
    pub fn resolve(&self, utterance: &Utterance, dialogue: &Dialogue) -> Resolution<'a> {
        if let Some(key) = direct_key(utterance) {
            return match self.index.get(key) {
                Some(entry) => Resolution::Direct { key: key.to_string(), entry },
                None => {
                    warn!("Dangling direct key: '{}'", key);
                    Resolution::DanglingKey { key: key.to_string() }
                }
            };
        }

        let knowledge = utterance.knowledge.trim();
        if knowledge.is_empty() {
            return Resolution::Unresolved;
        }

        if let Some((key, entry)) = self.search_siblings(utterance, knowledge, dialogue) {
            return Resolution::CrossUtterance { key, entry };
        }

        if self.index.attests(knowledge) {
            return Resolution::PassageOnly;
        }

        Resolution::Unresolved
    }

    /// Scan the other utterances of `dialogue` in order for one whose
    /// retrieved passages contain `knowledge`
    pub fn search_siblings(
        &self,
        utterance: &Utterance,
        knowledge: &str,
        dialogue: &Dialogue,
    ) -> Option<(String, &'a KnowledgeEntry)> {
        for sibling in &dialogue.utterances {
            if std::ptr::eq(sibling, utterance) {
                continue;
            }
            let Some(key) = direct_key(sibling) else {
                continue;
            };
            // a sibling with a dangling key has no passages to search
            let Some(entry) = self.index.get(key) else {
                continue;
            };
            if entry.retrieved_passages.iter().any(|p| p.contains(knowledge)) {
                debug!("Knowledge found via sibling key '{}'", key);
                return Some((key.to_string(), entry));
            }
        }
        None
    }
}
