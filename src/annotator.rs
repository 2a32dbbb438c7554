//! Drives the resolver over a whole corpus and accounts for every utterance

use crate::error::{ReconcileError, Result};
use crate::index::KnowledgeIndex;
use crate::resolver::{Resolution, Resolver};
use crate::types::*;
use serde::Serialize;
use std::fmt;
use tracing::{info, warn};

/// Unresolved knowledge texts surfaced per corpus by default
pub const DEFAULT_UNRESOLVED_PREVIEW: usize = 9;

/// Per-category utterance counts for one corpus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Tally {
    pub total: usize,
    pub direct: usize,
    pub cross_utterance: usize,
    pub passage_only: usize,
    pub unresolved: usize,
    pub key_error: usize,
    pub unresolved_samples: Vec<String>, // first few unresolved knowledge texts
}

impl Tally {
    pub fn record(&mut self, category: Category) {
        match category {
            Category::Direct => self.direct += 1,
            Category::CrossUtterance => self.cross_utterance += 1,
            Category::PassageOnly => self.passage_only += 1,
            Category::Unresolved => self.unresolved += 1,
            Category::KeyError => self.key_error += 1,
        }
    }

    pub fn count(&self, category: Category) -> usize {
        match category {
            Category::Direct => self.direct,
            Category::CrossUtterance => self.cross_utterance,
            Category::PassageOnly => self.passage_only,
            Category::Unresolved => self.unresolved,
            Category::KeyError => self.key_error,
        }
    }

    /// Utterances that landed in some category
    pub fn accounted(&self) -> usize {
        Category::ALL.iter().map(|c| self.count(*c)).sum()
    }

    /// Utterances that received structured knowledge
    pub fn annotated(&self) -> usize {
        self.direct + self.cross_utterance
    }

    /// Categories must partition the utterances exactly
    pub fn verify(&self) -> Result<()> {
        let accounted = self.accounted();
        if accounted != self.total {
            return Err(ReconcileError::TallyMismatch {
                total: self.total,
                accounted,
            });
        }
        Ok(())
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Out of {} utterances:", self.total)?;
        writeln!(f, "\tResolved by original_response: {}", self.direct)?;
        writeln!(f, "\tResolved via other utterances: {}", self.cross_utterance)?;
        writeln!(f, "\tKnowledge attested in passages only: {}", self.passage_only)?;
        write!(f, "\tUnresolved: {}", self.unresolved)?;
        if self.key_error > 0 {
            write!(f, "\n\tSkipped on dangling original_response: {}", self.key_error)?;
        }
        Ok(())
    }
}

pub struct Annotator<'a> {
    resolver: Resolver<'a>,
    unresolved_preview: usize,
}

impl<'a> Annotator<'a> {
    pub fn new(index: &'a KnowledgeIndex) -> Self {
        Self {
            resolver: Resolver::new(index),
            unresolved_preview: DEFAULT_UNRESOLVED_PREVIEW,
        }
    }

    pub fn with_unresolved_preview(mut self, limit: usize) -> Self {
        self.unresolved_preview = limit;
        self
    }

    /// Resolve and annotate every utterance in place, dialogue order then
    /// utterance order. Fails if the tally does not cover every utterance.
    pub fn annotate(&self, dialogues: &mut [Dialogue]) -> Result<Tally> {
        let mut tally = Tally::default();
        for dialogue in dialogues.iter_mut() {
            self.annotate_dialogue(dialogue, &mut tally);
        }
        tally.verify()?;

        info!(
            "Annotated {}/{} utterances ({} passage-only, {} unresolved, {} key errors)",
            tally.annotated(),
            tally.total,
            tally.passage_only,
            tally.unresolved,
            tally.key_error
        );
        Ok(tally)
    }

    fn annotate_dialogue(&self, dialogue: &mut Dialogue, tally: &mut Tally) {
        tally.total += dialogue.utterances.len();

        // Resolution only reads the direct keys and knowledge texts, which
        // annotation never touches, so resolve first and mutate after.
        let view: &Dialogue = dialogue;
        let resolutions: Vec<Resolution<'a>> = view
            .utterances
            .iter()
            .map(|utt| self.resolver.resolve(utt, view))
            .collect();

        for (utt, resolution) in dialogue.utterances.iter_mut().zip(resolutions) {
            let category = resolution.category();
            tally.record(category);

            if let Some(entry) = resolution.entry() {
                utt.attach(entry);
            } else if category == Category::Unresolved
                && tally.unresolved_samples.len() < self.unresolved_preview
            {
                warn!("Unresolved knowledge: '{}'", utt.knowledge);
                tally.unresolved_samples.push(utt.knowledge.clone());
            }
        }
    }
}
