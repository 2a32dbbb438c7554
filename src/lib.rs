//! Knowledge Reconcile - grounded-dialogue knowledge recovery
//!
//! Matches every utterance of a grounded-dialogue corpus back to the
//! knowledge-corpus turn it came from and attaches that turn's knowledge:
//! - Exact-key and per-topic passage indexes over the knowledge corpus
//! - Ordered fallback resolution with a fixed table of key corrections
//! - Exhaustive per-category accounting, checked before output is written

pub mod types;
pub mod error;
pub mod corrections;
pub mod index;
pub mod resolver;
pub mod annotator;
pub mod config;
pub mod pipeline;

pub use types::*;
pub use error::ReconcileError;
pub use corrections::correct;
pub use index::{normalize_key, KnowledgeIndex};
pub use resolver::{Resolution, Resolver};
pub use annotator::{Annotator, Tally};
pub use config::ReconcileConfig;
pub use pipeline::SplitReport;
