//! # sift-pruner
//!
//! Turns a parsed session log into a smaller one.
//!
//! - **Classifier**: ordered rules mapping signals to a [`ContentCategory`]
//! - **Compression rules**: category, tool, size, and error-keyword layers
//!   producing one [`CompressionRule`] per message
//! - **Compressors**: [`SmartTruncator`] and [`SemanticSummarizer`]
//! - **Integrity**: post-pruning orphan and chain-gap report
//! - **Pipeline**: [`Pruner`] with whole-file and chunked entry points
//!
//! ```no_run
//! use std::path::Path;
//! use sift_pruner::Pruner;
//! use sift_settings::PruningLevel;
//!
//! let pruner = Pruner::with_level(PruningLevel::Aggressive)?;
//! let result = pruner.process_file(Path::new("session.jsonl"), Path::new("session.pruned.jsonl"))?;
//! println!("removed {:.1}%", result.compression_ratio * 100.0);
//! # Ok::<(), sift_core::SiftError>(())
//! ```

#![deny(unsafe_code)]

pub mod classifier;
pub mod compress;
pub mod constants;
pub mod integrity;
pub mod pipeline;
pub mod result;
pub mod rules;
pub mod writer;

pub use classifier::{ContentCategory, ContentClassifier};
pub use compress::{SemanticSummarizer, SmartTruncator, Summary, SummaryGroup};
pub use integrity::{ChainGap, ChainReport, IntegrityReport};
pub use pipeline::{Decision, PrunedLog, Pruner, process_file, process_file_streaming};
pub use result::{AnalysisReport, PruningResult, compression_ratio};
pub use rules::{CompressionAction, CompressionRule, CompressionRulesEngine, RuleSource};
pub use writer::{OutputWriter, Rewrite};
