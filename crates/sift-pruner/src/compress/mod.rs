//! Content compressors.
//!
//! - [`SmartTruncator`]: bounds a field's length while keeping both ends
//! - [`SemanticSummarizer`]: folds repeated messages into one summary record

pub mod summarizer;
pub mod truncator;

pub use summarizer::{SemanticSummarizer, Summary, SummaryGroup};
pub use truncator::SmartTruncator;
