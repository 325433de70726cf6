//! Pipeline outputs.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Serialize, Serializer};

use sift_analysis::{BranchPoint, GraphStats};
use sift_settings::PruningLevel;

use crate::classifier::ContentCategory;
use crate::integrity::IntegrityReport;

/// Aggregate statistics for one pruned file.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PruningResult {
    /// Valid messages read.
    pub messages_processed: usize,
    /// Messages written, verbatim or rewritten.
    pub messages_preserved: usize,
    /// Messages dropped.
    pub messages_removed: usize,
    /// Messages written with rewritten content (subset of preserved).
    pub messages_compressed: usize,
    /// Lines skipped as malformed.
    pub malformed_entries: usize,
    /// Wall time for the whole file.
    #[serde(serialize_with = "serialize_secs")]
    pub processing_time: Duration,
    /// Fraction of input bytes removed: `1 - size_after / size_before`.
    pub compression_ratio: f64,
    /// Input bytes.
    pub size_before: u64,
    /// Output bytes.
    pub size_after: u64,
    /// Level the file was pruned at.
    pub level: PruningLevel,
    /// Importance threshold for that level.
    pub threshold: u8,
    /// Chain integrity; `None` for streaming runs or when disabled.
    pub integrity: Option<IntegrityReport>,
}

impl PruningResult {
    /// Messages handled per second of wall time.
    #[must_use]
    pub fn messages_per_second(&self) -> f64 {
        let secs = self.processing_time.as_secs_f64();
        if secs > 0.0 {
            #[allow(clippy::cast_precision_loss)]
            let n = self.messages_processed as f64;
            n / secs
        } else {
            0.0
        }
    }
}

/// `1 - after / before`, zero for empty input.
#[must_use]
pub fn compression_ratio(size_before: u64, size_after: u64) -> f64 {
    if size_before == 0 {
        return 0.0;
    }
    #[allow(clippy::cast_precision_loss)]
    let ratio = size_after as f64 / size_before as f64;
    1.0 - ratio
}

fn serialize_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

/// What pruning would see in a file, without writing anything.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    /// Valid messages.
    pub messages: usize,
    /// Malformed lines.
    pub malformed: usize,
    /// Input bytes.
    pub size_bytes: u64,
    /// Message count per record type.
    pub by_kind: BTreeMap<String, usize>,
    /// Message count per score quartile.
    pub score_quartiles: BTreeMap<ContentCategory, usize>,
    /// Message count per classifier category.
    pub by_category: BTreeMap<ContentCategory, usize>,
    /// Mean importance score.
    pub mean_score: f64,
    /// Graph structure.
    pub graph: GraphStats,
    /// Forks with child score annotations.
    pub branch_points: Vec<BranchPoint>,
    /// Messages other messages refer to.
    pub referenced: usize,
    /// Messages matched by the debugging heuristic.
    pub debugging: usize,
    /// Messages at or above the level's threshold.
    pub above_threshold: usize,
    /// Level used for the threshold.
    pub level: PruningLevel,
    /// Importance threshold.
    pub threshold: u8,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ratio_of_empty_input_is_zero() {
        assert!(compression_ratio(0, 0).abs() < f64::EPSILON);
    }

    #[test]
    fn ratio_is_fraction_removed() {
        assert!((compression_ratio(1000, 250) - 0.75).abs() < 1e-9);
        assert!(compression_ratio(1000, 1000).abs() < 1e-9);
    }

    #[test]
    fn processing_time_serializes_as_seconds() {
        let result = PruningResult {
            messages_processed: 10,
            messages_preserved: 4,
            messages_removed: 6,
            messages_compressed: 1,
            malformed_entries: 0,
            processing_time: Duration::from_millis(1500),
            compression_ratio: 0.5,
            size_before: 100,
            size_after: 50,
            level: PruningLevel::Medium,
            threshold: 40,
            integrity: None,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["processingTime"], 1.5);
        assert_eq!(json["level"], "medium");
        assert!((result.messages_per_second() - 10.0 / 1.5).abs() < 1e-9);
    }
}
