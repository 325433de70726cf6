//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` for the JSON settings
//! file. Each type implements [`Default`] with production values, and
//! `#[serde(default)]` lets a file specify only the fields it changes.

mod level;
mod weights;

pub use level::*;
pub use weights::*;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Root settings for one pruning engine instance.
///
/// # JSON Format
///
/// ```json
/// {
///   "pruningLevel": "aggressive",
///   "customWeights": { "hook_log": -40 },
///   "truncation": { "maxContentLength": 4000 }
/// }
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PrunerSettings {
    /// Aggressiveness level.
    pub pruning_level: PruningLevel,
    /// Overrides applied on top of [`ScoringWeights::default`].
    pub custom_weights: BTreeMap<String, i32>,
    /// Graph-position score adjustments.
    pub dependency: DependencySettings,
    /// Content truncation limits.
    pub truncation: TruncationSettings,
    /// Chunked processing.
    pub streaming: StreamingSettings,
    /// Repetition folding.
    pub summarizer: SummarizerSettings,
    /// Cross-reference detection.
    pub references: ReferenceSettings,
    /// Run the chain integrity check after pruning.
    pub validate_integrity: bool,
}

impl Default for PrunerSettings {
    fn default() -> Self {
        Self {
            pruning_level: PruningLevel::default(),
            custom_weights: BTreeMap::new(),
            dependency: DependencySettings::default(),
            truncation: TruncationSettings::default(),
            streaming: StreamingSettings::default(),
            summarizer: SummarizerSettings::default(),
            references: ReferenceSettings::default(),
            validate_integrity: true,
        }
    }
}

impl PrunerSettings {
    /// Settings at a given level with everything else default.
    #[must_use]
    pub fn with_level(level: PruningLevel) -> Self {
        Self {
            pruning_level: level,
            ..Self::default()
        }
    }

    /// Default weights with `custom_weights` applied.
    pub fn effective_weights(&self) -> Result<ScoringWeights> {
        ScoringWeights::default().with_overrides(&self.custom_weights)
    }

    /// Check invariants that deserialization alone cannot express.
    pub fn validate(&self) -> Result<()> {
        let _ = self.effective_weights()?;
        if self.streaming.chunk_size == 0 {
            return Err(invalid("streaming.chunkSize must be at least 1"));
        }
        if self.truncation.preserve_lines == 0 {
            return Err(invalid("truncation.preserveLines must be at least 1"));
        }
        if self.truncation.max_content_length < 64 {
            return Err(invalid("truncation.maxContentLength must be at least 64"));
        }
        if self.summarizer.repetition_threshold < 2 {
            return Err(invalid("summarizer.repetitionThreshold must be at least 2"));
        }
        Ok(())
    }
}

fn invalid(message: &str) -> SettingsError {
    SettingsError::InvalidValue(message.to_string())
}

/// Score adjustments derived from a message's position in the conversation graph.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DependencySettings {
    /// Added to messages with no parent.
    pub root_boost: i32,
    /// Added to messages with at least one child.
    pub children_boost: i32,
    /// Extra when any child is recent.
    pub recent_child_bonus: i32,
    /// Age, in days, under which a child counts as recent.
    pub recent_days: u32,
    /// Added per level of depth.
    pub depth_bonus_per_level: i32,
    /// Cap on the depth bonus.
    pub max_depth_bonus: i32,
    /// Added to leaves deep in a chain.
    pub conclusion_bonus: i32,
    /// Minimum depth for the conclusion bonus.
    pub conclusion_min_depth: usize,
}

impl Default for DependencySettings {
    fn default() -> Self {
        Self {
            root_boost: 10,
            children_boost: 5,
            recent_child_bonus: 5,
            recent_days: 7,
            depth_bonus_per_level: 2,
            max_depth_bonus: 10,
            conclusion_bonus: 10,
            conclusion_min_depth: 3,
        }
    }
}

/// Content truncation limits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TruncationSettings {
    /// Upper bound, in characters, for a compressed field.
    pub max_content_length: usize,
    /// Lines kept verbatim at each end of line-based truncation.
    pub preserve_lines: usize,
    /// Fields at or below this many characters are never truncated.
    pub min_compressed_length: usize,
}

impl Default for TruncationSettings {
    fn default() -> Self {
        Self {
            max_content_length: 2000,
            preserve_lines: 5,
            min_compressed_length: 200,
        }
    }
}

/// Chunked processing.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StreamingSettings {
    /// Messages per chunk.
    pub chunk_size: usize,
}

impl Default for StreamingSettings {
    fn default() -> Self {
        Self { chunk_size: 1000 }
    }
}

/// Repetition folding.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SummarizerSettings {
    /// Group size at which similar messages are folded into one summary.
    pub repetition_threshold: usize,
}

impl Default for SummarizerSettings {
    fn default() -> Self {
        Self {
            repetition_threshold: 3,
        }
    }
}

/// Cross-reference detection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReferenceSettings {
    /// How many earlier messages a full-text lookup scans.
    pub lookback_window: usize,
}

impl Default for ReferenceSettings {
    fn default() -> Self {
        Self {
            lookback_window: 50,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
