//! Error hierarchy for sift.
//!
//! Two layers, built on [`thiserror`]:
//!
//! - [`ParseError`]: why a single JSONL line was rejected. These never escape
//!   the parser; malformed lines are skipped and counted.
//! - [`SiftError`]: failures surfaced at the file-processing boundary, carrying
//!   enough context (path, [`PipelineStage`], message uuid) to be actionable.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// ParseError
// ─────────────────────────────────────────────────────────────────────────────

/// Reason a single input line was rejected.
#[derive(Debug, Error)]
pub enum ParseError {
    /// The line is not valid JSON.
    #[error("invalid JSON: {0}")]
    InvalidJson(#[from] serde_json::Error),

    /// The line is valid JSON but not an object.
    #[error("record is not a JSON object")]
    NotAnObject,

    /// A required key is absent.
    #[error("missing required field: {field}")]
    MissingField {
        /// Name of the missing key.
        field: &'static str,
    },

    /// A key is present but has the wrong shape.
    #[error("invalid field {field}: {reason}")]
    InvalidField {
        /// Name of the offending key.
        field: &'static str,
        /// What was wrong with it.
        reason: &'static str,
    },

    /// `type` is not one of the four known record kinds.
    #[error("unknown record type: {kind}")]
    UnknownType {
        /// The unrecognized type string.
        kind: String,
    },

    /// `uuid` is present but empty.
    #[error("uuid must be a non-empty string")]
    EmptyUuid,

    /// The line is not valid UTF-8.
    #[error("line is not valid UTF-8")]
    InvalidUtf8,
}

// ─────────────────────────────────────────────────────────────────────────────
// PipelineStage
// ─────────────────────────────────────────────────────────────────────────────

/// Stages of the per-file pruning pipeline, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    /// Reading and parsing the input file.
    Load,
    /// Building the conversation dependency graph.
    BuildGraph,
    /// Detecting cross-references between messages.
    AnalyzeReferences,
    /// Scoring and threshold selection.
    SelectImportant,
    /// Ancestor, Q→A, reference, and debugging preservation.
    ApplyDependencyPreservation,
    /// Classification, compression rules, and content rewriting.
    Compress,
    /// Post-pruning chain integrity check.
    ValidateIntegrity,
    /// Writing the pruned output.
    Write,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Load => "load",
            Self::BuildGraph => "build_graph",
            Self::AnalyzeReferences => "analyze_references",
            Self::SelectImportant => "select_important",
            Self::ApplyDependencyPreservation => "apply_dependency_preservation",
            Self::Compress => "compress",
            Self::ValidateIntegrity => "validate_integrity",
            Self::Write => "write",
        };
        f.write_str(name)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// SiftError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced to callers of the pruning engine.
#[derive(Debug, Error)]
pub enum SiftError {
    /// The input file does not exist. Reported before any processing starts.
    #[error("input file not found: {}", .path.display())]
    FileNotFound {
        /// Path that was requested.
        path: PathBuf,
    },

    /// Reading or writing a file failed.
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        /// File being accessed.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Engine configuration was rejected at construction time.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A pipeline stage failed unexpectedly.
    #[error("stage {stage} failed{}: {message}", uuid_suffix(.uuid.as_deref()))]
    Stage {
        /// Stage that failed.
        stage: PipelineStage,
        /// Message being processed, if known.
        uuid: Option<String>,
        /// Human-readable description.
        message: String,
    },

    /// JSON serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SiftError {
    /// Build an I/O error for `path`, mapping `NotFound` to [`SiftError::FileNotFound`].
    #[must_use]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::FileNotFound { path }
        } else {
            Self::Io { path, source }
        }
    }

    /// Build a stage failure.
    #[must_use]
    pub fn stage(stage: PipelineStage, uuid: Option<&str>, message: impl Into<String>) -> Self {
        Self::Stage {
            stage,
            uuid: uuid.map(str::to_owned),
            message: message.into(),
        }
    }

    /// The pipeline stage this error is attributed to, if any.
    #[must_use]
    pub fn pipeline_stage(&self) -> Option<PipelineStage> {
        match self {
            Self::Stage { stage, .. } => Some(*stage),
            Self::FileNotFound { .. } => Some(PipelineStage::Load),
            Self::Io { .. } | Self::InvalidConfig(_) | Self::Json(_) => None,
        }
    }
}

fn uuid_suffix(uuid: Option<&str>) -> String {
    uuid.map(|u| format!(" at message {u}")).unwrap_or_default()
}

/// Result type for sift operations.
pub type Result<T> = std::result::Result<T, SiftError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
