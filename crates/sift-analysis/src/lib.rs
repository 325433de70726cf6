//! # sift-analysis
//!
//! Per-message signals and per-conversation structure.
//!
//! - **Pattern analyzer**: regex tables producing named confidence signals
//!   (code change, error/solution, architecture, hook log, system noise)
//! - **Importance scorer**: ordered, named scoring rules over pattern signals,
//!   message type, tool identity, and graph position, clamped to `[0, 100]`
//! - **Dependency graph**: arena of parent/child links with depth, roots,
//!   orphans, branch points, greedy longest chains, and cycle detection
//! - **Reference analyzer**: finds earlier messages that later ones point back to

#![deny(unsafe_code)]

pub mod graph;
pub mod patterns;
pub mod references;
pub mod scoring;

pub use graph::{BranchPoint, Chain, ConversationGraph, DependencyContext, GraphStats, NodeId};
pub use patterns::{
    MessageSignals, PatternAnalyzer, PatternCategory, PatternMatch, PatternSignals, ToolSignals,
};
pub use references::{Reference, ReferenceAnalyzer, ReferenceKind, ReferenceMap};
pub use scoring::{ImportanceScorer, ScoreBreakdown, ScoreContribution, ScoringRule};
