//! Post-pruning chain integrity check.
//!
//! Compares the pruned message set against the original and reports
//! messages left pointing at a removed parent, plus the stretches of each
//! original chain that pruning cut out. The report is diagnostic only; it
//! never blocks output.

use std::collections::HashSet;

use serde::Serialize;
use tracing::debug;

use sift_analysis::ConversationGraph;
use sift_core::Message;

/// A run of consecutive positions removed from one chain (inclusive).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ChainGap {
    /// First removed position on the original chain.
    pub start: usize,
    /// Last removed position on the original chain.
    pub end: usize,
}

impl ChainGap {
    /// Number of removed messages in the gap.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.end - self.start + 1
    }

    /// Always `false`; a gap spans at least one message.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        false
    }
}

/// Integrity of one original chain after pruning.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChainReport {
    /// Uuid of the chain start.
    pub chain_id: String,
    /// Messages on the original chain.
    pub original_len: usize,
    /// Chain messages still present after pruning.
    pub kept: usize,
    /// Removed stretches; empty when intact.
    pub gaps: Vec<ChainGap>,
    /// The chain start survived pruning.
    pub start_kept: bool,
}

impl ChainReport {
    /// Whether pruning left the chain whole.
    #[must_use]
    pub fn is_intact(&self) -> bool {
        self.start_kept && self.gaps.is_empty()
    }
}

/// Result of an integrity check.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrityReport {
    /// Pruned messages whose parent was in the original but not the pruned set.
    pub orphans: Vec<String>,
    /// Chains in the original set.
    pub total_chains: usize,
    /// Chains left whole.
    pub intact_chains: usize,
    /// Chains with a removed start or a gap.
    pub broken_chains: usize,
    /// `intact_chains / total_chains`, 1.0 for an empty input.
    pub integrity_score: f64,
    /// No orphans and no broken chains.
    pub chains_preserved: bool,
    /// Per-chain detail for broken chains.
    pub broken: Vec<ChainReport>,
}

/// Check `pruned` against `original`.
#[must_use]
pub fn validate(original: &[Message], pruned: &[Message]) -> IntegrityReport {
    let original_uuids: HashSet<&str> = original.iter().map(|m| m.uuid.as_str()).collect();
    let pruned_uuids: HashSet<&str> = pruned.iter().map(|m| m.uuid.as_str()).collect();

    let orphans: Vec<String> = pruned
        .iter()
        .filter(|m| {
            m.parent_uuid.as_deref().is_some_and(|p| {
                original_uuids.contains(p) && !pruned_uuids.contains(p)
            })
        })
        .map(|m| m.uuid.clone())
        .collect();

    let original_graph = ConversationGraph::build(original);
    let pruned_graph = ConversationGraph::build(pruned);
    let pruned_starts: HashSet<&str> = pruned_graph
        .chains()
        .iter()
        .map(|c| c.root.as_str())
        .collect();

    let reports: Vec<ChainReport> = original_graph
        .chains()
        .iter()
        .map(|chain| {
            let start_kept = pruned_starts.contains(chain.root.as_str());
            let present: Vec<bool> = chain
                .uuids
                .iter()
                .map(|u| pruned_uuids.contains(u.as_str()))
                .collect();
            ChainReport {
                chain_id: chain.root.clone(),
                original_len: chain.len(),
                kept: present.iter().filter(|p| **p).count(),
                gaps: gaps(&present),
                start_kept,
            }
        })
        .collect();

    let total_chains = reports.len();
    let broken: Vec<ChainReport> = reports.into_iter().filter(|r| !r.is_intact()).collect();
    let broken_chains = broken.len();
    let intact_chains = total_chains - broken_chains;
    #[allow(clippy::cast_precision_loss)]
    let integrity_score = if total_chains == 0 {
        1.0
    } else {
        intact_chains as f64 / total_chains as f64
    };

    debug!(
        orphans = orphans.len(),
        total_chains,
        broken_chains,
        integrity_score,
        "integrity check complete"
    );

    IntegrityReport {
        chains_preserved: orphans.is_empty() && broken_chains == 0,
        orphans,
        total_chains,
        intact_chains,
        broken_chains,
        integrity_score,
        broken,
    }
}

/// Runs of `false` in `present`.
fn gaps(present: &[bool]) -> Vec<ChainGap> {
    let mut out = Vec::new();
    let mut open: Option<usize> = None;
    for (i, &kept) in present.iter().enumerate() {
        match (open, kept) {
            (None, false) => open = Some(i),
            (Some(start), true) => {
                out.push(ChainGap { start, end: i - 1 });
                open = None;
            }
            _ => {}
        }
    }
    if let Some(start) = open {
        out.push(ChainGap {
            start,
            end: present.len() - 1,
        });
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
