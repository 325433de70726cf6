//! Content classification.
//!
//! Sorts each message into one of four [`ContentCategory`] buckets with an
//! ordered list of rule checks. When no rule fires the importance score's
//! quartile decides.

use serde::Serialize;

use sift_analysis::{MessageSignals, PatternAnalyzer, PatternCategory};
use sift_core::constants::is_inspection_tool;
use sift_core::{Message, MessageKind};

use crate::constants::{CATEGORY_CONFIDENCE, ROUTINE_TOOL_CHARS, SUBSTANTIAL_EXPLANATION_CHARS};

/// Importance bucket for compression decisions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    /// Essential: kept verbatim.
    High,
    /// Useful context: lightly compressed.
    Medium,
    /// Routine: heavily compressed.
    Low,
    /// Noise: removed.
    VeryLow,
}

impl ContentCategory {
    /// All categories, most to least important.
    pub const ALL: [Self; 4] = [Self::High, Self::Medium, Self::Low, Self::VeryLow];

    /// Quartile bucket for a score.
    #[must_use]
    pub const fn from_score(score: u8) -> Self {
        match score {
            75.. => Self::High,
            50..=74 => Self::Medium,
            25..=49 => Self::Low,
            _ => Self::VeryLow,
        }
    }

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::VeryLow => "very_low",
        }
    }
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rule-based classifier.
#[derive(Clone, Copy, Debug, Default)]
pub struct ContentClassifier {
    analyzer: PatternAnalyzer,
}

impl ContentClassifier {
    /// Create a classifier.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Classify a message, analyzing its content first.
    #[must_use]
    pub fn classify(&self, message: &Message, score: u8) -> ContentCategory {
        let signals = self.analyzer.analyze(message);
        self.classify_signals(message, &signals, score)
    }

    /// Classify a message whose signals were already computed.
    #[must_use]
    pub fn classify_signals(
        &self,
        message: &Message,
        signals: &MessageSignals,
        score: u8,
    ) -> ContentCategory {
        if is_high(signals) {
            ContentCategory::High
        } else if is_medium(message, signals) {
            ContentCategory::Medium
        } else if is_low(signals) {
            ContentCategory::Low
        } else if is_very_low(signals) {
            ContentCategory::VeryLow
        } else {
            ContentCategory::from_score(score)
        }
    }
}

fn confident(signals: &MessageSignals, category: PatternCategory) -> bool {
    signals.patterns.confidence(category) >= CATEGORY_CONFIDENCE
}

// ── rule checks ─────────────────────────────────────────────────────────────

fn is_high(signals: &MessageSignals) -> bool {
    signals.question
        || confident(signals, PatternCategory::ErrorSolution)
        || signals
            .tool
            .as_ref()
            .is_some_and(|t| t.code_modification.detected)
        || confident(signals, PatternCategory::Architecture)
        || (signals.debugging && signals.error_keywords)
}

fn is_medium(message: &Message, signals: &MessageSignals) -> bool {
    let file_read = message
        .tool_name()
        .is_some_and(|t| is_inspection_tool(t) && t != "Bash");
    let explanation = matches!(message.kind, MessageKind::Assistant)
        && signals.content_len >= SUBSTANTIAL_EXPLANATION_CHARS
        && !signals.patterns.detected(PatternCategory::HookLog);
    file_read
        || signals.debugging
        || signals.patterns.detected(PatternCategory::ErrorSolution)
        || explanation
        || signals.test_execution
}

fn is_low(signals: &MessageSignals) -> bool {
    let noise = signals.patterns.detected(PatternCategory::SystemNoise)
        && !signals.patterns.detected(PatternCategory::HookLog)
        && !signals.empty
        && !signals.bare_confirmation;
    let routine_tool = signals.tool.is_some() && signals.content_len < ROUTINE_TOOL_CHARS;
    noise || routine_tool
}

fn is_very_low(signals: &MessageSignals) -> bool {
    signals.patterns.detected(PatternCategory::HookLog) || signals.empty || signals.bare_confirmation
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
