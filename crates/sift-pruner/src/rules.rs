//! Compression rules engine.
//!
//! Decides what happens to a message that was not selected outright. The
//! decision is layered: a base rule per [`ContentCategory`], then a tool
//! override, then a size adjustment to the ratio, and finally a hard
//! override that preserves anything mentioning errors.

use serde::Serialize;

use sift_analysis::MessageSignals;
use sift_core::Message;

use crate::classifier::ContentCategory;
use crate::constants::{
    LARGE_CONTENT_CHARS, MAX_COMPRESSION_RATIO, SIZE_RATIO_ADJUSTMENT, SMALL_CONTENT_CHARS,
};

/// What to do with a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionAction {
    /// Keep verbatim.
    Preserve,
    /// Keep, lightly truncated.
    Compress,
    /// Keep, heavily truncated.
    CompressHeavily,
    /// Drop.
    Remove,
}

impl CompressionAction {
    /// Whether the message's content is rewritten.
    #[must_use]
    pub const fn compresses(self) -> bool {
        matches!(self, Self::Compress | Self::CompressHeavily)
    }
}

/// Which layer produced the final decision.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RuleSource {
    /// Category base rule.
    Category,
    /// Tool-specific override.
    Tool,
    /// Error keyword override.
    ErrorKeywords,
}

/// A compression decision.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct CompressionRule {
    /// Action to take.
    pub action: CompressionAction,
    /// Fraction of content to remove, in `[0, 0.9]` for compress actions.
    pub ratio: f64,
    /// Layer that decided.
    pub source: RuleSource,
}

impl CompressionRule {
    const fn new(action: CompressionAction, ratio: f64, source: RuleSource) -> Self {
        Self {
            action,
            ratio,
            source,
        }
    }

    /// Base rule for a category.
    #[must_use]
    pub const fn for_category(category: ContentCategory) -> Self {
        let (action, ratio) = match category {
            ContentCategory::High => (CompressionAction::Preserve, 0.0),
            ContentCategory::Medium => (CompressionAction::Compress, 0.3),
            ContentCategory::Low => (CompressionAction::CompressHeavily, 0.7),
            ContentCategory::VeryLow => (CompressionAction::Remove, 1.0),
        };
        Self::new(action, ratio, RuleSource::Category)
    }

    /// Tool-specific rule, if the tool has one.
    #[must_use]
    pub fn for_tool(tool: &str) -> Option<Self> {
        let (action, ratio) = match tool {
            "Write" | "Edit" | "MultiEdit" => (CompressionAction::Preserve, 0.0),
            "Read" => (CompressionAction::Compress, 0.5),
            "Bash" => (CompressionAction::Compress, 0.4),
            "Grep" | "Glob" => (CompressionAction::CompressHeavily, 0.7),
            "TodoWrite" => (CompressionAction::CompressHeavily, 0.8),
            _ => return None,
        };
        Some(Self::new(action, ratio, RuleSource::Tool))
    }
}

/// Layers category, tool, size, and error rules into one decision.
#[derive(Clone, Copy, Debug, Default)]
pub struct CompressionRulesEngine;

impl CompressionRulesEngine {
    /// Create an engine.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Decide the rule for `message`.
    #[must_use]
    pub fn compression_rule(
        &self,
        message: &Message,
        signals: &MessageSignals,
        category: ContentCategory,
    ) -> CompressionRule {
        let mut rule = CompressionRule::for_category(category);

        if let Some(tool_rule) = message.tool_name().and_then(CompressionRule::for_tool) {
            rule = tool_rule;
        }

        if rule.action.compresses() {
            rule.ratio = adjust_for_size(rule.ratio, signals.content_len);
        }

        if signals.error_keywords {
            rule = CompressionRule::new(CompressionAction::Preserve, 0.0, RuleSource::ErrorKeywords);
        }

        rule
    }
}

fn adjust_for_size(ratio: f64, len: usize) -> f64 {
    let adjusted = if len > LARGE_CONTENT_CHARS {
        ratio + SIZE_RATIO_ADJUSTMENT
    } else if len < SMALL_CONTENT_CHARS {
        ratio - SIZE_RATIO_ADJUSTMENT
    } else {
        ratio
    };
    adjusted.clamp(0.0, MAX_COMPRESSION_RATIO)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use sift_analysis::PatternAnalyzer;
    use sift_core::MessageKind;

    fn rule(msg: &Message, category: ContentCategory) -> CompressionRule {
        let signals = PatternAnalyzer::new().analyze(msg);
        CompressionRulesEngine::new().compression_rule(msg, &signals, category)
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn category_base_rules() {
        let body = "a".repeat(1000);
        let msg = Message::new("a", MessageKind::Assistant).with_content(body);
        assert_eq!(rule(&msg, ContentCategory::High).action, CompressionAction::Preserve);
        let medium = rule(&msg, ContentCategory::Medium);
        assert_eq!(medium.action, CompressionAction::Compress);
        assert!(close(medium.ratio, 0.3));
        let low = rule(&msg, ContentCategory::Low);
        assert_eq!(low.action, CompressionAction::CompressHeavily);
        assert!(close(low.ratio, 0.7));
        assert_eq!(rule(&msg, ContentCategory::VeryLow).action, CompressionAction::Remove);
    }

    #[test]
    fn tool_overrides_category() {
        let write = Message::new("w", MessageKind::tool("Write")).with_content("x".repeat(500));
        let r = rule(&write, ContentCategory::VeryLow);
        assert_eq!(r.action, CompressionAction::Preserve);
        assert_eq!(r.source, RuleSource::Tool);

        let todo = Message::new("t", MessageKind::tool("TodoWrite")).with_result("y".repeat(500));
        let r = rule(&todo, ContentCategory::High);
        assert_eq!(r.action, CompressionAction::CompressHeavily);
        assert!(close(r.ratio, 0.8));
    }

    #[test]
    fn size_adjusts_ratio() {
        let big = Message::new("b", MessageKind::tool("Read")).with_result("z".repeat(6000));
        assert!(close(rule(&big, ContentCategory::Medium).ratio, 0.7));

        let small = Message::new("s", MessageKind::tool("Bash")).with_result("ok then");
        assert!(close(rule(&small, ContentCategory::Medium).ratio, 0.2));

        let todo = Message::new("t", MessageKind::tool("TodoWrite")).with_result("q".repeat(6000));
        assert!(close(rule(&todo, ContentCategory::Low).ratio, 0.9));
    }

    #[test]
    fn ratio_never_leaves_bounds() {
        for len in [0, 10, 199, 200, 5000, 5001, 20_000] {
            for base in [0.0, 0.3, 0.7, 0.8, 0.9] {
                let r = adjust_for_size(base, len);
                assert!((0.0..=MAX_COMPRESSION_RATIO).contains(&r));
            }
        }
    }

    #[test]
    fn error_keywords_force_preserve() {
        let msg = Message::new("e", MessageKind::tool("Grep"))
            .with_result("src/x.py:10: raise ValueError('bad')");
        let r = rule(&msg, ContentCategory::VeryLow);
        assert_eq!(r.action, CompressionAction::Preserve);
        assert_eq!(r.source, RuleSource::ErrorKeywords);
    }
}
