//! Importance scoring.
//!
//! A message's score is the sum of an ordered list of [`ScoringRule`]s, each
//! contributing a named delta, clamped to `[0, 100]`. Content rules read the
//! [`MessageSignals`] from the pattern analyzer; position rules read an
//! optional [`DependencyContext`] from the conversation graph.

use serde::Serialize;
use tracing::trace;

use sift_core::MessageKind;
use sift_core::Message;
use sift_core::constants::{is_code_modification_tool, is_inspection_tool};
use sift_settings::{DependencySettings, PrunerSettings, ScoringWeights, SettingsError};

use crate::graph::DependencyContext;
use crate::patterns::{MessageSignals, PatternAnalyzer, PatternCategory};

/// Highest possible score.
pub const MAX_SCORE: u8 = 100;

// ─────────────────────────────────────────────────────────────────────────────
// Rules
// ─────────────────────────────────────────────────────────────────────────────

/// One scoring rule. Evaluated in declaration order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringRule {
    /// Base weight for the record type.
    MessageType,
    /// Code-change patterns or a code-writing tool.
    CodeChanges,
    /// Error and fix patterns.
    ErrorSolution,
    /// Architecture and design discussion.
    ArchitectureDecision,
    /// A user turn that asks something.
    UserQuestion,
    /// A tool call that writes a file; halved for non-code files.
    FileModification,
    /// Stack traces, debug output, test failures.
    DebuggingInfo,
    /// Hook and automation log penalty.
    HookLog,
    /// Validation and status chatter penalty.
    SystemValidation,
    /// Empty body penalty.
    EmptyOutput,
    /// Tool-specific weight.
    ToolIdentity,
    /// Message with no parent.
    RootBoost,
    /// Message with children.
    ChildrenBoost,
    /// At least one child is recent.
    RecentChild,
    /// Proportional to chain depth, capped.
    DepthBonus,
    /// Leaf deep in a chain.
    ConversationConclusion,
}

impl ScoringRule {
    /// Every rule in evaluation order.
    pub const ALL: [Self; 16] = [
        Self::MessageType,
        Self::CodeChanges,
        Self::ErrorSolution,
        Self::ArchitectureDecision,
        Self::UserQuestion,
        Self::FileModification,
        Self::DebuggingInfo,
        Self::HookLog,
        Self::SystemValidation,
        Self::EmptyOutput,
        Self::ToolIdentity,
        Self::RootBoost,
        Self::ChildrenBoost,
        Self::RecentChild,
        Self::DepthBonus,
        Self::ConversationConclusion,
    ];

    /// Snake-case name used in logs and reports.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::MessageType => "message_type",
            Self::CodeChanges => "code_changes",
            Self::ErrorSolution => "error_solution",
            Self::ArchitectureDecision => "architecture_decision",
            Self::UserQuestion => "user_question",
            Self::FileModification => "file_modification",
            Self::DebuggingInfo => "debugging_info",
            Self::HookLog => "hook_log",
            Self::SystemValidation => "system_validation",
            Self::EmptyOutput => "empty_output",
            Self::ToolIdentity => "tool_identity",
            Self::RootBoost => "root_boost",
            Self::ChildrenBoost => "children_boost",
            Self::RecentChild => "recent_child",
            Self::DepthBonus => "depth_bonus",
            Self::ConversationConclusion => "conversation_conclusion",
        }
    }

    /// Whether the rule reads graph position rather than content.
    #[must_use]
    pub const fn is_positional(self) -> bool {
        matches!(
            self,
            Self::RootBoost
                | Self::ChildrenBoost
                | Self::RecentChild
                | Self::DepthBonus
                | Self::ConversationConclusion
        )
    }
}

impl std::fmt::Display for ScoringRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A non-zero delta from one rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct ScoreContribution {
    /// Rule that fired.
    pub rule: ScoringRule,
    /// Signed score change.
    pub delta: i32,
}

/// Every rule that fired for one message, plus the totals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ScoreBreakdown {
    /// Non-zero contributions in evaluation order.
    pub contributions: Vec<ScoreContribution>,
    /// Unclamped sum.
    pub raw: i32,
    /// Sum clamped to `[0, 100]`.
    pub total: u8,
}

impl ScoreBreakdown {
    /// Delta contributed by `rule`, zero if it did not fire.
    #[must_use]
    pub fn delta(&self, rule: ScoringRule) -> i32 {
        self.contributions
            .iter()
            .find(|c| c.rule == rule)
            .map_or(0, |c| c.delta)
    }

    fn push(&mut self, rule: ScoringRule, delta: i32) {
        if delta != 0 {
            self.contributions.push(ScoreContribution { rule, delta });
            self.raw = self.raw.saturating_add(delta);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ImportanceScorer
// ─────────────────────────────────────────────────────────────────────────────

/// Scores messages with a fixed set of weights.
///
/// Each instance owns its weights; instances share only the read-only
/// pattern tables.
#[derive(Clone, Debug)]
pub struct ImportanceScorer {
    weights: ScoringWeights,
    dependency: DependencySettings,
    analyzer: PatternAnalyzer,
}

impl Default for ImportanceScorer {
    fn default() -> Self {
        Self::new(ScoringWeights::default(), DependencySettings::default())
    }
}

impl ImportanceScorer {
    /// Create a scorer from explicit weights.
    #[must_use]
    pub fn new(weights: ScoringWeights, dependency: DependencySettings) -> Self {
        Self {
            weights,
            dependency,
            analyzer: PatternAnalyzer::new(),
        }
    }

    /// Create a scorer from settings, applying `customWeights`.
    pub fn from_settings(settings: &PrunerSettings) -> Result<Self, SettingsError> {
        Ok(Self::new(
            settings.effective_weights()?,
            settings.dependency.clone(),
        ))
    }

    /// The weights in use.
    #[must_use]
    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    /// The analyzer used for content signals.
    #[must_use]
    pub fn analyzer(&self) -> PatternAnalyzer {
        self.analyzer
    }

    /// Score a message, analyzing its content first.
    #[must_use]
    pub fn score(&self, message: &Message, context: Option<&DependencyContext>) -> u8 {
        let signals = self.analyzer.analyze(message);
        self.score_signals(message, &signals, context)
    }

    /// Score a message whose signals were already computed.
    #[must_use]
    pub fn score_signals(
        &self,
        message: &Message,
        signals: &MessageSignals,
        context: Option<&DependencyContext>,
    ) -> u8 {
        self.breakdown(message, signals, context).total
    }

    /// Evaluate every rule and return the fired deltas.
    #[must_use]
    pub fn breakdown(
        &self,
        message: &Message,
        signals: &MessageSignals,
        context: Option<&DependencyContext>,
    ) -> ScoreBreakdown {
        let mut breakdown = ScoreBreakdown::default();
        for rule in ScoringRule::ALL {
            let delta = self.evaluate(rule, message, signals, context);
            if delta != 0 {
                trace!(uuid = %message.uuid, rule = rule.as_str(), delta, "score rule fired");
            }
            breakdown.push(rule, delta);
        }
        breakdown.total = clamp_score(breakdown.raw);
        trace!(uuid = %message.uuid, raw = breakdown.raw, total = breakdown.total, "scored");
        breakdown
    }

    fn evaluate(
        &self,
        rule: ScoringRule,
        message: &Message,
        signals: &MessageSignals,
        context: Option<&DependencyContext>,
    ) -> i32 {
        let w = &self.weights;
        let patterns = &signals.patterns;
        let when = |fired: bool, weight: i32| if fired { weight } else { 0 };

        match rule {
            ScoringRule::MessageType => match message.kind {
                MessageKind::User => w.user_message,
                MessageKind::Assistant => w.assistant_message,
                MessageKind::ToolCall { .. } => w.tool_message,
                MessageKind::System => w.system_message,
            },
            ScoringRule::CodeChanges => {
                when(patterns.detected(PatternCategory::CodeChange), w.code_changes)
            }
            ScoringRule::ErrorSolution => when(
                patterns.detected(PatternCategory::ErrorSolution),
                w.error_solution,
            ),
            ScoringRule::ArchitectureDecision => when(
                patterns.detected(PatternCategory::Architecture),
                w.architecture_decision,
            ),
            ScoringRule::UserQuestion => when(signals.question, w.user_question),
            ScoringRule::FileModification => match &signals.tool {
                Some(tool) if tool.code_modification.detected => {
                    if tool.code_file {
                        w.file_modification
                    } else {
                        w.file_modification / 2
                    }
                }
                _ => 0,
            },
            ScoringRule::DebuggingInfo => when(signals.debugging, w.debugging_info),
            ScoringRule::HookLog => when(patterns.detected(PatternCategory::HookLog), w.hook_log),
            ScoringRule::SystemValidation => when(
                patterns.detected(PatternCategory::SystemNoise) && !signals.empty,
                w.system_validation,
            ),
            ScoringRule::EmptyOutput => when(signals.empty, w.empty_output),
            ScoringRule::ToolIdentity => match message.tool_name() {
                Some(tool) if is_code_modification_tool(tool) => w.tool_write,
                Some(tool) if is_inspection_tool(tool) => w.tool_read,
                Some(_) => w.tool_default,
                None => 0,
            },
            ScoringRule::RootBoost => {
                context.map_or(0, |c| when(c.is_root, self.dependency.root_boost))
            }
            ScoringRule::ChildrenBoost => context.map_or(0, |c| {
                when(c.child_count > 0, self.dependency.children_boost)
            }),
            ScoringRule::RecentChild => context.map_or(0, |c| {
                when(c.has_recent_child, self.dependency.recent_child_bonus)
            }),
            ScoringRule::DepthBonus => context.map_or(0, |c| {
                let depth = i32::try_from(c.depth).unwrap_or(i32::MAX);
                depth
                    .saturating_mul(self.dependency.depth_bonus_per_level)
                    .min(self.dependency.max_depth_bonus)
            }),
            ScoringRule::ConversationConclusion => context.map_or(0, |c| {
                when(
                    c.child_count == 0 && c.depth >= self.dependency.conclusion_min_depth,
                    self.dependency.conclusion_bonus,
                )
            }),
        }
    }
}

fn clamp_score(raw: i32) -> u8 {
    u8::try_from(raw.clamp(0, i32::from(MAX_SCORE))).unwrap_or(MAX_SCORE)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
