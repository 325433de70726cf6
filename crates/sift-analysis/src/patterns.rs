//! Regex-driven content signals.
//!
//! The [`PatternAnalyzer`] runs a fixed table of compiled regexes over a
//! message's text and reports, per [`PatternCategory`], whether anything
//! matched and with what confidence. Confidence is the fraction of a
//! category's sub-patterns that matched, plus an additive boost for
//! categories whose matches are high precision (hook markers, explicit error
//! keywords), capped at 1.0.
//!
//! The tables are compiled once per process and shared read-only by every
//! analyzer instance.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};

use sift_core::constants::{has_code_extension, is_code_modification_tool};
use sift_core::{Message, MessageKind};

/// Bodies shorter than this (after trimming) count as empty output.
pub const NEAR_EMPTY_CHARS: usize = 3;

/// Parameter keys that carry a file path in tool calls.
const PATH_PARAMETER_KEYS: &[&str] = &["file_path", "filePath", "path", "notebook_path"];

// ─────────────────────────────────────────────────────────────────────────────
// Categories and matches
// ─────────────────────────────────────────────────────────────────────────────

/// Content category a sub-pattern table detects.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternCategory {
    /// File edits, definitions, imports, language fingerprints.
    CodeChange,
    /// Error keywords, fixes, debugging, test failures.
    ErrorSolution,
    /// Design patterns, architecture decisions, technology comparisons.
    Architecture,
    /// Hook and automation log lines.
    HookLog,
    /// Validation, status, confirmation, and empty bodies.
    SystemNoise,
}

impl PatternCategory {
    /// Every category, in table order.
    pub const ALL: [Self; 5] = [
        Self::CodeChange,
        Self::ErrorSolution,
        Self::Architecture,
        Self::HookLog,
        Self::SystemNoise,
    ];

    /// Snake-case name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::CodeChange => "code_change",
            Self::ErrorSolution => "error_solution",
            Self::Architecture => "architecture",
            Self::HookLog => "hook_log",
            Self::SystemNoise => "system_noise",
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

/// Detection result for one category.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PatternMatch {
    /// At least one sub-pattern matched.
    pub detected: bool,
    /// Matched fraction plus boost, in `[0, 1]`.
    pub confidence: f64,
}

impl PatternMatch {
    /// A certain detection.
    pub const CERTAIN: Self = Self {
        detected: true,
        confidence: 1.0,
    };

    fn strongest(self, other: Self) -> Self {
        if other.confidence > self.confidence {
            other
        } else {
            self
        }
    }
}

/// Per-category detection results for one text.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct PatternSignals {
    matches: [PatternMatch; 5],
}

impl PatternSignals {
    /// Result for `category`.
    #[must_use]
    pub fn get(&self, category: PatternCategory) -> PatternMatch {
        self.matches[category.index()]
    }

    /// Whether `category` was detected.
    #[must_use]
    pub fn detected(&self, category: PatternCategory) -> bool {
        self.get(category).detected
    }

    /// Confidence for `category`.
    #[must_use]
    pub fn confidence(&self, category: PatternCategory) -> f64 {
        self.get(category).confidence
    }

    /// Iterate `(category, match)` pairs in table order.
    pub fn iter(&self) -> impl Iterator<Item = (PatternCategory, PatternMatch)> + '_ {
        PatternCategory::ALL
            .into_iter()
            .map(|category| (category, self.get(category)))
    }

    fn set(&mut self, category: PatternCategory, m: PatternMatch) {
        self.matches[category.index()] = m;
    }
}

/// Signals specific to tool calls.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ToolSignals {
    /// Tool name.
    pub tool: String,
    /// Certain when the tool writes source files.
    pub code_modification: PatternMatch,
    /// File path taken from the tool parameters, if any.
    pub file_path: Option<String>,
    /// The file path ends in a code extension.
    pub code_file: bool,
}

/// Everything the scorer and classifier need to know about one message.
///
/// Computed once per message so each regex runs once.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct MessageSignals {
    /// Category detections over the message text (tool detection merged in).
    pub patterns: PatternSignals,
    /// Tool-call specifics.
    pub tool: Option<ToolSignals>,
    /// A user turn that asks something.
    pub question: bool,
    /// Stack traces, debug output, or test-failure phrasing.
    pub debugging: bool,
    /// Explicit fix or root-cause phrasing.
    pub explicit_fix: bool,
    /// Error or exception keywords anywhere in the text.
    pub error_keywords: bool,
    /// Test-runner invocation or result.
    pub test_execution: bool,
    /// Body is empty or near-empty.
    pub empty: bool,
    /// Body is a bare confirmation ("ok", "done", ...).
    pub bare_confirmation: bool,
    /// Character count of body plus tool result.
    pub content_len: usize,
}

impl MessageSignals {
    /// Error traces, explicit fixes, debug output, or test failures.
    #[must_use]
    pub fn is_debugging_context(&self) -> bool {
        self.debugging || self.explicit_fix
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Compiled tables
// ─────────────────────────────────────────────────────────────────────────────

struct CategoryTable {
    category: PatternCategory,
    patterns: Vec<Regex>,
    /// Added to confidence when the sub-pattern at `boost_on` matched
    /// (`None` means any match).
    boost: f64,
    boost_on: Option<usize>,
}

impl CategoryTable {
    fn evaluate(&self, text: &str) -> PatternMatch {
        let hits: Vec<bool> = self.patterns.iter().map(|p| p.is_match(text)).collect();
        let matched = hits.iter().filter(|h| **h).count();
        if matched == 0 {
            return PatternMatch::default();
        }
        #[allow(clippy::cast_precision_loss)]
        let mut confidence = matched as f64 / self.patterns.len() as f64;
        let boosted = match self.boost_on {
            Some(i) => hits.get(i).copied().unwrap_or(false),
            None => true,
        };
        if boosted {
            confidence += self.boost;
        }
        PatternMatch {
            detected: true,
            confidence: confidence.min(1.0),
        }
    }
}

struct PatternTables {
    categories: Vec<CategoryTable>,
    question: Regex,
    debugging: Vec<Regex>,
    explicit_fix: Regex,
    error_keywords: Regex,
    test_execution: Regex,
    bare_confirmation: Regex,
}

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns.iter().map(|p| Regex::new(p).unwrap()).collect()
}

const BARE_CONFIRMATION: &str = r"(?i)^\s*(ok(ay)?|done|success|completed|confirmed|acknowledged|got it|sure|yes|no|thanks?( you)?|great|perfect)\s*[.!]*\s*$";

const TEST_FAILURE: &str =
    r"(?i)(\btests?\s+(failed|failing|fail)\b|\bassertion\s*(error|failed)\b|\b\d+\s+failed\b|\bFAILED\b)";

static TABLES: LazyLock<PatternTables> = LazyLock::new(|| PatternTables {
    categories: vec![
        CategoryTable {
            category: PatternCategory::CodeChange,
            patterns: compile(&[
                r"(?i)\b(created|modified|updated|edited|wrote|changed|refactored|renamed)\s+(the\s+|a\s+|new\s+)?(file|function|class|method|module|struct|component)\b",
                r"(?m)^\s*(pub(\([a-z]+\))?\s+)?(async\s+)?(fn|def|function|class|struct|enum|trait|impl|interface)\s+[A-Za-z_]\w*",
                r#"(?m)^\s*(import\s+[\w.{}*, ]+|from\s+[\w.]+\s+import\b|use\s+[\w:]+|#include\s*[<"]|const\s+\w+\s*=\s*require\()"#,
                r"\b[\w./-]+\.(py|rs|js|ts|tsx|jsx|go|java|kt|swift|c|h|cpp|hpp|cs|rb|php|scala|sh|sql)\b",
                r"(=>|->\s*[A-Za-z_&(\[]|::\w+\(|\bself\.\w+|\bthis\.\w+|\blet\s+(mut\s+)?\w+\s*[:=]|\bconst\s+\w+\s*=|console\.log\(|println!\(|```[a-z]+)",
            ]),
            boost: 0.0,
            boost_on: None,
        },
        CategoryTable {
            category: PatternCategory::ErrorSolution,
            patterns: compile(&[
                r"(?i)\b(error|exception|traceback|panic(ked)?|fatal|segfault|crash(ed)?)\b",
                r"(?i)\b(fix(ed|es|ing)?|resolv(e|ed|es|ing)|solved|solution|workaround|patch(ed)?)\b",
                r"(?i)\b(debug(ging|ged)?|stack\s*trace|breakpoint|root\s+cause|investigat(e|ing))\b",
                TEST_FAILURE,
                r"\b[A-Z][A-Za-z]*(Error|Exception)\b",
            ]),
            boost: 0.2,
            boost_on: Some(0),
        },
        CategoryTable {
            category: PatternCategory::Architecture,
            patterns: compile(&[
                r"(?i)\b(singleton|factory|observer|strategy pattern|adapter|decorator|repository pattern|dependency injection|mvc|mvvm|microservices?|monolith|event[- ]driven|pub/?sub|middleware|layered architecture|hexagonal)\b",
                r"(?i)\barchitect(ure|ural)\s+(decision|choice|pattern|change)s?\b",
                r"(?i)\b(design\s+(decision|choice|pattern)s?|trade-?offs?)\b",
                r"(?i)\b(instead of|rather than|compared to|versus|vs\.?|better than|pros and cons)\b",
                r"(?i)\b(we should use|decided to (use|go with)|chose|opted for|going with)\b",
            ]),
            boost: 0.0,
            boost_on: None,
        },
        CategoryTable {
            category: PatternCategory::HookLog,
            patterns: compile(&[
                r"(?i)\bhook\s*:",
                r"(?i)\b((pre|post)[-_ ]?tool[-_ ]?(use)?[-_ ]?hook|(pre|post)tooluse)\b",
                r"(?i)\bhooks?\s+(executed|triggered|completed|ran|running|started|finished|fired|succeeded)\b",
                r"(?i)\[hook[^\]]*\]",
            ]),
            boost: 0.3,
            boost_on: None,
        },
        CategoryTable {
            category: PatternCategory::SystemNoise,
            patterns: compile(&[
                r"(?i)\b(validation|validating|validated|check)\s+(passed|successful|succeeded|completed?|ok)\b",
                r"(?i)\b(status|health\s*check)\s*:\s*(ok|success|healthy|green|passed|running)\b",
                BARE_CONFIRMATION,
                r"(?i)\b(all checks passed|no issues found|nothing to do|up to date|no changes)\b",
            ]),
            boost: 0.0,
            boost_on: None,
        },
    ],
    question: Regex::new(
        r"(?im)(\?\s*$|\?\s|^\s*(how|what|why|when|where|which|who|can|could|should|would|is|are|does|do|will)\b)",
    )
    .unwrap(),
    debugging: compile(&[
        r"(?i)traceback \(most recent call last\)",
        r"(?m)^\s+at\s+\S+.*:\d+(:\d+)?\)?\s*$",
        r"(?i)\bstack\s*trace\b",
        r"thread '[^']*' panicked at",
        r#"(?i)\bfile "[^"]+", line \d+"#,
        r"(?i)(\bconsole\.log\(|\bprintln!\(|\beprintln!\(|\bdbg!\(|\bprint\(|\blogger\.debug\b|\bdebug (output|log)\b)",
        TEST_FAILURE,
    ]),
    explicit_fix: Regex::new(
        r"(?i)\b(fixed|the fix|fix(es)? (the|this|it)|root cause|resolved (the|this|it)|solution is|workaround)\b",
    )
    .unwrap(),
    error_keywords: Regex::new(
        r"(?i)(\b(errors?|exceptions?|traceback|panicked)\b|[a-z](error|exception)\b)",
    )
    .unwrap(),
    test_execution: Regex::new(
        r"(?i)\b(pytest|cargo test|npm (run )?test|yarn test|go test|jest|mocha|unittest|rspec|running \d+ tests?|test result:|\d+ passed)\b",
    )
    .unwrap(),
    bare_confirmation: Regex::new(BARE_CONFIRMATION).unwrap(),
});

// ─────────────────────────────────────────────────────────────────────────────
// PatternAnalyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Runs the shared pattern tables over message text.
///
/// Cheap to copy; every instance reads the same immutable tables.
#[derive(Clone, Copy)]
pub struct PatternAnalyzer {
    tables: &'static PatternTables,
}

impl Default for PatternAnalyzer {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PatternAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PatternAnalyzer")
            .field("categories", &self.tables.categories.len())
            .finish()
    }
}

impl PatternAnalyzer {
    /// Create an analyzer, compiling the shared tables on first use.
    #[must_use]
    pub fn new() -> Self {
        Self { tables: &TABLES }
    }

    /// Detect every category in `text`.
    #[must_use]
    pub fn detect(&self, text: &str) -> PatternSignals {
        let mut signals = PatternSignals::default();
        for table in &self.tables.categories {
            signals.set(table.category, table.evaluate(text));
        }
        if text.trim().chars().count() < NEAR_EMPTY_CHARS {
            signals.set(PatternCategory::SystemNoise, PatternMatch::CERTAIN);
        }
        signals
    }

    /// Analyze a tool call by name and parameters.
    #[must_use]
    pub fn analyze_tool_call(&self, tool: &str, parameters: &Map<String, Value>) -> ToolSignals {
        let file_path = PATH_PARAMETER_KEYS
            .iter()
            .find_map(|key| parameters.get(*key).and_then(Value::as_str))
            .map(str::to_owned);
        let code_file = file_path.as_deref().is_some_and(has_code_extension);
        ToolSignals {
            tool: tool.to_owned(),
            code_modification: if is_code_modification_tool(tool) {
                PatternMatch::CERTAIN
            } else {
                PatternMatch::default()
            },
            file_path,
            code_file,
        }
    }

    /// Whether `text` asks something.
    #[must_use]
    pub fn is_question(&self, text: &str) -> bool {
        self.tables.question.is_match(text)
    }

    /// Stack traces, debug output, or test-failure phrasing.
    #[must_use]
    pub fn has_debugging_info(&self, text: &str) -> bool {
        self.tables.debugging.iter().any(|p| p.is_match(text))
    }

    /// Explicit fix or root-cause phrasing.
    #[must_use]
    pub fn has_explicit_fix(&self, text: &str) -> bool {
        self.tables.explicit_fix.is_match(text)
    }

    /// Error or exception keywords.
    #[must_use]
    pub fn has_error_keywords(&self, text: &str) -> bool {
        self.tables.error_keywords.is_match(text)
    }

    /// Test-runner invocation or result.
    #[must_use]
    pub fn is_test_execution(&self, text: &str) -> bool {
        self.tables.test_execution.is_match(text)
    }

    /// A bare confirmation such as "ok" or "done".
    #[must_use]
    pub fn is_bare_confirmation(&self, text: &str) -> bool {
        self.tables.bare_confirmation.is_match(text)
    }

    /// Compute every signal for one message.
    #[must_use]
    pub fn analyze(&self, message: &Message) -> MessageSignals {
        let text = message.text();
        let mut patterns = self.detect(&text);

        let tool = match &message.kind {
            MessageKind::ToolCall {
                tool, parameters, ..
            } => {
                let signals = self.analyze_tool_call(tool, parameters);
                let merged = patterns
                    .get(PatternCategory::CodeChange)
                    .strongest(signals.code_modification);
                patterns.set(PatternCategory::CodeChange, merged);
                Some(signals)
            }
            _ => None,
        };

        let trimmed = text.trim();
        let writes_code = tool.as_ref().is_some_and(|t| t.code_modification.detected);
        let near_empty = trimmed.chars().count() < NEAR_EMPTY_CHARS;
        if near_empty && writes_code {
            patterns.set(PatternCategory::SystemNoise, PatternMatch::default());
        }
        let empty = near_empty && !writes_code;

        MessageSignals {
            patterns,
            question: message.is_user() && self.is_question(trimmed),
            debugging: self.has_debugging_info(&text),
            explicit_fix: self.has_explicit_fix(&text),
            error_keywords: self.has_error_keywords(&text),
            test_execution: self.is_test_execution(&text)
                || tool.as_ref().is_some_and(|t| {
                    t.tool == "Bash"
                        && message
                            .tool_parameters()
                            .and_then(|p| p.get("command"))
                            .and_then(Value::as_str)
                            .is_some_and(|cmd| self.is_test_execution(cmd))
                }),
            empty,
            bare_confirmation: !trimmed.is_empty() && self.is_bare_confirmation(trimmed),
            content_len: message.content_len(),
            tool,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analyzer() -> PatternAnalyzer {
        PatternAnalyzer::new()
    }

    // ── categories ──────────────────────────────────────────────────

    #[test]
    fn tables_compile_for_every_category() {
        let a = analyzer();
        let categories: Vec<_> = a.tables.categories.iter().map(|t| t.category).collect();
        assert_eq!(categories, PatternCategory::ALL);
    }

    #[test]
    fn detects_code_change() {
        let s = analyzer().detect("I updated the function in src/auth.py:\n\ndef login(user):\n    return True");
        let m = s.get(PatternCategory::CodeChange);
        assert!(m.detected);
        assert!(m.confidence >= 0.6, "confidence was {}", m.confidence);
    }

    #[test]
    fn detects_error_solution_with_boost() {
        let s = analyzer().detect("The error was a KeyError; I fixed it by checking the key first.");
        let m = s.get(PatternCategory::ErrorSolution);
        assert!(m.detected);
        // three of five sub-patterns plus the explicit-keyword boost
        assert!((m.confidence - 0.8).abs() < 1e-9, "confidence was {}", m.confidence);
    }

    #[test]
    fn detects_architecture() {
        let s = analyzer().detect(
            "Architecture decision: we should use the repository pattern rather than direct SQL.",
        );
        assert!(s.detected(PatternCategory::Architecture));
        assert!(s.confidence(PatternCategory::Architecture) >= 0.6);
    }

    #[test]
    fn hook_markers_are_boosted() {
        let s = analyzer().detect("Hook: formatter ran");
        let m = s.get(PatternCategory::HookLog);
        assert!(m.detected);
        // one of four sub-patterns plus the 0.3 boost
        assert!((m.confidence - 0.55).abs() < 1e-9, "confidence was {}", m.confidence);
        assert!(analyzer().detect("PreToolUse hook completed").detected(PatternCategory::HookLog));
        assert!(analyzer().detect("[hook:lint] done").detected(PatternCategory::HookLog));
    }

    #[test]
    fn confidence_is_capped() {
        let s = analyzer().detect("[hook] Hook: post-tool-use hook completed");
        assert!((s.confidence(PatternCategory::HookLog) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn detects_system_noise() {
        let a = analyzer();
        assert!(a.detect("Validation passed").detected(PatternCategory::SystemNoise));
        assert!(a.detect("status: ok").detected(PatternCategory::SystemNoise));
        assert!(a.detect("Done.").detected(PatternCategory::SystemNoise));
        assert!(a.detect("").detected(PatternCategory::SystemNoise));
        assert!(!a.detect("Let me look at the parser module first.").detected(PatternCategory::SystemNoise));
    }

    #[test]
    fn plain_prose_detects_nothing() {
        let s = analyzer().detect("Let me take a look at that for you.");
        assert!(s.iter().all(|(_, m)| !m.detected));
    }

    // ── tool calls ──────────────────────────────────────────────────

    #[test]
    fn write_tools_are_certain_code_modifications() {
        let params = json!({"file_path": "src/main.rs"});
        let params = params.as_object().unwrap();
        for tool in ["Write", "Edit", "MultiEdit"] {
            let t = analyzer().analyze_tool_call(tool, params);
            assert_eq!(t.code_modification, PatternMatch::CERTAIN);
            assert!(t.code_file);
        }
        let read = analyzer().analyze_tool_call("Read", params);
        assert!(!read.code_modification.detected);
    }

    #[test]
    fn non_code_paths_are_flagged() {
        let params = json!({"path": "docs/README.md"});
        let t = analyzer().analyze_tool_call("Write", params.as_object().unwrap());
        assert_eq!(t.file_path.as_deref(), Some("docs/README.md"));
        assert!(!t.code_file);
    }

    #[test]
    fn analyze_merges_tool_detection_into_code_change() {
        let msg = Message::new("t", MessageKind::tool("Edit"))
            .with_parameter("file_path", json!("lib/util.ts"));
        let s = analyzer().analyze(&msg);
        assert_eq!(s.patterns.get(PatternCategory::CodeChange), PatternMatch::CERTAIN);
        assert!(!s.empty, "code edits without text are not empty output");
        assert!(!s.patterns.detected(PatternCategory::SystemNoise));
    }

    // ── auxiliary detectors ─────────────────────────────────────────

    #[test]
    fn questions_only_count_for_user_turns() {
        let user = Message::new("u", MessageKind::User).with_content("Why does the build fail?");
        let assistant =
            Message::new("a", MessageKind::Assistant).with_content("Why does the build fail?");
        assert!(analyzer().analyze(&user).question);
        assert!(!analyzer().analyze(&assistant).question);
    }

    #[test]
    fn debugging_context() {
        let a = analyzer();
        let trace = Message::new("t", MessageKind::tool("Bash")).with_result(
            "Traceback (most recent call last):\n  File \"app.py\", line 3, in <module>\nKeyError: 'x'",
        );
        assert!(a.analyze(&trace).is_debugging_context());
        let fix = Message::new("f", MessageKind::Assistant)
            .with_content("The root cause is a missing null check.");
        assert!(a.analyze(&fix).is_debugging_context());
        let hook = Message::new("h", MessageKind::System).with_content("Hook: lint completed");
        assert!(!a.analyze(&hook).is_debugging_context());
    }

    #[test]
    fn test_execution_from_bash_command() {
        let msg = Message::new("b", MessageKind::tool("Bash"))
            .with_parameter("command", json!("cargo test -p core"))
            .with_result("ok");
        assert!(analyzer().analyze(&msg).test_execution);
    }

    #[test]
    fn error_keywords() {
        let a = analyzer();
        assert!(a.has_error_keywords("raised ValueError"));
        assert!(a.has_error_keywords("an exception occurred"));
        assert!(!a.has_error_keywords("everything is fine"));
    }

    #[test]
    fn bare_confirmation_and_empty() {
        let a = analyzer();
        let ok = Message::new("o", MessageKind::Assistant).with_content("OK!");
        let s = a.analyze(&ok);
        assert!(s.bare_confirmation);
        let empty = Message::new("e", MessageKind::Assistant).with_content("  ");
        assert!(a.analyze(&empty).empty);
    }
}
