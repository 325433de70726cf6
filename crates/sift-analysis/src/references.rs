//! Cross-reference detection.
//!
//! Later messages often point back at earlier ones: a fix names the
//! `KeyError` from a trace, an explanation mentions `src/auth.py` read three
//! turns ago, a reply says "as shown above". The [`ReferenceAnalyzer`]
//! extracts such tokens from every message and resolves them against the
//! messages before it, so the orchestrator can keep the targets regardless
//! of their own score.
//!
//! Resolution uses two sources: an inverted index of tokens each earlier
//! message *defines* (paths, definitions, assignment targets, error names),
//! and a bounded full-text scan over the most recent earlier messages.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use tracing::debug;

use sift_core::Message;
use sift_core::constants::has_code_extension;

/// Shortest identifier that counts as a symbol reference.
const MIN_SYMBOL_LEN: usize = 4;

/// Kind of token a reference was resolved through.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceKind {
    /// A path ending in a code extension.
    FilePath,
    /// A function, class, or type name.
    Symbol,
    /// An assignment target.
    Variable,
    /// An `XError` or `XException` name.
    ErrorToken,
    /// An explicit "line N" mention.
    LineNumber,
    /// "above", "previous", or "earlier".
    Temporal,
}

/// One resolved reference between two messages.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Reference {
    /// Uuid of the message containing the token.
    pub from: String,
    /// Uuid of the message the token points at.
    pub to: String,
    /// Token kind.
    pub kind: ReferenceKind,
    /// The matched token.
    pub token: String,
}

/// Every resolved reference in a message set.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ReferenceMap {
    /// Uuids pointed at by at least one other message.
    pub referenced: BTreeSet<String>,
    /// All resolved references, deduplicated.
    pub edges: Vec<Reference>,
}

impl ReferenceMap {
    /// Whether any other message points at `uuid`.
    #[must_use]
    pub fn is_referenced(&self, uuid: &str) -> bool {
        self.referenced.contains(uuid)
    }

    /// References made by `uuid`.
    pub fn references_from<'a>(&'a self, uuid: &'a str) -> impl Iterator<Item = &'a Reference> {
        self.edges.iter().filter(move |r| r.from == uuid)
    }

    /// Number of referenced messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.referenced.len()
    }

    /// Whether nothing is referenced.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.referenced.is_empty()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Patterns
// ─────────────────────────────────────────────────────────────────────────────

static PATH_CANDIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-z0-9_./-]*[A-Za-z0-9_-]\.[A-Za-z0-9]{1,6}\b").unwrap());
static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:def|fn|function|class|struct|enum|trait|interface|type)\s+([A-Za-z_]\w*)")
        .unwrap()
});
static CALL: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\b([A-Za-z_]\w*)\(").unwrap());
static BACKTICKED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([A-Za-z_][\w.:]*)(?:\(\))?`").unwrap());
static ASSIGNMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)(?:^|[;{(\s])(?:let\s+(?:mut\s+)?|const\s+|var\s+)?([A-Za-z_]\w*)\s*=[^=>]")
        .unwrap()
});
static ERROR_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b([A-Z][A-Za-z]*(?:Error|Exception))\b").unwrap());
static LINE_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bline\s+(\d+)\b").unwrap());
static TEMPORAL_BACK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\b(above|previous(?:ly)?|earlier)\b").unwrap());

/// Words the call and assignment patterns pick up that name nothing.
const STOP_WORDS: &[&str] = &[
    "self", "this", "print", "return", "if", "for", "while", "match", "with", "else", "elif",
    "import", "from", "true", "false", "None", "null", "none", "some", "Some", "Ok", "Err", "len",
    "str", "int", "list", "dict", "range", "type", "println", "format", "console",
];

fn is_stop_word(token: &str) -> bool {
    STOP_WORDS.contains(&token)
}

// ─────────────────────────────────────────────────────────────────────────────
// ReferenceAnalyzer
// ─────────────────────────────────────────────────────────────────────────────

/// Tokens found in one message.
#[derive(Debug, Default)]
struct Extracted {
    /// Tokens the message defines or names; indexed for later lookups.
    defined: Vec<(ReferenceKind, String)>,
    /// Tokens the message mentions; resolved against earlier messages.
    mentioned: Vec<(ReferenceKind, String)>,
    /// The message points back with "above", "previous", or "earlier".
    points_back: bool,
}

/// Finds which earlier messages later messages refer to.
#[derive(Clone, Copy, Debug)]
pub struct ReferenceAnalyzer {
    lookback_window: usize,
}

impl Default for ReferenceAnalyzer {
    fn default() -> Self {
        Self::new(50)
    }
}

impl ReferenceAnalyzer {
    /// Create an analyzer whose full-text scan covers `lookback_window`
    /// earlier messages.
    #[must_use]
    pub const fn new(lookback_window: usize) -> Self {
        Self { lookback_window }
    }

    /// Tokens in `text` that could point at another message, by kind.
    #[must_use]
    pub fn extract(&self, text: &str) -> Vec<(ReferenceKind, String)> {
        let e = extract(text);
        let mut out: Vec<_> = e.defined.into_iter().chain(e.mentioned).collect();
        out.sort();
        out.dedup();
        out
    }

    /// Resolve references across `messages`, in order.
    #[must_use]
    pub fn analyze(&self, messages: &[Message]) -> ReferenceMap {
        let texts: Vec<String> = messages.iter().map(Message::text).collect();
        let position: HashMap<&str, usize> = messages
            .iter()
            .enumerate()
            .map(|(i, m)| (m.uuid.as_str(), i))
            .collect();

        let mut index: HashMap<String, Vec<usize>> = HashMap::new();
        let mut edges: BTreeSet<Reference> = BTreeSet::new();

        for (i, message) in messages.iter().enumerate() {
            let extracted = extract(&texts[i]);
            let mut targets: HashSet<(usize, ReferenceKind, &str)> = HashSet::new();

            for (kind, token) in &extracted.mentioned {
                if let Some(earlier) = index.get(token) {
                    for &j in earlier {
                        let _ = targets.insert((j, *kind, token.as_str()));
                    }
                }
                let start = i.saturating_sub(self.lookback_window);
                for j in start..i {
                    if texts[j].contains(token.as_str()) {
                        let _ = targets.insert((j, *kind, token.as_str()));
                    }
                }
            }

            // Only earlier messages can be referenced; "below" and "next"
            // point at records that do not exist yet.
            if extracted.points_back {
                let target = message
                    .parent_uuid
                    .as_deref()
                    .and_then(|p| position.get(p).copied())
                    .filter(|p| *p < i)
                    .or_else(|| i.checked_sub(1));
                if let Some(j) = target {
                    let _ = targets.insert((j, ReferenceKind::Temporal, ""));
                }
            }

            for (j, kind, token) in targets {
                if messages[j].uuid == message.uuid {
                    continue;
                }
                let token = if kind == ReferenceKind::Temporal {
                    temporal_token(&texts[i])
                } else {
                    token.to_owned()
                };
                let _ = edges.insert(Reference {
                    from: message.uuid.clone(),
                    to: messages[j].uuid.clone(),
                    kind,
                    token,
                });
            }

            for (_, token) in extracted.defined {
                let entry = index.entry(token).or_default();
                if entry.last() != Some(&i) {
                    entry.push(i);
                }
            }
        }

        let referenced: BTreeSet<String> = edges.iter().map(|r| r.to.clone()).collect();
        debug!(
            messages = messages.len(),
            references = edges.len(),
            referenced = referenced.len(),
            "cross-references resolved"
        );
        ReferenceMap {
            referenced,
            edges: edges.into_iter().collect(),
        }
    }
}

fn temporal_token(text: &str) -> String {
    TEMPORAL_BACK
        .find(text)
        .map(|m| m.as_str().to_ascii_lowercase())
        .unwrap_or_default()
}

fn extract(text: &str) -> Extracted {
    let mut e = Extracted::default();

    for m in PATH_CANDIDATE.find_iter(text) {
        let path = m.as_str().trim_start_matches("./");
        if has_code_extension(path) {
            e.defined.push((ReferenceKind::FilePath, path.to_owned()));
            e.mentioned.push((ReferenceKind::FilePath, path.to_owned()));
            // A bare file name also matches an earlier full path.
            if let Some((_, name)) = path.rsplit_once('/') {
                e.defined.push((ReferenceKind::FilePath, name.to_owned()));
            }
        }
    }

    for caps in DEFINITION.captures_iter(text) {
        let name = &caps[1];
        if name.len() >= MIN_SYMBOL_LEN && !is_stop_word(name) {
            e.defined.push((ReferenceKind::Symbol, name.to_owned()));
        }
    }
    for caps in CALL.captures_iter(text).chain(BACKTICKED.captures_iter(text)) {
        let name = &caps[1];
        if name.len() >= MIN_SYMBOL_LEN && !is_stop_word(name) {
            e.mentioned.push((ReferenceKind::Symbol, name.to_owned()));
        }
    }

    for caps in ASSIGNMENT.captures_iter(text) {
        let name = &caps[1];
        if name.len() >= MIN_SYMBOL_LEN && !is_stop_word(name) {
            e.defined.push((ReferenceKind::Variable, name.to_owned()));
        }
    }

    for caps in ERROR_TOKEN.captures_iter(text) {
        let name = caps[1].to_owned();
        e.defined.push((ReferenceKind::ErrorToken, name.clone()));
        e.mentioned.push((ReferenceKind::ErrorToken, name));
    }

    for caps in LINE_NUMBER.captures_iter(text) {
        e.mentioned
            .push((ReferenceKind::LineNumber, format!("line {}", &caps[1])));
    }

    e.points_back = TEMPORAL_BACK.is_match(text);

    e.defined.sort();
    e.defined.dedup();
    e.mentioned.sort();
    e.mentioned.dedup();
    e
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
