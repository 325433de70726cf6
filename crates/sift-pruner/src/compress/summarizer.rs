//! Folding of repetitive messages into one summary record.
//!
//! Messages are grouped by a normalized signature: the hook name when the
//! text mentions a hook, else the tool name after a `Tool:` marker, else the
//! first few normalized words. A group that reaches the repetition threshold
//! collapses into its first member, whose body becomes a summary carrying
//! the pattern, count, timestamp range, and one sample.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::{Value, json};

use sift_core::Message;

use super::truncator::SmartTruncator;
use crate::constants::{SIGNATURE_WORDS, SUMMARY_SAMPLE_CHARS};

static HOOK_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bhook\b[\s:\[\]-]*([A-Za-z0-9_-]+)?").unwrap());
static TOOL_MARKER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Tool:\s*([A-Za-z0-9_-]+)").unwrap());

/// A group of messages sharing a signature, at or above the threshold.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SummaryGroup {
    /// Shared signature.
    pub signature: String,
    /// Positions of the members in the input, in input order.
    pub members: Vec<usize>,
}

/// One summary record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    /// Shared signature.
    pub pattern: String,
    /// Number of folded messages.
    pub count: usize,
    /// Earliest member timestamp.
    pub first_timestamp: Option<String>,
    /// Latest member timestamp.
    pub last_timestamp: Option<String>,
    /// Truncated text of the first member.
    pub sample: String,
    /// Uuids of every folded message.
    pub uuids: Vec<String>,
}

impl Summary {
    /// Body text that replaces the surviving member's content.
    #[must_use]
    pub fn render(&self) -> String {
        let range = match (&self.first_timestamp, &self.last_timestamp) {
            (Some(first), Some(last)) => format!("from {first} to {last}"),
            _ => "no timestamps".to_string(),
        };
        format!(
            "[Summary of {} similar messages] pattern: {}; {range}; sample: {}",
            self.count, self.pattern, self.sample
        )
    }

    /// The `_summary` marker attached to the surviving record.
    #[must_use]
    pub fn marker(&self) -> Value {
        json!({
            "pattern": self.pattern,
            "count": self.count,
            "firstTimestamp": self.first_timestamp,
            "lastTimestamp": self.last_timestamp,
            "uuids": self.uuids,
        })
    }
}

/// Groups and folds repeated messages.
#[derive(Clone, Copy, Debug)]
pub struct SemanticSummarizer {
    threshold: usize,
    sampler: SmartTruncator,
}

impl Default for SemanticSummarizer {
    fn default() -> Self {
        Self::new(3)
    }
}

impl SemanticSummarizer {
    /// Create a summarizer folding groups of at least `threshold` messages.
    #[must_use]
    pub const fn new(threshold: usize) -> Self {
        Self {
            threshold,
            sampler: SmartTruncator::new(1),
        }
    }

    /// Normalized signature of `text`, `None` when it has no words.
    #[must_use]
    pub fn signature(&self, text: &str) -> Option<String> {
        if let Some(caps) = HOOK_NAME.captures(text) {
            let name = caps
                .get(1)
                .map_or_else(String::new, |m| m.as_str().to_ascii_lowercase());
            return Some(format!("hook:{name}"));
        }
        if let Some(caps) = TOOL_MARKER.captures(text) {
            return Some(format!("tool:{}", &caps[1]));
        }
        let words: Vec<String> = text
            .split(|c: char| !c.is_alphanumeric())
            .filter(|w| !w.is_empty())
            .take(SIGNATURE_WORDS)
            .map(|w| {
                if w.chars().all(|c| c.is_ascii_digit()) {
                    "#".to_string()
                } else {
                    w.to_lowercase()
                }
            })
            .collect();
        (!words.is_empty()).then(|| format!("text:{}", words.join(" ")))
    }

    /// Groups among `candidates` (positions into `messages`) that reach the
    /// threshold, ordered by their first member.
    #[must_use]
    pub fn group(&self, messages: &[Message], candidates: &[usize]) -> Vec<SummaryGroup> {
        let mut order: Vec<String> = Vec::new();
        let mut groups: HashMap<String, Vec<usize>> = HashMap::new();
        for &i in candidates {
            let Some(signature) = self.signature(&messages[i].text()) else {
                continue;
            };
            let members = groups.entry(signature.clone()).or_default();
            if members.is_empty() {
                order.push(signature);
            }
            members.push(i);
        }

        order
            .into_iter()
            .filter_map(|signature| {
                let members = groups.remove(&signature)?;
                (members.len() >= self.threshold).then_some(SummaryGroup { signature, members })
            })
            .collect()
    }

    /// Summarize one group.
    #[must_use]
    pub fn summarize(&self, messages: &[Message], group: &SummaryGroup) -> Summary {
        let members: Vec<&Message> = group.members.iter().map(|i| &messages[*i]).collect();

        let mut stamped: Vec<(&str, Option<chrono::DateTime<chrono::Utc>>)> = members
            .iter()
            .filter_map(|m| m.timestamp.as_deref().map(|ts| (ts, m.timestamp_utc())))
            .collect();
        // Unparseable timestamps sort first, by their raw text.
        stamped.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let sample = members
            .first()
            .map(|m| {
                self.sampler
                    .truncate(&m.text(), SUMMARY_SAMPLE_CHARS)
                    .into_owned()
            })
            .unwrap_or_default();

        Summary {
            pattern: group.signature.clone(),
            count: members.len(),
            first_timestamp: stamped.first().map(|s| s.0.to_owned()),
            last_timestamp: stamped.last().map(|s| s.0.to_owned()),
            sample,
            uuids: members.iter().map(|m| m.uuid.clone()).collect(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
