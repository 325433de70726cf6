//! Pruning orchestrator.
//!
//! One file runs through a fixed sequence of stages:
//!
//! ```text
//! Load → BuildGraph → AnalyzeReferences → SelectImportant
//!      → ApplyDependencyPreservation → Compress → ValidateIntegrity → Write
//! ```
//!
//! Standard levels select every message scoring at or above the level's
//! threshold, plus classifier-High messages, debugging context, and
//! cross-referenced messages; then extend the selection with assistant
//! replies to selected messages and every selected message's ancestors.
//! Unselected messages go through the compression rules engine.
//!
//! [`PruningLevel::Ultra`] selects by score alone and drops everything else.
//!
//! A [`Pruner`] owns its scorer and settings and holds no shared mutable
//! state, so independent files can be pruned concurrently with one pruner
//! each (or one shared by reference).

use std::collections::VecDeque;
use std::path::Path;
use std::time::Instant;

use chrono::{DateTime, Utc};
use tracing::{debug, info, info_span, trace};

use sift_analysis::{
    ConversationGraph, ImportanceScorer, MessageSignals, ReferenceAnalyzer, ReferenceMap,
};
use sift_core::parser::open_input;
use sift_core::{Message, MessageReader, PipelineStage, Result, SiftError, parse_file};
use sift_settings::{PrunerSettings, PruningLevel};

use crate::classifier::{ContentCategory, ContentClassifier};
use crate::compress::{SemanticSummarizer, SmartTruncator};
use crate::integrity::{self, IntegrityReport};
use crate::result::{AnalysisReport, PruningResult, compression_ratio};
use crate::rules::{CompressionAction, CompressionRule, CompressionRulesEngine};
use crate::writer::{OutputWriter, Rewrite, render};

// ─────────────────────────────────────────────────────────────────────────────
// Decisions
// ─────────────────────────────────────────────────────────────────────────────

/// Fate of one input message.
#[derive(Clone, Debug, PartialEq)]
pub enum Decision {
    /// Write the original line.
    Keep,
    /// Write with rewritten fields.
    Rewrite(Rewrite),
    /// Drop.
    Remove,
}

impl Decision {
    /// Whether the message appears in the output.
    #[must_use]
    pub fn is_kept(&self) -> bool {
        !matches!(self, Self::Remove)
    }
}

/// Per-message decisions for one batch, aligned with the input slice.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PrunedLog {
    /// One decision per input message.
    pub decisions: Vec<Decision>,
    /// Importance score per input message.
    pub scores: Vec<u8>,
    /// Messages kept.
    pub preserved: usize,
    /// Messages dropped.
    pub removed: usize,
    /// Kept messages with rewritten content.
    pub compressed: usize,
}

impl PrunedLog {
    fn from_decisions(decisions: Vec<Decision>, scores: Vec<u8>) -> Self {
        let removed = decisions.iter().filter(|d| !d.is_kept()).count();
        let compressed = decisions
            .iter()
            .filter(|d| matches!(d, Decision::Rewrite(_)))
            .count();
        Self {
            preserved: decisions.len() - removed,
            removed,
            compressed,
            decisions,
            scores,
        }
    }

    /// Kept messages, in input order.
    #[must_use]
    pub fn kept_messages(&self, messages: &[Message]) -> Vec<Message> {
        messages
            .iter()
            .zip(&self.decisions)
            .filter(|(_, d)| d.is_kept())
            .map(|(m, _)| m.clone())
            .collect()
    }

    /// Uuids of kept messages, in input order.
    #[must_use]
    pub fn kept_uuids<'a>(&self, messages: &'a [Message]) -> Vec<&'a str> {
        messages
            .iter()
            .zip(&self.decisions)
            .filter(|(_, d)| d.is_kept())
            .map(|(m, _)| m.uuid.as_str())
            .collect()
    }
}

/// Everything computed about a batch before any decision is made.
struct Assessment {
    graph: ConversationGraph,
    signals: Vec<MessageSignals>,
    scores: Vec<u8>,
    categories: Vec<ContentCategory>,
    references: ReferenceMap,
}

#[derive(Default)]
struct Totals {
    processed: usize,
    preserved: usize,
    removed: usize,
    compressed: usize,
}

impl Totals {
    fn add(&mut self, pruned: &PrunedLog) {
        self.processed += pruned.decisions.len();
        self.preserved += pruned.preserved;
        self.removed += pruned.removed;
        self.compressed += pruned.compressed;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Pruner
// ─────────────────────────────────────────────────────────────────────────────

/// The pruning engine.
#[derive(Clone, Debug)]
pub struct Pruner {
    settings: PrunerSettings,
    scorer: ImportanceScorer,
    classifier: ContentClassifier,
    rules: CompressionRulesEngine,
    truncator: SmartTruncator,
    heavy_truncator: SmartTruncator,
    summarizer: SemanticSummarizer,
    references: ReferenceAnalyzer,
}

impl Pruner {
    /// Build an engine, rejecting invalid settings before any I/O.
    pub fn new(settings: PrunerSettings) -> Result<Self> {
        settings
            .validate()
            .map_err(|e| SiftError::InvalidConfig(e.to_string()))?;
        let scorer = ImportanceScorer::from_settings(&settings)
            .map_err(|e| SiftError::InvalidConfig(e.to_string()))?;
        let preserve_lines = settings.truncation.preserve_lines;
        Ok(Self {
            scorer,
            classifier: ContentClassifier::new(),
            rules: CompressionRulesEngine::new(),
            truncator: SmartTruncator::new(preserve_lines),
            heavy_truncator: SmartTruncator::new((preserve_lines / 2).max(1)),
            summarizer: SemanticSummarizer::new(settings.summarizer.repetition_threshold),
            references: ReferenceAnalyzer::new(settings.references.lookback_window),
            settings,
        })
    }

    /// Engine with default settings at `level`.
    pub fn with_level(level: PruningLevel) -> Result<Self> {
        Self::new(PrunerSettings::with_level(level))
    }

    /// Settings in use.
    #[must_use]
    pub fn settings(&self) -> &PrunerSettings {
        &self.settings
    }

    /// Configured level.
    #[must_use]
    pub fn level(&self) -> PruningLevel {
        self.settings.pruning_level
    }

    /// Importance threshold for the configured level.
    #[must_use]
    pub fn threshold(&self) -> u8 {
        self.level().threshold()
    }

    // ── file entry points ───────────────────────────────────────────

    /// Prune `input` into `output`, loading the whole file.
    pub fn process_file(&self, input: &Path, output: &Path) -> Result<PruningResult> {
        let span = info_span!("prune", file = %input.display(), level = %self.level());
        let _guard = span.enter();
        let started = Instant::now();

        debug!(stage = %PipelineStage::Load, "stage");
        let parsed = parse_file(input)?;

        let pruned = self.prune_messages(&parsed.messages);

        let integrity = if self.settings.validate_integrity {
            debug!(stage = %PipelineStage::ValidateIntegrity, "stage");
            Some(integrity::validate(
                &parsed.messages,
                &pruned.kept_messages(&parsed.messages),
            ))
        } else {
            None
        };

        debug!(stage = %PipelineStage::Write, "stage");
        let mut writer = OutputWriter::create(output)?;
        writer.write_pruned(&parsed.messages, &pruned)?;
        let size_after = writer.finish()?;

        let mut totals = Totals::default();
        totals.add(&pruned);
        let result = self.result(
            &totals,
            parsed.malformed,
            parsed.bytes_read,
            size_after,
            started,
            integrity,
        );
        log_result(&result);
        Ok(result)
    }

    /// Prune `input` into `output` in chunks of `chunk_size` messages.
    ///
    /// Each chunk is pruned independently, so parents in earlier chunks are
    /// invisible to later ones and no integrity report is produced.
    pub fn process_file_streaming(
        &self,
        input: &Path,
        output: &Path,
        chunk_size: usize,
    ) -> Result<PruningResult> {
        if chunk_size == 0 {
            return Err(SiftError::InvalidConfig(
                "chunk size must be at least 1".into(),
            ));
        }
        let span = info_span!(
            "prune",
            file = %input.display(),
            level = %self.level(),
            chunk_size
        );
        let _guard = span.enter();
        let started = Instant::now();

        let mut reader = MessageReader::new(open_input(input)?);
        let mut writer = OutputWriter::create(output)?;
        let mut totals = Totals::default();
        let mut chunks = 0usize;

        loop {
            let chunk = reader
                .next_chunk(chunk_size)
                .map_err(|e| SiftError::io(input, e))?;
            if chunk.is_empty() {
                break;
            }
            let pruned = self.prune_messages(&chunk);
            writer.write_pruned(&chunk, &pruned)?;
            totals.add(&pruned);
            chunks += 1;
            debug!(chunk = chunks, messages = chunk.len(), kept = pruned.preserved, "chunk pruned");
        }

        let size_after = writer.finish()?;
        let result = self.result(
            &totals,
            reader.malformed(),
            reader.bytes_read(),
            size_after,
            started,
            None,
        );
        log_result(&result);
        Ok(result)
    }

    /// Score, classify, and summarize `input` without writing output.
    pub fn analyze_file(&self, input: &Path) -> Result<AnalysisReport> {
        let span = info_span!("analyze", file = %input.display());
        let _guard = span.enter();

        let parsed = parse_file(input)?;
        let messages = &parsed.messages;
        let assessment = self.assess(messages, Utc::now());

        let mut report = AnalysisReport {
            messages: messages.len(),
            malformed: parsed.malformed,
            size_bytes: parsed.bytes_read,
            by_kind: Default::default(),
            score_quartiles: Default::default(),
            by_category: Default::default(),
            mean_score: 0.0,
            graph: assessment.graph.stats(),
            branch_points: assessment
                .graph
                .branch_points(|uuid| score_of(&assessment, uuid)),
            referenced: assessment.references.len(),
            debugging: assessment
                .signals
                .iter()
                .filter(|s| s.is_debugging_context())
                .count(),
            above_threshold: assessment
                .scores
                .iter()
                .filter(|s| **s >= self.threshold())
                .count(),
            level: self.level(),
            threshold: self.threshold(),
        };
        for message in messages {
            *report
                .by_kind
                .entry(message.kind.as_str().to_string())
                .or_default() += 1;
        }
        for (score, category) in assessment.scores.iter().zip(&assessment.categories) {
            *report
                .score_quartiles
                .entry(ContentCategory::from_score(*score))
                .or_default() += 1;
            *report.by_category.entry(*category).or_default() += 1;
        }
        if !messages.is_empty() {
            let sum: u64 = assessment.scores.iter().map(|s| u64::from(*s)).sum();
            #[allow(clippy::cast_precision_loss)]
            let mean = sum as f64 / messages.len() as f64;
            report.mean_score = mean;
        }
        Ok(report)
    }

    // ── in-memory pipeline ──────────────────────────────────────────

    /// Decide the fate of every message in `messages`.
    #[must_use]
    pub fn prune_messages(&self, messages: &[Message]) -> PrunedLog {
        self.prune_messages_at(messages, Utc::now())
    }

    /// [`Pruner::prune_messages`] with an explicit clock for recency checks.
    #[must_use]
    pub fn prune_messages_at(&self, messages: &[Message], now: DateTime<Utc>) -> PrunedLog {
        let assessment = self.assess(messages, now);
        let threshold = self.threshold();

        debug!(stage = %PipelineStage::SelectImportant, threshold, "stage");
        let mut selected: Vec<bool> = assessment.scores.iter().map(|s| *s >= threshold).collect();

        if self.level().is_score_only() {
            let decisions = selected
                .iter()
                .map(|keep| if *keep { Decision::Keep } else { Decision::Remove })
                .collect();
            return PrunedLog::from_decisions(decisions, assessment.scores);
        }

        for (i, message) in messages.iter().enumerate() {
            if selected[i] {
                continue;
            }
            let reason = if assessment.categories[i] == ContentCategory::High {
                Some("high_category")
            } else if assessment.signals[i].is_debugging_context() {
                Some("debugging")
            } else if assessment.references.is_referenced(&message.uuid) {
                Some("referenced")
            } else {
                None
            };
            if let Some(reason) = reason {
                trace!(uuid = %message.uuid, reason, "preserved");
                selected[i] = true;
            }
        }

        debug!(stage = %PipelineStage::ApplyDependencyPreservation, "stage");
        preserve_answers(messages, &assessment.graph, &mut selected);
        preserve_ancestors(messages, &assessment.graph, &mut selected);

        debug!(stage = %PipelineStage::Compress, "stage");
        let decisions = self.compress(messages, &assessment, &selected);
        PrunedLog::from_decisions(decisions, assessment.scores)
    }

    fn assess(&self, messages: &[Message], now: DateTime<Utc>) -> Assessment {
        debug!(stage = %PipelineStage::BuildGraph, messages = messages.len(), "stage");
        let graph = ConversationGraph::build(messages);

        debug!(stage = %PipelineStage::AnalyzeReferences, "stage");
        let references = if self.level().is_score_only() {
            ReferenceMap::default()
        } else {
            self.references.analyze(messages)
        };

        let analyzer = self.scorer.analyzer();
        let recent_days = self.settings.dependency.recent_days;
        let signals: Vec<MessageSignals> = messages.iter().map(|m| analyzer.analyze(m)).collect();
        let scores: Vec<u8> = messages
            .iter()
            .zip(&signals)
            .map(|(m, s)| {
                let context = graph.dependency_context(&m.uuid, now, recent_days);
                self.scorer.score_signals(m, s, context.as_ref())
            })
            .collect();
        let categories = messages
            .iter()
            .zip(&signals)
            .zip(&scores)
            .map(|((m, s), score)| self.classifier.classify_signals(m, s, *score))
            .collect();

        Assessment {
            graph,
            signals,
            scores,
            categories,
            references,
        }
    }

    fn compress(
        &self,
        messages: &[Message],
        assessment: &Assessment,
        selected: &[bool],
    ) -> Vec<Decision> {
        let mut decisions = vec![Decision::Keep; messages.len()];
        let mut candidates: Vec<(usize, CompressionRule)> = Vec::new();

        for (i, message) in messages.iter().enumerate() {
            if selected[i] {
                continue;
            }
            let rule = self.rules.compression_rule(
                message,
                &assessment.signals[i],
                assessment.categories[i],
            );
            trace!(
                uuid = %message.uuid,
                score = assessment.scores[i],
                category = %assessment.categories[i],
                action = ?rule.action,
                ratio = rule.ratio,
                "compression rule"
            );
            match rule.action {
                CompressionAction::Preserve => {}
                CompressionAction::Remove => decisions[i] = Decision::Remove,
                CompressionAction::Compress | CompressionAction::CompressHeavily => {
                    candidates.push((i, rule));
                }
            }
        }

        let indices: Vec<usize> = candidates.iter().map(|(i, _)| *i).collect();
        let mut folded = vec![false; messages.len()];
        for group in self.summarizer.group(messages, &indices) {
            let summary = self.summarizer.summarize(messages, &group);
            let Some((&first, rest)) = group.members.split_first() else {
                continue;
            };
            let rewrite = Rewrite {
                content: Some(summary.render()),
                result: None,
                drop_result: messages[first].tool_result().is_some(),
                original_length: messages[first].content_len(),
                summary: Some(summary.marker()),
            };
            // Each member costs its line plus a newline; the summary replaces
            // all of them with one line.
            let members_len: usize = group
                .members
                .iter()
                .map(|&i| messages[i].line.len() + 1)
                .sum();
            if rendered_len(&messages[first], &rewrite).saturating_add(1) >= members_len {
                trace!(
                    pattern = %group.signature,
                    count = group.members.len(),
                    "summary not shorter than members, skipping fold"
                );
                continue;
            }
            debug!(pattern = %group.signature, count = group.members.len(), "folded repeated messages");
            decisions[first] = Decision::Rewrite(rewrite);
            folded[first] = true;
            for &i in rest {
                decisions[i] = Decision::Remove;
                folded[i] = true;
            }
        }

        for (i, rule) in candidates {
            if folded[i] {
                continue;
            }
            if let Some(rewrite) = self.truncate(&messages[i], &rule) {
                decisions[i] = Decision::Rewrite(rewrite);
            }
        }
        decisions
    }

    fn truncate(&self, message: &Message, rule: &CompressionRule) -> Option<Rewrite> {
        let content = message
            .content
            .as_deref()
            .and_then(|c| self.truncate_field(c, rule));
        let result = message
            .tool_result()
            .and_then(|r| self.truncate_field(r, rule));
        if content.is_none() && result.is_none() {
            return None;
        }
        let rewrite = Rewrite {
            content,
            result,
            drop_result: false,
            original_length: message.content_len(),
            summary: None,
        };
        // Markers and escaping can outweigh what truncation saved.
        if rendered_len(message, &rewrite) >= message.line.len() {
            trace!(uuid = %message.uuid, "truncated record not shorter, keeping original");
            return None;
        }
        Some(rewrite)
    }

    fn truncate_field(&self, text: &str, rule: &CompressionRule) -> Option<String> {
        let limits = &self.settings.truncation;
        let len = text.chars().count();
        if len <= limits.min_compressed_length {
            return None;
        }
        #[allow(
            clippy::cast_precision_loss,
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss
        )]
        let keep = (len as f64 * (1.0 - rule.ratio)).ceil() as usize;
        let target = keep
            .max(limits.min_compressed_length)
            .min(limits.max_content_length);
        if target >= len {
            return None;
        }
        let truncator = if rule.action == CompressionAction::CompressHeavily {
            self.heavy_truncator
        } else {
            self.truncator
        };
        Some(truncator.truncate(text, target).into_owned())
    }

    fn result(
        &self,
        totals: &Totals,
        malformed: usize,
        size_before: u64,
        size_after: u64,
        started: Instant,
        integrity: Option<IntegrityReport>,
    ) -> PruningResult {
        PruningResult {
            messages_processed: totals.processed,
            messages_preserved: totals.preserved,
            messages_removed: totals.removed,
            messages_compressed: totals.compressed,
            malformed_entries: malformed,
            processing_time: started.elapsed(),
            compression_ratio: compression_ratio(size_before, size_after),
            size_before,
            size_after,
            level: self.level(),
            threshold: self.threshold(),
            integrity,
        }
    }
}

fn score_of(assessment: &Assessment, uuid: &str) -> u8 {
    assessment
        .graph
        .message_index(uuid)
        .and_then(|i| assessment.scores.get(i).copied())
        .unwrap_or(0)
}

/// Byte length of `message` as written with `rewrite`. A record that fails
/// to serialize counts as unbounded so it is never preferred.
fn rendered_len(message: &Message, rewrite: &Rewrite) -> usize {
    render(message, Some(rewrite)).map_or(usize::MAX, |line| line.len())
}

fn log_result(result: &PruningResult) {
    info!(
        processed = result.messages_processed,
        preserved = result.messages_preserved,
        removed = result.messages_removed,
        compressed = result.messages_compressed,
        malformed = result.malformed_entries,
        ratio = result.compression_ratio,
        elapsed_ms = u64::try_from(result.processing_time.as_millis()).unwrap_or(u64::MAX),
        "pruning complete"
    );
}

// ── dependency preservation ─────────────────────────────────────────────────

/// Keep assistant replies to selected messages so question/answer pairs
/// stay together. Each branch below a selected message is followed through
/// tool and system records until its first assistant message.
fn preserve_answers(messages: &[Message], graph: &ConversationGraph, selected: &mut [bool]) {
    let initially: Vec<usize> = (0..messages.len()).filter(|i| selected[*i]).collect();
    let mut visited = vec![false; messages.len()];
    let mut queue = VecDeque::new();
    for i in initially {
        queue.push_back(i);
        while let Some(at) = queue.pop_front() {
            for child in graph.children(&messages[at].uuid) {
                let Some(c) = graph.message_index(child) else {
                    continue;
                };
                if visited[c] {
                    continue;
                }
                visited[c] = true;
                if messages[c].is_assistant() {
                    if !selected[c] {
                        trace!(uuid = child, "preserved reply");
                        selected[c] = true;
                    }
                } else if !selected[c] {
                    queue.push_back(c);
                }
            }
        }
    }
}

/// Keep every ancestor of every selected message. Each ancestor is walked
/// at most once across all starts.
fn preserve_ancestors(messages: &[Message], graph: &ConversationGraph, selected: &mut [bool]) {
    let mut walked = vec![false; messages.len()];
    for start in 0..messages.len() {
        if !selected[start] || walked[start] {
            continue;
        }
        walked[start] = true;
        let mut cursor = graph.parent(&messages[start].uuid);
        while let Some(uuid) = cursor {
            let Some(i) = graph.message_index(uuid) else {
                break;
            };
            if walked[i] {
                break;
            }
            walked[i] = true;
            if !selected[i] {
                trace!(uuid, "preserved ancestor");
                selected[i] = true;
            }
            cursor = graph.parent(uuid);
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Free-function entry points
// ─────────────────────────────────────────────────────────────────────────────

/// Prune one file with `settings`.
pub fn process_file(
    input: &Path,
    output: &Path,
    settings: &PrunerSettings,
) -> Result<PruningResult> {
    Pruner::new(settings.clone())?.process_file(input, output)
}

/// Prune one file in chunks with `settings`.
pub fn process_file_streaming(
    input: &Path,
    output: &Path,
    chunk_size: usize,
    settings: &PrunerSettings,
) -> Result<PruningResult> {
    Pruner::new(settings.clone())?.process_file_streaming(input, output, chunk_size)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use serde_json::json;
    use sift_core::MessageKind;

    fn pruner(level: PruningLevel) -> Pruner {
        Pruner::with_level(level).unwrap()
    }

    fn decision_of<'a>(messages: &[Message], log: &'a PrunedLog, uuid: &str) -> &'a Decision {
        let i = messages.iter().position(|m| m.uuid == uuid).unwrap();
        &log.decisions[i]
    }

    // ── construction ────────────────────────────────────────────────

    #[test]
    fn invalid_settings_rejected_at_construction() {
        let mut settings = PrunerSettings::default();
        let _ = settings.custom_weights.insert("mystery".into(), 5);
        assert_matches!(Pruner::new(settings), Err(SiftError::InvalidConfig(_)));

        let mut settings = PrunerSettings::default();
        settings.truncation.preserve_lines = 0;
        assert_matches!(Pruner::new(settings), Err(SiftError::InvalidConfig(_)));
    }

    #[test]
    fn streaming_rejects_zero_chunk() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        std::fs::write(&input, "").unwrap();
        let err = pruner(PruningLevel::Medium)
            .process_file_streaming(&input, &dir.path().join("out.jsonl"), 0)
            .unwrap_err();
        assert_matches!(err, SiftError::InvalidConfig(_));
    }

    // ── selection ───────────────────────────────────────────────────

    #[test]
    fn counts_always_balance() {
        let messages = vec![
            Message::new("q", MessageKind::User).with_content("How do I run the linter?"),
            Message::new("a", MessageKind::Assistant)
                .with_parent("q")
                .with_content("Run the lint script."),
            Message::new("h", MessageKind::System)
                .with_parent("a")
                .with_content("Hook: lint finished"),
        ];
        for level in PruningLevel::ALL {
            let log = pruner(level).prune_messages(&messages);
            assert_eq!(log.preserved + log.removed, messages.len(), "{level}");
            assert!(log.compressed <= log.preserved);
        }
    }

    #[test]
    fn answers_to_selected_questions_are_kept() {
        let messages = vec![
            Message::new("q", MessageKind::User).with_content("What port does the dev server use?"),
            Message::new("a", MessageKind::Assistant)
                .with_parent("q")
                .with_content("Port 3000."),
        ];
        let log = pruner(PruningLevel::Aggressive).prune_messages(&messages);
        assert_eq!(*decision_of(&messages, &log, "a"), Decision::Keep);
    }

    #[test]
    fn ancestors_of_selected_messages_are_kept() {
        let messages = vec![
            Message::new("root", MessageKind::Assistant).with_content("Let me check."),
            Message::new("mid", MessageKind::System)
                .with_parent("root")
                .with_content("Hook: pre-tool-use ran"),
            Message::new("edit", MessageKind::tool("Edit"))
                .with_parent("mid")
                .with_parameter("file_path", json!("src/main.rs")),
        ];
        let medium = pruner(PruningLevel::Medium).prune_messages(&messages);
        assert!(medium.decisions.iter().all(Decision::is_kept));

        let ultra = pruner(PruningLevel::Ultra).prune_messages(&messages);
        assert_eq!(*decision_of(&messages, &ultra, "root"), Decision::Remove);
        assert_eq!(*decision_of(&messages, &ultra, "mid"), Decision::Remove);
        assert_eq!(*decision_of(&messages, &ultra, "edit"), Decision::Keep);
    }

    #[test]
    fn cyclic_parents_terminate() {
        let messages = vec![
            Message::new("a", MessageKind::tool("Write"))
                .with_parent("b")
                .with_parameter("file_path", json!("x.py")),
            Message::new("b", MessageKind::Assistant).with_parent("a").with_content("ok"),
        ];
        let log = pruner(PruningLevel::Medium).prune_messages(&messages);
        assert!(log.decisions.iter().all(Decision::is_kept));
    }

    #[test]
    fn replies_behind_tool_records_are_kept() {
        let messages = vec![
            Message::new("q", MessageKind::User).with_content("What port does the dev server use?"),
            Message::new("t", MessageKind::System)
                .with_parent("q")
                .with_content("Hook: pre-tool-use ran"),
            Message::new("a", MessageKind::Assistant)
                .with_parent("t")
                .with_content("Port 3000."),
        ];
        let log = pruner(PruningLevel::Aggressive).prune_messages(&messages);
        assert_eq!(*decision_of(&messages, &log, "a"), Decision::Keep);
    }

    #[test]
    fn hook_after_announced_next_step_is_removed() {
        let messages = vec![
            Message::new("q", MessageKind::User).with_content("Can you format the code?"),
            Message::new("a", MessageKind::Assistant)
                .with_parent("q")
                .with_content("Next I will run the formatter."),
            Message::new("h", MessageKind::System)
                .with_parent("a")
                .with_content("Hook: formatter ran"),
        ];
        let log = pruner(PruningLevel::Medium).prune_messages(&messages);
        assert_eq!(*decision_of(&messages, &log, "h"), Decision::Remove);
    }

    // ── compression ─────────────────────────────────────────────────

    #[test]
    fn long_unselected_output_is_truncated() {
        let output = (0..200)
            .map(|i| format!("match {i}: src/lib/mod_{i}.txt"))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = vec![Message::new("g", MessageKind::tool("Glob")).with_result(output)];
        let p = pruner(PruningLevel::Aggressive);
        let log = p.prune_messages(&messages);
        let Decision::Rewrite(rewrite) = &log.decisions[0] else {
            panic!("expected rewrite, got {:?}", log.decisions[0]);
        };
        let result = rewrite.result.as_deref().unwrap();
        assert!(result.chars().count() <= p.settings().truncation.max_content_length);
        assert!(result.starts_with("match 0:"));
        assert!(result.ends_with("mod_199.txt"));
        assert_eq!(rewrite.original_length, messages[0].content_len());
        assert_eq!(log.compressed, 1);
    }

    #[test]
    fn short_unselected_output_is_untouched() {
        let messages =
            vec![Message::new("g", MessageKind::tool("Glob")).with_result("src/a.txt\nsrc/b.txt")];
        let log = pruner(PruningLevel::Aggressive).prune_messages(&messages);
        assert_eq!(log.decisions[0], Decision::Keep);
    }

    #[test]
    fn repeated_candidates_are_folded() {
        let messages: Vec<Message> = (0..8)
            .map(|i| {
                Message::new(format!("s{i}"), MessageKind::System)
                    .with_content(format!(
                        "status: ok (poll {i}) all workers idle, queue depth 0, last heartbeat \
                         received from every replica in the pool, nothing scheduled for the next window"
                    ))
                    .with_timestamp(format!("2025-03-01T10:00:0{i}Z"))
            })
            .collect();
        let log = pruner(PruningLevel::Medium).prune_messages(&messages);
        let Decision::Rewrite(summary) = &log.decisions[0] else {
            panic!("expected summary, got {:?}", log.decisions[0]);
        };
        assert!(summary.content.as_deref().unwrap().contains("8 similar messages"));
        assert!(summary.summary.is_some());
        assert!(log.decisions[1..].iter().all(|d| *d == Decision::Remove));
        assert_eq!(log.preserved, 1);
        assert_eq!(log.removed, 7);

        let written = render(&messages[0], Some(summary)).unwrap().len();
        let members: usize = messages.iter().map(|m| m.line.len() + 1).sum();
        assert!(written < members);
    }

    #[test]
    fn small_groups_stay_unfolded_when_summary_is_longer() {
        let messages: Vec<Message> = (0..3)
            .map(|i| {
                Message::new(
                    format!("3f2a9c1e-0000-4000-8000-00000000000{i}"),
                    MessageKind::System,
                )
                .with_content(format!("status: ok (poll {i})"))
                .with_timestamp(format!("2025-03-01T10:00:0{i}Z"))
            })
            .collect();
        let log = pruner(PruningLevel::Medium).prune_messages(&messages);
        assert!(log.decisions.iter().all(|d| *d == Decision::Keep), "{:?}", log.decisions);
        assert_eq!(log.removed, 0);
    }

    #[test]
    fn rewrites_never_lengthen_a_record() {
        let output = (0..200)
            .map(|i| format!("match {i}: src/lib/mod_{i}.txt"))
            .collect::<Vec<_>>()
            .join("\n");
        let messages = vec![
            Message::new("g", MessageKind::tool("Glob")).with_result(output),
            Message::new("n", MessageKind::tool("Read"))
                .with_result(format!("{}\n", "\"".repeat(260))),
        ];
        for level in PruningLevel::ALL {
            let log = pruner(level).prune_messages(&messages);
            for (message, decision) in messages.iter().zip(&log.decisions) {
                if let Decision::Rewrite(rewrite) = decision {
                    let written = render(message, Some(rewrite)).unwrap().len();
                    assert!(written < message.line.len(), "{level}: {}", message.uuid);
                }
            }
        }
    }

    #[test]
    fn hook_noise_is_removed() {
        let messages = vec![
            Message::new("q", MessageKind::User).with_content("Can you add a test?"),
            Message::new("h", MessageKind::System)
                .with_parent("q")
                .with_content("Hook: formatter ran"),
        ];
        let log = pruner(PruningLevel::Light).prune_messages(&messages);
        assert_eq!(*decision_of(&messages, &log, "h"), Decision::Remove);
    }

    // ── files ───────────────────────────────────────────────────────

    #[test]
    fn missing_input_is_file_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let p = pruner(PruningLevel::Medium);
        let out = dir.path().join("out.jsonl");
        assert_matches!(
            p.process_file(&dir.path().join("nope.jsonl"), &out),
            Err(SiftError::FileNotFound { .. })
        );
        assert_matches!(
            p.process_file_streaming(&dir.path().join("nope.jsonl"), &out, 10),
            Err(SiftError::FileNotFound { .. })
        );
        assert!(!out.exists());
    }

    #[test]
    fn analyze_file_reports_counts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in.jsonl");
        let lines = [
            Message::new("q", MessageKind::User).with_content("Why is CI red?").line,
            "not json".to_string(),
            Message::new("h", MessageKind::System)
                .with_parent("q")
                .with_content("Hook: ci hook fired")
                .line,
        ];
        std::fs::write(&input, lines.join("\n")).unwrap();
        let report = pruner(PruningLevel::Medium).analyze_file(&input).unwrap();
        assert_eq!(report.messages, 2);
        assert_eq!(report.malformed, 1);
        assert_eq!(report.by_kind["user"], 1);
        assert_eq!(report.by_kind["system"], 1);
        assert_eq!(report.graph.roots, 1);
        assert_eq!(report.by_category.values().sum::<usize>(), 2);
        assert_eq!(report.above_threshold, 1);
    }
}
