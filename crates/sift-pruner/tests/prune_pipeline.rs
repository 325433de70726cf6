#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use assert_matches::assert_matches;
use serde_json::{Value, json};

use sift_core::{Message, MessageKind, SiftError};
use sift_pruner::{Pruner, process_file, process_file_streaming};
use sift_settings::{PrunerSettings, PruningLevel};

// ── fixtures ────────────────────────────────────────────────────────────────

fn hook(uuid: &str, parent: &str, body: &str) -> Message {
    Message::new(uuid, MessageKind::System)
        .with_parent(parent)
        .with_content(body)
}

/// A debugging session: question, failing test run, fix, and seven
/// automation records hanging off them.
fn debugging_session() -> Vec<Message> {
    let q = Message::new("q", MessageKind::User)
        .with_content("Why does the login test fail after the session refactor?");
    let trace = Message::new("trace", MessageKind::tool("Bash"))
        .with_parent("q")
        .with_parameter("command", json!("pytest tests/test_auth.py"))
        .with_result(
            "Traceback (most recent call last):\n  File \"src/auth.py\", line 14, in login\nKeyError: 'user_id'\n1 failed",
        );
    let fix = Message::new("fix", MessageKind::tool("Edit"))
        .with_parent("trace")
        .with_parameter("file_path", json!("src/auth.py"))
        .with_content("Fixed KeyError: read user_id with session.get()");
    vec![
        q,
        hook("h1", "q", "Hook: pre-tool-use validation passed"),
        hook("h2", "q", "PreToolUse hook completed"),
        trace,
        hook("h3", "trace", "Hook: post-tool-use formatter completed"),
        hook("h4", "trace", "status: ok"),
        fix,
        hook("h5", "fix", "Validation passed"),
        hook("h6", "fix", "Hook: lint check passed"),
        hook("h7", "fix", "[hook:notify] delivered"),
    ]
}

fn write_log(dir: &Path, name: &str, lines: &[String]) -> PathBuf {
    let path = dir.join(name);
    let mut body = lines.join("\n");
    body.push('\n');
    std::fs::write(&path, body).unwrap();
    path
}

fn lines_of(messages: &[Message]) -> Vec<String> {
    messages.iter().map(|m| m.line.clone()).collect()
}

fn output_records(path: &Path) -> Vec<Value> {
    std::fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

fn output_uuids(path: &Path) -> Vec<String> {
    output_records(path)
        .iter()
        .map(|r| r["uuid"].as_str().unwrap().to_string())
        .collect()
}

// ── whole-file pruning ──────────────────────────────────────────────────────

#[test]
fn medium_keeps_the_debugging_thread_and_drops_hooks() {
    let dir = tempfile::tempdir().unwrap();
    let session = debugging_session();
    let input = write_log(dir.path(), "session.jsonl", &lines_of(&session));
    let output = dir.path().join("session.pruned.jsonl");

    let result = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .process_file(&input, &output)
        .unwrap();

    let kept = output_uuids(&output);
    for uuid in ["q", "trace", "fix"] {
        assert!(kept.contains(&uuid.to_string()), "{uuid} missing from {kept:?}");
    }
    let hooks_removed = (1..=7)
        .map(|n| format!("h{n}"))
        .filter(|uuid| !kept.contains(uuid))
        .count();
    assert!(hooks_removed >= 4, "only {hooks_removed} hooks removed, kept {kept:?}");
    assert_eq!(result.messages_processed, 10);
    assert_eq!(
        result.messages_preserved + result.messages_removed,
        result.messages_processed
    );
    assert_eq!(kept.len(), result.messages_preserved);
    assert!(result.compression_ratio > 0.0);
    assert!(result.size_after < result.size_before);

    let integrity = result.integrity.unwrap();
    assert!(integrity.orphans.is_empty(), "orphans: {:?}", integrity.orphans);
}

#[test]
fn kept_records_are_written_verbatim_in_input_order() {
    let dir = tempfile::tempdir().unwrap();
    let session = debugging_session();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&session));
    let output = dir.path().join("out.jsonl");

    let _ = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .process_file(&input, &output)
        .unwrap();

    let written = std::fs::read_to_string(&output).unwrap();
    let mut cursor = session.iter();
    for line in written.lines() {
        let original = cursor.find(|m| m.line == line);
        assert!(original.is_some(), "line not found in input order: {line}");
    }
}

#[test]
fn compression_grows_with_level() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&debugging_session()));

    let ratios: Vec<f64> = PruningLevel::ALL
        .iter()
        .map(|level| {
            let output = dir.path().join(format!("{level}.jsonl"));
            Pruner::with_level(*level)
                .unwrap()
                .process_file(&input, &output)
                .unwrap()
                .compression_ratio
        })
        .collect();
    for pair in ratios.windows(2) {
        assert!(pair[0] <= pair[1], "ratios not monotonic: {ratios:?}");
    }
}

#[test]
fn short_repeated_reads_never_grow_the_output() {
    let dir = tempfile::tempdir().unwrap();
    let reads: Vec<Message> = (0..3)
        .map(|i| {
            Message::new(
                format!("3f2a9c1e-0000-4000-8000-00000000000{i}"),
                MessageKind::tool("Read"),
            )
            .with_timestamp(format!("2025-03-01T10:00:0{i}Z"))
            .with_result(format!("Reading notes file part {i}"))
        })
        .collect();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&reads));

    let ratios: Vec<f64> = PruningLevel::ALL
        .iter()
        .map(|level| {
            let output = dir.path().join(format!("{level}.jsonl"));
            let result = Pruner::with_level(*level)
                .unwrap()
                .process_file(&input, &output)
                .unwrap();
            assert!(
                result.size_after <= result.size_before,
                "{level}: {} > {}",
                result.size_after,
                result.size_before
            );
            result.compression_ratio
        })
        .collect();
    for pair in ratios.windows(2) {
        assert!(pair[0] <= pair[1], "ratios not monotonic: {ratios:?}");
    }
}

#[test]
fn ultra_drops_low_scoring_ancestors() {
    let dir = tempfile::tempdir().unwrap();
    let messages = vec![
        Message::new("root", MessageKind::Assistant).with_content("Let me check."),
        Message::new("edit", MessageKind::tool("Edit"))
            .with_parent("root")
            .with_parameter("file_path", json!("src/main.rs"))
            .with_content("pub fn main() {}"),
    ];
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&messages));

    let medium_out = dir.path().join("medium.jsonl");
    let medium = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .process_file(&input, &medium_out)
        .unwrap();
    assert_eq!(output_uuids(&medium_out), ["root", "edit"]);
    assert!(medium.integrity.unwrap().chains_preserved);

    let ultra_out = dir.path().join("ultra.jsonl");
    let ultra = Pruner::with_level(PruningLevel::Ultra)
        .unwrap()
        .process_file(&input, &ultra_out)
        .unwrap();
    assert_eq!(output_uuids(&ultra_out), ["edit"]);
    let integrity = ultra.integrity.unwrap();
    assert_eq!(integrity.orphans, ["edit"]);
    assert!(!integrity.chains_preserved);
}

#[test]
fn long_tool_output_is_truncated_with_markers() {
    let dir = tempfile::tempdir().unwrap();
    let listing = (0..300)
        .map(|i| format!("entry {i}: value"))
        .collect::<Vec<_>>()
        .join("\n");
    let read = Message::new("r", MessageKind::tool("Read"))
        .with_parameter("file_path", json!("notes.txt"))
        .with_result(listing.clone());
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&[read]));
    let output = dir.path().join("out.jsonl");

    let result = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .process_file(&input, &output)
        .unwrap();

    assert_eq!(result.messages_compressed, 1);
    let records = output_records(&output);
    let body = &records[0]["message"];
    assert_eq!(body["_truncated"], true);
    assert_eq!(body["_original_length"], listing.chars().count());
    assert_eq!(body["tool"], "Read");
    let truncated = body["result"].as_str().unwrap();
    assert!(truncated.len() < listing.len());
    assert!(truncated.starts_with("entry 0: value"));
    assert!(truncated.ends_with("entry 299: value"));
    assert!(truncated.contains("lines truncated"));
}

#[test]
fn malformed_lines_are_counted_and_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let mut lines = lines_of(&debugging_session());
    lines.insert(2, "not json at all".into());
    lines.insert(5, "{\"uuid\": ".into());
    lines.push(String::new());
    let input = write_log(dir.path(), "in.jsonl", &lines);
    let output = dir.path().join("out.jsonl");

    let result = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .process_file(&input, &output)
        .unwrap();
    assert_eq!(result.malformed_entries, 2);
    assert_eq!(result.messages_processed, 10);
}

#[test]
fn empty_input_produces_empty_output() {
    let dir = tempfile::tempdir().unwrap();
    let input = dir.path().join("empty.jsonl");
    std::fs::write(&input, "").unwrap();
    let output = dir.path().join("out.jsonl");

    let result = process_file(&input, &output, &PrunerSettings::default()).unwrap();
    assert_eq!(result.messages_processed, 0);
    assert!(result.compression_ratio.abs() < f64::EPSILON);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "");
}

#[test]
fn integrity_check_can_be_disabled() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&debugging_session()));
    let settings = PrunerSettings {
        validate_integrity: false,
        ..PrunerSettings::default()
    };
    let result = process_file(&input, &dir.path().join("out.jsonl"), &settings).unwrap();
    assert!(result.integrity.is_none());
}

#[test]
fn missing_input_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = process_file(
        &dir.path().join("absent.jsonl"),
        &dir.path().join("out.jsonl"),
        &PrunerSettings::default(),
    )
    .unwrap_err();
    assert_matches!(err, SiftError::FileNotFound { .. });
}

#[test]
fn unknown_weight_fails_before_reading_input() {
    let dir = tempfile::tempdir().unwrap();
    let mut settings = PrunerSettings::default();
    let _ = settings.custom_weights.insert("not_a_rule".into(), 10);
    let err = process_file(
        &dir.path().join("absent.jsonl"),
        &dir.path().join("out.jsonl"),
        &settings,
    )
    .unwrap_err();
    assert_matches!(err, SiftError::InvalidConfig(_));
}

// ── streaming ───────────────────────────────────────────────────────────────

#[test]
fn streaming_processes_every_chunk() {
    let dir = tempfile::tempdir().unwrap();
    let mut messages = Vec::new();
    for turn in 0..5 {
        let q = format!("q{turn}");
        messages.push(
            Message::new(q.clone(), MessageKind::User)
                .with_content(format!("What does step {turn} of the migration do?")),
        );
        messages.push(
            Message::new(format!("a{turn}"), MessageKind::Assistant)
                .with_parent(q.clone())
                .with_content("It renames the column and backfills it."),
        );
        messages.push(hook(&format!("h{turn}"), &q, "Hook: post-tool-use audit completed"));
    }
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&messages));
    let output = dir.path().join("out.jsonl");

    let result = process_file_streaming(&input, &output, 4, &PrunerSettings::default()).unwrap();

    assert_eq!(result.messages_processed, 15);
    assert_eq!(
        result.messages_preserved + result.messages_removed,
        result.messages_processed
    );
    assert!(result.integrity.is_none());
    let kept = output_uuids(&output);
    assert_eq!(kept.len(), result.messages_preserved);
    for turn in 0..5 {
        assert!(kept.contains(&format!("q{turn}")));
        assert!(!kept.contains(&format!("h{turn}")));
    }
}

#[test]
fn streaming_with_one_large_chunk_matches_whole_file() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&debugging_session()));
    let settings = PrunerSettings {
        validate_integrity: false,
        ..PrunerSettings::default()
    };

    let whole_out = dir.path().join("whole.jsonl");
    let stream_out = dir.path().join("stream.jsonl");
    let whole = process_file(&input, &whole_out, &settings).unwrap();
    let streamed = process_file_streaming(&input, &stream_out, 1000, &settings).unwrap();

    assert_eq!(whole.messages_preserved, streamed.messages_preserved);
    assert_eq!(output_uuids(&whole_out), output_uuids(&stream_out));
}

// ── analysis ────────────────────────────────────────────────────────────────

#[test]
fn analyze_reports_structure_without_writing() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_log(dir.path(), "in.jsonl", &lines_of(&debugging_session()));

    let report = Pruner::with_level(PruningLevel::Medium)
        .unwrap()
        .analyze_file(&input)
        .unwrap();

    assert_eq!(report.messages, 10);
    assert_eq!(report.graph.roots, 1);
    assert_eq!(report.graph.orphans, 0);
    assert_eq!(report.by_kind["system"], 7);
    assert!(report.branch_points.iter().any(|b| b.uuid == "q" && b.child_count == 3));
    assert!(report.debugging >= 1);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}
