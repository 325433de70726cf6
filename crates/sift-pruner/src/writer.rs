//! JSONL output.
//!
//! Unchanged records are written back as their original line. Rewritten
//! records are re-serialized from the original JSON object with only the
//! rewritten fields and compression markers patched in, so unknown keys
//! survive pruning.
//!
//! Output goes to a temporary file next to the destination and is renamed
//! into place by [`OutputWriter::finish`]; a failed run leaves no partial
//! output behind.

use std::borrow::Cow;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tempfile::NamedTempFile;
use tracing::debug;

use sift_core::{Message, PipelineStage, Result, SiftError};

use crate::pipeline::{Decision, PrunedLog};

/// Replacement fields for one kept record.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Rewrite {
    /// New `message.content`.
    pub content: Option<String>,
    /// New `message.result`.
    pub result: Option<String>,
    /// Remove `message.result` entirely.
    pub drop_result: bool,
    /// Character count of content plus result before rewriting.
    pub original_length: usize,
    /// `_summary` marker for folded records.
    pub summary: Option<Value>,
}

/// Serialize `message`, applying `rewrite` when present.
pub fn render<'a>(
    message: &'a Message,
    rewrite: Option<&Rewrite>,
) -> serde_json::Result<Cow<'a, str>> {
    let Some(rewrite) = rewrite else {
        return Ok(Cow::Borrowed(&message.line));
    };

    let mut raw = message.raw.clone();
    let body = raw
        .entry("message")
        .or_insert_with(|| Value::Object(Map::new()));
    if let Value::Object(body) = body {
        if let Some(content) = &rewrite.content {
            let _ = body.insert("content".into(), Value::String(content.clone()));
        }
        if rewrite.drop_result {
            let _ = body.remove("result");
        } else if let Some(result) = &rewrite.result {
            let _ = body.insert("result".into(), Value::String(result.clone()));
        }
        let _ = body.insert("_truncated".into(), Value::Bool(true));
        let _ = body.insert("_original_length".into(), Value::from(rewrite.original_length));
        if let Some(summary) = &rewrite.summary {
            let _ = body.insert("_summary".into(), summary.clone());
        }
    }
    serde_json::to_string(&Value::Object(raw)).map(Cow::Owned)
}

/// Atomic JSONL writer.
pub struct OutputWriter {
    path: PathBuf,
    out: BufWriter<NamedTempFile>,
    bytes_written: u64,
    lines: usize,
}

impl OutputWriter {
    /// Open a temporary file in the destination's directory.
    pub fn create(path: &Path) -> Result<Self> {
        let dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let tmp = NamedTempFile::new_in(dir).map_err(|e| SiftError::io(dir, e))?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(tmp),
            bytes_written: 0,
            lines: 0,
        })
    }

    /// Write one record.
    pub fn write_message(&mut self, message: &Message, rewrite: Option<&Rewrite>) -> Result<()> {
        let line = render(message, rewrite).map_err(|e| {
            SiftError::stage(PipelineStage::Write, Some(&message.uuid), e.to_string())
        })?;
        self.write_line(&line)
    }

    /// Write every kept record of a pruned batch, in input order.
    pub fn write_pruned(&mut self, messages: &[Message], pruned: &PrunedLog) -> Result<()> {
        for (message, decision) in messages.iter().zip(&pruned.decisions) {
            match decision {
                Decision::Keep => self.write_message(message, None)?,
                Decision::Rewrite(rewrite) => self.write_message(message, Some(rewrite))?,
                Decision::Remove => {}
            }
        }
        Ok(())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        self.out
            .write_all(line.as_bytes())
            .and_then(|()| self.out.write_all(b"\n"))
            .map_err(|e| SiftError::io(&self.path, e))?;
        self.bytes_written += line.len() as u64 + 1;
        self.lines += 1;
        Ok(())
    }

    /// Flush and move the output into place. Returns bytes written.
    pub fn finish(self) -> Result<u64> {
        let Self {
            path,
            out,
            bytes_written,
            lines,
        } = self;
        let tmp = out
            .into_inner()
            .map_err(|e| SiftError::io(&path, e.into_error()))?;
        let _ = tmp
            .persist(&path)
            .map_err(|e| SiftError::io(&path, e.error))?;
        debug!(path = %path.display(), lines, bytes = bytes_written, "output written");
        Ok(bytes_written)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
