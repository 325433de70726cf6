//! JSONL record parser.
//!
//! Turns newline-delimited JSON into validated [`Message`]s. A line that is
//! not valid JSON, is missing `uuid`/`type`/`message`, names an unknown record
//! type, or has a non-object `message` is skipped and counted. Empty lines are
//! skipped silently. Only a missing or unreadable file is fatal.
//!
//! [`MessageReader`] reads incrementally so the streaming pipeline can pull
//! fixed-size chunks without loading the whole file.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use serde_json::Value;
use tracing::{debug, trace};

use crate::errors::{ParseError, Result, SiftError};
use crate::message::{Message, MessageKind};

// ─────────────────────────────────────────────────────────────────────────────
// Single line
// ─────────────────────────────────────────────────────────────────────────────

/// Parse one JSONL line into a [`Message`].
pub fn parse_line(line: &str) -> std::result::Result<Message, ParseError> {
    let value: Value = serde_json::from_str(line)?;
    let Value::Object(raw) = value else {
        return Err(ParseError::NotAnObject);
    };

    let uuid = match raw.get("uuid") {
        Some(Value::String(s)) if s.is_empty() => return Err(ParseError::EmptyUuid),
        Some(Value::String(s)) => s.clone(),
        Some(_) => {
            return Err(ParseError::InvalidField {
                field: "uuid",
                reason: "expected a string",
            });
        }
        None => return Err(ParseError::MissingField { field: "uuid" }),
    };

    let kind_name = match raw.get("type") {
        Some(Value::String(s)) => s.as_str(),
        Some(_) => {
            return Err(ParseError::InvalidField {
                field: "type",
                reason: "expected a string",
            });
        }
        None => return Err(ParseError::MissingField { field: "type" }),
    };

    let body = match raw.get("message") {
        Some(Value::Object(m)) => m,
        Some(_) => {
            return Err(ParseError::InvalidField {
                field: "message",
                reason: "expected an object",
            });
        }
        None => return Err(ParseError::MissingField { field: "message" }),
    };

    let parent_uuid = match raw.get("parentUuid") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            return Err(ParseError::InvalidField {
                field: "parentUuid",
                reason: "expected a string or null",
            });
        }
    };

    let kind = match kind_name {
        "user" => MessageKind::User,
        "assistant" => MessageKind::Assistant,
        "system" => MessageKind::System,
        "tool_call" => MessageKind::ToolCall {
            tool: body
                .get("tool")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_owned(),
            parameters: body
                .get("parameters")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
            result: body.get("result").and_then(value_to_text),
        },
        other => {
            return Err(ParseError::UnknownType {
                kind: other.to_owned(),
            });
        }
    };

    let content = body.get("content").and_then(value_to_text);
    let timestamp = raw
        .get("timestamp")
        .and_then(Value::as_str)
        .map(str::to_owned);

    Ok(Message {
        uuid,
        parent_uuid,
        kind,
        content,
        timestamp,
        raw,
        line: line.to_owned(),
    })
}

/// Flatten a content-like value to text.
///
/// Strings pass through. Arrays of content blocks contribute their `text`
/// (or string `content`) fields joined by newlines. Other non-null values are
/// rendered as compact JSON.
fn value_to_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Array(blocks) => {
            let parts: Vec<&str> = blocks
                .iter()
                .filter_map(|block| match block {
                    Value::String(s) => Some(s.as_str()),
                    Value::Object(obj) => obj
                        .get("text")
                        .or_else(|| obj.get("content"))
                        .and_then(Value::as_str),
                    _ => None,
                })
                .collect();
            Some(parts.join("\n"))
        }
        other => Some(other.to_string()),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Streams
// ─────────────────────────────────────────────────────────────────────────────

/// Messages parsed from a whole input, plus bookkeeping.
#[derive(Clone, Debug, Default)]
pub struct ParsedLog {
    /// Valid messages in input order.
    pub messages: Vec<Message>,
    /// Number of non-empty lines that were rejected.
    pub malformed: usize,
    /// Total bytes consumed from the input.
    pub bytes_read: u64,
}

/// Incremental JSONL reader.
///
/// Tracks malformed-line and byte counts across calls so chunked readers can
/// report file-level totals.
pub struct MessageReader<R> {
    reader: R,
    buf: Vec<u8>,
    line_no: usize,
    malformed: usize,
    bytes_read: u64,
    exhausted: bool,
}

impl<R: BufRead> MessageReader<R> {
    /// Wrap a buffered reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buf: Vec::with_capacity(4096),
            line_no: 0,
            malformed: 0,
            bytes_read: 0,
            exhausted: false,
        }
    }

    /// Read the next valid message, skipping malformed and empty lines.
    ///
    /// Returns `Ok(None)` at end of input.
    pub fn next_message(&mut self) -> std::io::Result<Option<Message>> {
        while !self.exhausted {
            self.buf.clear();
            let n = self.reader.read_until(b'\n', &mut self.buf)?;
            if n == 0 {
                self.exhausted = true;
                break;
            }
            self.bytes_read += n as u64;
            self.line_no += 1;

            let outcome = match std::str::from_utf8(&self.buf) {
                Ok(text) => {
                    let line = text.trim_end_matches(['\n', '\r']);
                    if line.trim().is_empty() {
                        continue;
                    }
                    parse_line(line)
                }
                Err(_) => Err(ParseError::InvalidUtf8),
            };
            match outcome {
                Ok(msg) => return Ok(Some(msg)),
                Err(err) => self.reject(&err),
            }
        }
        Ok(None)
    }

    /// Read up to `size` valid messages. An empty vector means end of input.
    pub fn next_chunk(&mut self, size: usize) -> std::io::Result<Vec<Message>> {
        let mut chunk = Vec::with_capacity(size.min(4096));
        while chunk.len() < size {
            match self.next_message()? {
                Some(msg) => chunk.push(msg),
                None => break,
            }
        }
        Ok(chunk)
    }

    /// Read every remaining message.
    pub fn read_all(mut self) -> std::io::Result<ParsedLog> {
        let mut messages = Vec::new();
        while let Some(msg) = self.next_message()? {
            messages.push(msg);
        }
        Ok(ParsedLog {
            messages,
            malformed: self.malformed,
            bytes_read: self.bytes_read,
        })
    }

    /// Malformed lines seen so far.
    #[must_use]
    pub fn malformed(&self) -> usize {
        self.malformed
    }

    /// Bytes consumed so far.
    #[must_use]
    pub fn bytes_read(&self) -> u64 {
        self.bytes_read
    }

    fn reject(&mut self, err: &ParseError) {
        self.malformed += 1;
        trace!(line = self.line_no, error = %err, "skipping malformed line");
    }
}

/// Parse every line of a buffered reader.
pub fn parse_reader<R: BufRead>(reader: R) -> std::io::Result<ParsedLog> {
    MessageReader::new(reader).read_all()
}

/// Open `path` for buffered reading, reporting a missing file distinctly.
pub fn open_input(path: &Path) -> Result<BufReader<File>> {
    let file = File::open(path).map_err(|e| SiftError::io(path, e))?;
    Ok(BufReader::new(file))
}

/// Parse a whole JSONL file.
pub fn parse_file(path: &Path) -> Result<ParsedLog> {
    let reader = open_input(path)?;
    let parsed = parse_reader(reader).map_err(|e| SiftError::io(path, e))?;
    debug!(
        path = %path.display(),
        messages = parsed.messages.len(),
        malformed = parsed.malformed,
        bytes = parsed.bytes_read,
        "parsed session log"
    );
    Ok(parsed)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
