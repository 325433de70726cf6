//! Conversation record model.
//!
//! One [`Message`] per JSONL line of a session trace. The record type is a
//! tagged [`MessageKind`]; tool calls carry their tool name, parameters, and
//! result inline so every access is a pattern match rather than a key lookup.
//!
//! The original JSON object and line text are retained so the writer can emit
//! unchanged records byte-for-byte and patch only the fields it rewrites.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde_json::{Map, Value, json};

use crate::constants::is_code_modification_tool;

// ─────────────────────────────────────────────────────────────────────────────
// MessageKind
// ─────────────────────────────────────────────────────────────────────────────

/// Record type of a conversation message.
#[derive(Clone, Debug, PartialEq)]
pub enum MessageKind {
    /// A human turn.
    User,
    /// A model turn.
    Assistant,
    /// A tool invocation and its result.
    ToolCall {
        /// Tool name (e.g. `Edit`, `Read`, `Bash`).
        tool: String,
        /// Tool arguments.
        parameters: Map<String, Value>,
        /// Tool output, if recorded.
        result: Option<String>,
    },
    /// A system or automation record.
    System,
}

impl MessageKind {
    /// Wire name of the record type.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::ToolCall { .. } => "tool_call",
            Self::System => "system",
        }
    }

    /// Build a tool-call kind with no parameters or result.
    #[must_use]
    pub fn tool(name: impl Into<String>) -> Self {
        Self::ToolCall {
            tool: name.into(),
            parameters: Map::new(),
            result: None,
        }
    }
}

impl std::fmt::Display for MessageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Message
// ─────────────────────────────────────────────────────────────────────────────

/// A validated conversation record.
#[derive(Clone, Debug)]
pub struct Message {
    /// Unique, non-empty identifier.
    pub uuid: String,
    /// Identifier of the message this one replies to. A reference, not ownership.
    pub parent_uuid: Option<String>,
    /// Record type.
    pub kind: MessageKind,
    /// Free-text body.
    pub content: Option<String>,
    /// ISO-8601 timestamp. Advisory only.
    pub timestamp: Option<String>,
    /// The full JSON object this message was decoded from.
    pub raw: Map<String, Value>,
    /// The input line, without its trailing newline.
    pub line: String,
}

impl Message {
    /// Build a message from scratch (used by tests and synthesized records).
    ///
    /// The `raw` object and `line` are generated from the fields.
    #[must_use]
    pub fn new(uuid: impl Into<String>, kind: MessageKind) -> Self {
        let mut msg = Self {
            uuid: uuid.into(),
            parent_uuid: None,
            kind,
            content: None,
            timestamp: None,
            raw: Map::new(),
            line: String::new(),
        };
        msg.rebuild_raw();
        msg
    }

    /// Set the parent reference.
    #[must_use]
    pub fn with_parent(mut self, parent: impl Into<String>) -> Self {
        self.parent_uuid = Some(parent.into());
        self.rebuild_raw();
        self
    }

    /// Set the text body.
    #[must_use]
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self.rebuild_raw();
        self
    }

    /// Set the timestamp.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: impl Into<String>) -> Self {
        self.timestamp = Some(timestamp.into());
        self.rebuild_raw();
        self
    }

    /// Set the tool result (no-op for non-tool messages).
    #[must_use]
    pub fn with_result(mut self, output: impl Into<String>) -> Self {
        if let MessageKind::ToolCall { result, .. } = &mut self.kind {
            *result = Some(output.into());
        }
        self.rebuild_raw();
        self
    }

    /// Set one tool parameter (no-op for non-tool messages).
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        if let MessageKind::ToolCall { parameters, .. } = &mut self.kind {
            let _ = parameters.insert(key.into(), value);
        }
        self.rebuild_raw();
        self
    }

    /// Tool name, if this is a tool call.
    #[must_use]
    pub fn tool_name(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::ToolCall { tool, .. } => Some(tool),
            _ => None,
        }
    }

    /// Tool parameters, if this is a tool call.
    #[must_use]
    pub fn tool_parameters(&self) -> Option<&Map<String, Value>> {
        match &self.kind {
            MessageKind::ToolCall { parameters, .. } => Some(parameters),
            _ => None,
        }
    }

    /// Tool output, if this is a tool call with a recorded result.
    #[must_use]
    pub fn tool_result(&self) -> Option<&str> {
        match &self.kind {
            MessageKind::ToolCall { result, .. } => result.as_deref(),
            _ => None,
        }
    }

    /// Returns `true` for tool calls that modify source files.
    #[must_use]
    pub fn is_code_modification(&self) -> bool {
        self.tool_name().is_some_and(is_code_modification_tool)
    }

    /// Returns `true` for user turns.
    #[must_use]
    pub fn is_user(&self) -> bool {
        matches!(self.kind, MessageKind::User)
    }

    /// Returns `true` for assistant turns.
    #[must_use]
    pub fn is_assistant(&self) -> bool {
        matches!(self.kind, MessageKind::Assistant)
    }

    /// All analyzable text: the body followed by the tool result, if any.
    #[must_use]
    pub fn text(&self) -> String {
        match (self.content.as_deref(), self.tool_result()) {
            (Some(c), Some(r)) => format!("{c}\n{r}"),
            (Some(c), None) => c.to_owned(),
            (None, Some(r)) => r.to_owned(),
            (None, None) => String::new(),
        }
    }

    /// Character count of the body plus the tool result.
    #[must_use]
    pub fn content_len(&self) -> usize {
        self.content.as_deref().map_or(0, |c| c.chars().count())
            + self.tool_result().map_or(0, |r| r.chars().count())
    }

    /// Parse the timestamp as UTC. Accepts RFC 3339 and naive ISO-8601.
    #[must_use]
    pub fn timestamp_utc(&self) -> Option<DateTime<Utc>> {
        let ts = self.timestamp.as_deref()?;
        if let Ok(dt) = DateTime::parse_from_rfc3339(ts) {
            return Some(dt.with_timezone(&Utc));
        }
        NaiveDateTime::parse_from_str(ts, "%Y-%m-%dT%H:%M:%S%.f")
            .ok()
            .map(|naive| naive.and_utc())
    }

    /// Regenerate `raw` and `line` from the typed fields.
    fn rebuild_raw(&mut self) {
        let mut body = Map::new();
        if let Some(content) = &self.content {
            let _ = body.insert("content".into(), Value::String(content.clone()));
        }
        if let MessageKind::ToolCall {
            tool,
            parameters,
            result,
        } = &self.kind
        {
            let _ = body.insert("tool".into(), Value::String(tool.clone()));
            let _ = body.insert("parameters".into(), Value::Object(parameters.clone()));
            if let Some(result) = result {
                let _ = body.insert("result".into(), Value::String(result.clone()));
            }
        }

        let value = json!({
            "uuid": self.uuid,
            "parentUuid": self.parent_uuid,
            "type": self.kind.as_str(),
            "timestamp": self.timestamp,
            "message": body,
        });
        if let Value::Object(map) = value {
            self.line = Value::Object(map.clone()).to_string();
            self.raw = map;
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
