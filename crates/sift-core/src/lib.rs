//! # sift-core
//!
//! Foundation types, parsing, errors, and logging for the sift pruner.
//!
//! This crate provides the shared vocabulary that all other sift crates depend on:
//!
//! - **Messages**: [`Message`] with a tagged [`MessageKind`] (`User`, `Assistant`,
//!   `ToolCall`, `System`) decoded from one JSONL record
//! - **Parser**: [`parser`] turns newline-delimited JSON into validated messages,
//!   skipping and counting malformed lines
//! - **Errors**: [`SiftError`] pipeline-boundary errors and per-line [`ParseError`]s
//! - **Logging**: `tracing` subscriber bootstrap

#![deny(unsafe_code)]

pub mod constants;
pub mod errors;
pub mod logging;
pub mod message;
pub mod parser;

pub use errors::{ParseError, PipelineStage, Result, SiftError};
pub use message::{Message, MessageKind};
pub use parser::{MessageReader, ParsedLog, parse_file, parse_line, parse_reader};
