//! Importance scoring weights.
//!
//! Every weight is addressable by its snake_case name so callers can override
//! individual entries through `customWeights` without restating the table.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

macro_rules! scoring_weights {
    ($( $(#[$doc:meta])* $field:ident = $default:expr ),+ $(,)?) => {
        /// Signed score contributions, keyed by rule name.
        ///
        /// Positive weights reward decision-bearing content; negative weights
        /// penalize automation noise.
        #[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
        #[serde(default)]
        pub struct ScoringWeights {
            $( $(#[$doc])* pub $field: i32, )+
        }

        impl Default for ScoringWeights {
            fn default() -> Self {
                Self { $( $field: $default, )+ }
            }
        }

        impl ScoringWeights {
            /// Every recognized weight name.
            pub const NAMES: &'static [&'static str] = &[$( stringify!($field) ),+];

            /// Look up a weight by name.
            #[must_use]
            pub fn get(&self, name: &str) -> Option<i32> {
                match name {
                    $( stringify!($field) => Some(self.$field), )+
                    _ => None,
                }
            }

            /// Set a weight by name. Returns `false` for unknown names.
            pub fn set(&mut self, name: &str, value: i32) -> bool {
                match name {
                    $( stringify!($field) => { self.$field = value; true } )+
                    _ => false,
                }
            }
        }
    };
}

scoring_weights! {
    // ── Content patterns ────────────────────────────────────────────
    /// File edits, definitions, imports, language fingerprints.
    code_changes = 30,
    /// Errors together with fixes or debugging.
    error_solution = 25,
    /// Design-pattern names, architecture decisions, technology comparisons.
    architecture_decision = 25,
    /// A user turn that asks something.
    user_question = 20,
    /// A tool call that writes a source file.
    file_modification = 20,
    /// Stack traces, debug output, test failures.
    debugging_info = 15,

    // ── Penalties ───────────────────────────────────────────────────
    /// Hook and automation log lines.
    hook_log = -30,
    /// Validation, status, and confirmation chatter.
    system_validation = -20,
    /// Empty or near-empty bodies.
    empty_output = -25,

    // ── Message type ────────────────────────────────────────────────
    /// Base for user turns.
    user_message = 15,
    /// Base for assistant turns.
    assistant_message = 10,
    /// Base for tool calls.
    tool_message = 5,
    /// Base for system records.
    system_message = 0,

    // ── Tool identity ───────────────────────────────────────────────
    /// `Write`, `Edit`, `MultiEdit`.
    tool_write = 40,
    /// `Read`, `Grep`, `Glob`, `Bash`, `LS`.
    tool_read = 15,
    /// `TodoWrite` and any other tool.
    tool_default = 5,
}

impl ScoringWeights {
    /// Return a copy with `overrides` applied.
    ///
    /// Unknown names are rejected so a typo in a config file fails loudly.
    pub fn with_overrides(&self, overrides: &BTreeMap<String, i32>) -> Result<Self> {
        let mut weights = self.clone();
        for (name, value) in overrides {
            if !weights.set(name, *value) {
                return Err(SettingsError::InvalidValue(format!(
                    "unknown scoring weight: {name}"
                )));
            }
        }
        Ok(weights)
    }
}
