//! # sift-settings
//!
//! Configuration for the sift pruning engine.
//!
//! Settings are resolved from three layers (in priority order):
//! 1. **Compiled defaults**: [`PrunerSettings::default()`]
//! 2. **Settings file**: a JSON file passed by the caller (deep-merged over defaults)
//! 3. **Environment variables**: `SIFT_*` overrides (highest priority)
//!
//! The engine reads settings but never writes or versions them.
//!
//! # Usage
//!
//! ```no_run
//! use sift_settings::{load_settings, PruningLevel};
//!
//! let settings = load_settings(None).unwrap();
//! assert_eq!(settings.pruning_level, PruningLevel::Medium);
//! ```

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path};
pub use types::*;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
