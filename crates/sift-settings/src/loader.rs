//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`PrunerSettings::default()`]
//! 2. If a settings file is given and exists, deep-merge its values over defaults
//! 3. Apply `SIFT_*` environment variable overrides (highest priority)
//! 4. Validate the result
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::Path;

use serde_json::Value;
use tracing::debug;

use crate::errors::Result;
use crate::types::{PrunerSettings, PruningLevel};

/// Load settings from an optional file with env var overrides.
pub fn load_settings(path: Option<&Path>) -> Result<PrunerSettings> {
    match path {
        Some(path) => load_settings_from_path(path),
        None => {
            let mut settings = PrunerSettings::default();
            apply_env_overrides(&mut settings);
            settings.validate()?;
            Ok(settings)
        }
    }
}

/// Load settings from a specific path with env var overrides.
///
/// If the file does not exist, returns defaults. If the file contains
/// invalid JSON or invalid values, returns an error.
pub fn load_settings_from_path(path: &Path) -> Result<PrunerSettings> {
    let defaults = serde_json::to_value(PrunerSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: PrunerSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    settings.validate()?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// - `SIFT_PRUNING_LEVEL`: `light` | `medium` | `aggressive` | `ultra`
/// - `SIFT_CHUNK_SIZE`: 1..=1,000,000
/// - `SIFT_MAX_CONTENT_LENGTH`: 64..=10,000,000
/// - `SIFT_VALIDATE_INTEGRITY`: boolean
///
/// Invalid values are ignored with a warning (fall back to file/default).
pub fn apply_env_overrides(settings: &mut PrunerSettings) {
    if let Some(v) = read_env_level("SIFT_PRUNING_LEVEL") {
        settings.pruning_level = v;
    }
    if let Some(v) = read_env_usize("SIFT_CHUNK_SIZE", 1, 1_000_000) {
        settings.streaming.chunk_size = v;
    }
    if let Some(v) = read_env_usize("SIFT_MAX_CONTENT_LENGTH", 64, 10_000_000) {
        settings.truncation.max_content_length = v;
    }
    if let Some(v) = read_env_bool("SIFT_VALIDATE_INTEGRITY") {
        settings.validate_integrity = v;
    }
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a boolean.
///
/// Accepts (case-insensitive): `true`/`1`/`yes`/`on` or `false`/`0`/`no`/`off`.
pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Parse a string as a `usize` within a range.
pub fn parse_usize_range(val: &str, min: usize, max: usize) -> Option<usize> {
    let n: usize = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers (thin wrappers) ─────────────────────────────────────────

fn read_env_level(name: &str) -> Option<PruningLevel> {
    let val = std::env::var(name).ok().filter(|v| !v.is_empty())?;
    match val.parse() {
        Ok(level) => Some(level),
        Err(_) => {
            tracing::warn!(key = name, value = %val, "invalid pruning level env var, ignoring");
            None
        }
    }
}

fn read_env_bool(name: &str) -> Option<bool> {
    let val = std::env::var(name).ok()?;
    let result = parse_bool(&val);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid boolean env var, ignoring");
    }
    result
}

fn read_env_usize(name: &str, min: usize, max: usize) -> Option<usize> {
    let val = std::env::var(name).ok()?;
    let result = parse_usize_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid usize env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SettingsError;
    use assert_matches::assert_matches;

    // ── deep_merge ──────────────────────────────────────────────────

    #[test]
    fn merge_simple_override() {
        let target = serde_json::json!({"a": 1, "b": 2});
        let source = serde_json::json!({"a": 10});
        let merged = deep_merge(target, source);
        assert_eq!(merged["a"], 10);
        assert_eq!(merged["b"], 2);
    }

    #[test]
    fn merge_nested_override() {
        let target = serde_json::json!({"truncation": {"maxContentLength": 2000, "preserveLines": 5}});
        let source = serde_json::json!({"truncation": {"preserveLines": 8}});
        let merged = deep_merge(target, source);
        assert_eq!(merged["truncation"]["preserveLines"], 8);
        assert_eq!(merged["truncation"]["maxContentLength"], 2000);
    }

    #[test]
    fn merge_skips_null() {
        let target = serde_json::json!({"pruningLevel": "medium"});
        let source = serde_json::json!({"pruningLevel": null});
        assert_eq!(deep_merge(target, source)["pruningLevel"], "medium");
    }

    #[test]
    fn merge_replaces_arrays() {
        let target = serde_json::json!({"x": [1, 2, 3]});
        let source = serde_json::json!({"x": [9]});
        assert_eq!(deep_merge(target, source)["x"], serde_json::json!([9]));
    }

    // ── parsing helpers ─────────────────────────────────────────────

    #[test]
    fn parse_bool_variants() {
        assert_eq!(parse_bool("YES"), Some(true));
        assert_eq!(parse_bool("off"), Some(false));
        assert_eq!(parse_bool("maybe"), None);
    }

    #[test]
    fn parse_usize_range_bounds() {
        assert_eq!(parse_usize_range("500", 1, 1000), Some(500));
        assert_eq!(parse_usize_range("0", 1, 1000), None);
        assert_eq!(parse_usize_range("1001", 1, 1000), None);
        assert_eq!(parse_usize_range("abc", 1, 1000), None);
    }

    // ── file loading ────────────────────────────────────────────────

    #[test]
    fn missing_file_yields_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let settings = load_settings_from_path(&dir.path().join("absent.json")).unwrap();
        assert_eq!(settings.streaming.chunk_size, PrunerSettings::default().streaming.chunk_size);
    }

    #[test]
    fn file_values_merge_over_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.json");
        std::fs::write(
            &path,
            r#"{"pruningLevel":"aggressive","customWeights":{"hook_log":-45},"truncation":{"preserveLines":3}}"#,
        )
        .unwrap();
        let settings = load_settings_from_path(&path).unwrap();
        assert_eq!(settings.custom_weights.get("hook_log"), Some(&-45));
        assert_eq!(settings.truncation.preserve_lines, 3);
        assert_eq!(settings.truncation.max_content_length, 2000);
    }

    #[test]
    fn invalid_json_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.json");
        std::fs::write(&path, "{not json").unwrap();
        assert_matches!(load_settings_from_path(&path), Err(SettingsError::Json(_)));
    }

    #[test]
    fn invalid_values_fail_validation() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sift.json");
        std::fs::write(&path, r#"{"customWeights":{"not_a_weight":1}}"#).unwrap();
        assert_matches!(
            load_settings_from_path(&path),
            Err(SettingsError::InvalidValue(_))
        );
    }
}
