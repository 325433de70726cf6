//! Pruning aggressiveness levels.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::errors::SettingsError;

/// Caller-selected aggressiveness.
///
/// Each level maps to an importance threshold. [`PruningLevel::Ultra`] also
/// switches the engine to score-only selection with every context-safety
/// preservation disabled.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PruningLevel {
    /// Threshold 20.
    Light,
    /// Threshold 40.
    #[default]
    Medium,
    /// Threshold 60.
    Aggressive,
    /// Threshold 80, score-only selection.
    Ultra,
}

impl PruningLevel {
    /// All levels, least to most aggressive.
    pub const ALL: [Self; 4] = [Self::Light, Self::Medium, Self::Aggressive, Self::Ultra];

    /// Minimum importance score a message needs to be selected outright.
    #[must_use]
    pub const fn threshold(self) -> u8 {
        match self {
            Self::Light => 20,
            Self::Medium => 40,
            Self::Aggressive => 60,
            Self::Ultra => 80,
        }
    }

    /// Whether this level bypasses ancestor, reference, debugging, and
    /// classification preservation.
    #[must_use]
    pub const fn is_score_only(self) -> bool {
        matches!(self, Self::Ultra)
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Light => "light",
            Self::Medium => "medium",
            Self::Aggressive => "aggressive",
            Self::Ultra => "ultra",
        }
    }
}

impl fmt::Display for PruningLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PruningLevel {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "medium" => Ok(Self::Medium),
            "aggressive" => Ok(Self::Aggressive),
            "ultra" => Ok(Self::Ultra),
            other => Err(SettingsError::InvalidValue(format!(
                "unknown pruning level: {other} (expected light, medium, aggressive, or ultra)"
            ))),
        }
    }
}
