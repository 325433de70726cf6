//! Fixed thresholds for classification and compression.

// =============================================================================
// Truncation
// =============================================================================

/// Marker inserted where character-based truncation removed text.
pub const TRUNCATION_MARKER: &str = "...[TRUNCATED]...";

// =============================================================================
// Classification
// =============================================================================

/// Assistant bodies at least this long count as substantial explanations.
pub const SUBSTANTIAL_EXPLANATION_CHARS: usize = 200;

/// Tool calls shorter than this count as routine.
pub const ROUTINE_TOOL_CHARS: usize = 100;

/// Pattern confidence at which a category drives classification.
pub const CATEGORY_CONFIDENCE: f64 = 0.4;

// =============================================================================
// Compression rules
// =============================================================================

/// Content longer than this gets a higher compression ratio.
pub const LARGE_CONTENT_CHARS: usize = 5000;

/// Content shorter than this gets a lower compression ratio.
pub const SMALL_CONTENT_CHARS: usize = 200;

/// Ratio change applied by the size adjustment.
pub const SIZE_RATIO_ADJUSTMENT: f64 = 0.2;

/// Upper bound for any compression ratio.
pub const MAX_COMPRESSION_RATIO: f64 = 0.9;

// =============================================================================
// Summaries
// =============================================================================

/// Characters of the sample message kept in a summary.
pub const SUMMARY_SAMPLE_CHARS: usize = 200;

/// Words used for a content signature when no hook or tool marker is found.
pub const SIGNATURE_WORDS: usize = 3;
