//! Package-level constants shared across the sift crates.

/// Current version of sift (sourced from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Package name.
pub const NAME: &str = "sift";

// =============================================================================
// Tool identity
// =============================================================================

/// Tools whose calls modify source files.
pub const CODE_MODIFICATION_TOOLS: &[&str] = &["Write", "Edit", "MultiEdit"];

/// Tools that inspect the workspace without changing it.
pub const INSPECTION_TOOLS: &[&str] = &["Read", "Grep", "Glob", "Bash", "LS"];

/// Task-list bookkeeping tool; carries little decision context.
pub const TODO_TOOL: &str = "TodoWrite";

/// Returns `true` if `tool` modifies source files.
#[must_use]
pub fn is_code_modification_tool(tool: &str) -> bool {
    CODE_MODIFICATION_TOOLS.contains(&tool)
}

/// Returns `true` if `tool` only inspects the workspace.
#[must_use]
pub fn is_inspection_tool(tool: &str) -> bool {
    INSPECTION_TOOLS.contains(&tool)
}

// =============================================================================
// File types
// =============================================================================

/// File extensions treated as source code (lowercase, without the dot).
pub const CODE_EXTENSIONS: &[&str] = &[
    "py", "rs", "js", "ts", "tsx", "jsx", "go", "java", "kt", "swift", "c", "h", "cpp", "hpp",
    "cc", "cs", "rb", "php", "scala", "sh", "sql", "vue", "svelte",
];

/// Returns `true` if `path` ends in a known source-code extension.
#[must_use]
pub fn has_code_extension(path: &str) -> bool {
    path.rsplit_once('.').is_some_and(|(stem, ext)| {
        !stem.is_empty() && CODE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str())
    })
}
