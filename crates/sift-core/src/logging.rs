//! Logging bootstrap built on `tracing`.
//!
//! Library code only emits events through the `tracing` macros; binaries call
//! one of the `init_*` functions once at startup. `RUST_LOG` takes precedence
//! over the level passed in.

use tracing_subscriber::EnvFilter;

/// Map a verbosity count (`-v`, `-vv`, ...) to a filter directive.
#[must_use]
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Initialize the global tracing subscriber with human-readable stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
///
/// # Arguments
///
/// * `level` - Minimum log level to display (e.g. `"warn"`).
pub fn init_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init fails if a global subscriber is already set
    let _ = subscriber.try_init();
}

/// Initialize the global tracing subscriber with JSON-lines stderr output.
///
/// Intended for machine consumption when the CLI runs under a supervisor.
pub fn init_json_subscriber(level: &str) {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter(level))
        .with_writer(std::io::stderr)
        .json();

    let _ = subscriber.try_init();
}
