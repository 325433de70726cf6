//! # sift
//!
//! Prune or analyze JSONL session logs from the command line.
//!
//! A directory argument prunes every `*.jsonl` file under it, one blocking
//! task per file.

#![deny(unsafe_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::task::JoinSet;
use walkdir::WalkDir;

use sift_core::logging::{init_json_subscriber, init_subscriber, level_for_verbosity};
use sift_pruner::{AnalysisReport, Pruner, PruningResult};
use sift_settings::{PrunerSettings, PruningLevel, load_settings};

/// Suffix inserted before `.jsonl` for default output paths.
const PRUNED_SUFFIX: &str = "pruned";

/// Session-log pruner.
#[derive(Parser, Debug)]
#[command(name = "sift", version, about = "Prune JSONL session logs")]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    log_json: bool,

    /// Settings file (JSON). Missing files fall back to defaults.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Prune a file, or every `*.jsonl` file under a directory.
    Prune {
        /// Input file or directory.
        input: PathBuf,

        /// Output file, or output directory for directory input.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Pruning level: light, medium, aggressive, or ultra.
        #[arg(short, long)]
        level: Option<PruningLevel>,

        /// Process in fixed-size chunks instead of loading whole files.
        #[arg(long)]
        stream: bool,

        /// Messages per chunk when streaming.
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Override one scoring weight, e.g. `--weight hook_log=-40`.
        #[arg(long = "weight", value_parser = parse_weight)]
        weights: Vec<(String, i32)>,

        /// Skip the chain integrity check.
        #[arg(long)]
        no_validate: bool,

        /// Print results as JSON.
        #[arg(long)]
        json: bool,
    },
    /// Score and classify a file without writing output.
    Analyze {
        /// Input file.
        input: PathBuf,

        /// Level whose threshold the report counts against.
        #[arg(short, long)]
        level: Option<PruningLevel>,

        /// Print the report as JSON.
        #[arg(long)]
        json: bool,
    },
}

fn parse_weight(raw: &str) -> std::result::Result<(String, i32), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got `{raw}`"))?;
    let value = value
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("invalid weight for `{name}`: {e}"))?;
    Ok((name.trim().to_string(), value))
}

// ─────────────────────────────────────────────────────────────────────────────
// Paths
// ─────────────────────────────────────────────────────────────────────────────

fn is_jsonl(path: &Path) -> bool {
    path.extension().and_then(std::ffi::OsStr::to_str) == Some("jsonl")
}

fn is_pruned_output(path: &Path) -> bool {
    path.file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .is_some_and(|stem| stem.ends_with(&format!(".{PRUNED_SUFFIX}")))
}

/// `session.jsonl` → `session.pruned.jsonl`.
fn default_output(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .and_then(std::ffi::OsStr::to_str)
        .unwrap_or("session");
    input.with_file_name(format!("{stem}.{PRUNED_SUFFIX}.jsonl"))
}

/// Input files under `root`, sorted, excluding earlier pruned outputs.
fn collect_inputs(root: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry.with_context(|| format!("walking {}", root.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && is_jsonl(path) && !is_pruned_output(path) {
            files.push(path.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

/// Pair each input with its output path.
fn plan_outputs(
    root: &Path,
    inputs: Vec<PathBuf>,
    output: Option<&Path>,
) -> Vec<(PathBuf, PathBuf)> {
    inputs
        .into_iter()
        .map(|input| {
            let out = match output {
                Some(dir) => {
                    let relative = input.strip_prefix(root).unwrap_or(&input);
                    default_output(&dir.join(relative))
                }
                None => default_output(&input),
            };
            (input, out)
        })
        .collect()
}

// ─────────────────────────────────────────────────────────────────────────────
// Commands
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
struct RunMode {
    stream: bool,
    chunk_size: usize,
}

fn prune_one(pruner: &Pruner, input: &Path, output: &Path, mode: RunMode) -> Result<PruningResult> {
    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }
    let result = if mode.stream {
        pruner.process_file_streaming(input, output, mode.chunk_size)
    } else {
        pruner.process_file(input, output)
    };
    result.with_context(|| format!("pruning {}", input.display()))
}

async fn prune_many(
    pruner: Arc<Pruner>,
    jobs: Vec<(PathBuf, PathBuf)>,
    mode: RunMode,
    json: bool,
) -> Result<()> {
    let mut tasks = JoinSet::new();
    for (input, output) in jobs {
        let pruner = Arc::clone(&pruner);
        let _ = tasks.spawn_blocking(move || {
            let result = prune_one(&pruner, &input, &output, mode);
            (input, output, result)
        });
    }

    let mut failures = 0usize;
    while let Some(joined) = tasks.join_next().await {
        let (input, output, result) = joined.context("pruning task panicked")?;
        match result {
            Ok(result) => report_prune(&input, &output, &result, json)?,
            Err(e) => {
                failures += 1;
                tracing::error!(file = %input.display(), error = %format!("{e:#}"), "pruning failed");
            }
        }
    }
    if failures > 0 {
        bail!("{failures} file(s) failed to prune");
    }
    Ok(())
}

fn report_prune(input: &Path, output: &Path, result: &PruningResult, json: bool) -> Result<()> {
    if json {
        let mut value = serde_json::to_value(result)?;
        if let Some(obj) = value.as_object_mut() {
            let _ = obj.insert("input".into(), input.display().to_string().into());
            let _ = obj.insert("output".into(), output.display().to_string().into());
        }
        println!("{}", serde_json::to_string(&value)?);
        return Ok(());
    }

    println!("{} -> {}", input.display(), output.display());
    println!(
        "  level {} (threshold {}): kept {} of {} messages, {} compressed, {} removed",
        result.level,
        result.threshold,
        result.messages_preserved,
        result.messages_processed,
        result.messages_compressed,
        result.messages_removed,
    );
    println!(
        "  size {} -> {} bytes ({:.1}% smaller) in {:.2?}",
        result.size_before,
        result.size_after,
        result.compression_ratio * 100.0,
        result.processing_time,
    );
    if result.malformed_entries > 0 {
        println!("  skipped {} malformed line(s)", result.malformed_entries);
    }
    if let Some(integrity) = &result.integrity {
        println!(
            "  integrity {:.2}: {} of {} chains intact, {} orphaned message(s)",
            integrity.integrity_score,
            integrity.intact_chains,
            integrity.total_chains,
            integrity.orphans.len(),
        );
    }
    Ok(())
}

fn report_analysis(input: &Path, report: &AnalysisReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }

    println!("{}", input.display());
    println!(
        "  {} messages ({} malformed lines), {} bytes",
        report.messages, report.malformed, report.size_bytes
    );
    let kinds: Vec<String> = report.by_kind.iter().map(|(k, n)| format!("{k} {n}")).collect();
    println!("  by type: {}", kinds.join(", "));
    let categories: Vec<String> = report
        .by_category
        .iter()
        .map(|(c, n)| format!("{c} {n}"))
        .collect();
    println!("  by category: {}", categories.join(", "));
    println!(
        "  mean score {:.1}; {} at or above {} (level {})",
        report.mean_score, report.above_threshold, report.threshold, report.level
    );
    println!(
        "  graph: {} roots, {} orphans, {} branch points, max depth {}, longest chain {}, {} cycle(s)",
        report.graph.roots,
        report.graph.orphans,
        report.graph.branch_points,
        report.graph.max_depth,
        report.graph.longest_chain,
        report.graph.cycles,
    );
    println!(
        "  {} referenced, {} debugging context",
        report.referenced, report.debugging
    );
    Ok(())
}

fn resolve_settings(config: Option<&Path>, level: Option<PruningLevel>) -> Result<PrunerSettings> {
    let mut settings = load_settings(config).context("loading settings")?;
    if let Some(level) = level {
        settings.pruning_level = level;
    }
    Ok(settings)
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry point
// ─────────────────────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = level_for_verbosity(cli.verbose);
    if cli.log_json {
        init_json_subscriber(level);
    } else {
        init_subscriber(level);
    }

    match cli.command {
        Command::Prune {
            input,
            output,
            level,
            stream,
            chunk_size,
            weights,
            no_validate,
            json,
        } => {
            let mut settings = resolve_settings(cli.config.as_deref(), level)?;
            settings.custom_weights.extend(weights);
            if no_validate {
                settings.validate_integrity = false;
            }
            let mode = RunMode {
                stream,
                chunk_size: chunk_size.unwrap_or(settings.streaming.chunk_size),
            };
            let pruner = Arc::new(Pruner::new(settings).context("invalid settings")?);

            if input.is_dir() {
                let inputs = collect_inputs(&input)?;
                if inputs.is_empty() {
                    tracing::warn!(dir = %input.display(), "no .jsonl files found");
                    return Ok(());
                }
                tracing::info!(files = inputs.len(), level = %pruner.level(), "pruning directory");
                let jobs = plan_outputs(&input, inputs, output.as_deref());
                prune_many(pruner, jobs, mode, json).await
            } else {
                let output = output.unwrap_or_else(|| default_output(&input));
                let result = prune_one(&pruner, &input, &output, mode)?;
                report_prune(&input, &output, &result, json)
            }
        }
        Command::Analyze { input, level, json } => {
            let settings = resolve_settings(cli.config.as_deref(), level)?;
            let pruner = Pruner::new(settings).context("invalid settings")?;
            let report = pruner
                .analyze_file(&input)
                .with_context(|| format!("analyzing {}", input.display()))?;
            report_analysis(&input, &report, json)
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
