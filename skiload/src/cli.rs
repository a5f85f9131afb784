use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

fn parse_duration(input: &str) -> Result<Duration, String> {
    let s = input.trim();
    if s.is_empty() {
        return Err("duration cannot be empty (expected e.g. 10s, 250ms, 1m)".to_string());
    }
    let d = humantime::parse_duration(s)
        .map_err(|err| format!("invalid duration '{s}': {err} (expected e.g. 10s, 250ms, 1m)"))?;
    if d.is_zero() {
        return Err(format!("duration '{s}' must be greater than zero"));
    }
    Ok(d)
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    /// Progress bars on stderr, then a human-readable summary.
    HumanReadable,
    /// Emit phase and summary lines (NDJSON) to stdout.
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "skiload",
    author,
    version,
    about = "Phased load generator for the ski-resort lift-ride API",
    long_about = "skiload drives a lift-ride API through three overlapping phases (warmup, peak, cooldown).\n\nWarmup and cooldown run a quarter of `--threads` workers, peak runs all of them. Each phase starts as soon as `--trigger-percent` of the previous phase's workers have finished.\n\nEvery request is recorded; per-endpoint mean/median/p99/max latency is computed once all phases finish.",
    after_help = "Examples:\n  skiload run --target http://localhost:8080\n  skiload run --target http://localhost:8080 --threads 256 --skiers 50000\n  skiload run --config load.yaml --output json --no-samples\n  skiload report samples.csv"
)]
pub struct Cli {
    /// Log filter used when RUST_LOG is unset (e.g. warn, info, skiload_core=debug)
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        env = "SKILOAD_LOG_LEVEL"
    )]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the three load phases against a target
    #[command(
        long_about = "Run warmup, peak and cooldown against the target.\n\nSettings come from built-in defaults, then `--config`, then flags (or their SKILOAD_* environment variables)."
    )]
    Run(RunArgs),

    /// Recompute endpoint statistics from a samples CSV
    Report(ReportArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// YAML config file (camelCase keys; flags override it)
    #[arg(long, value_name = "FILE", env = "SKILOAD_CONFIG")]
    pub config: Option<PathBuf>,

    /// Base URL of the lift-ride API (e.g. http://127.0.0.1:8080)
    #[arg(long, value_name = "URL", env = "SKILOAD_TARGET")]
    pub target: Option<String>,

    /// Peak worker count; warmup and cooldown use a quarter of it
    #[arg(long, env = "SKILOAD_THREADS")]
    pub threads: Option<u32>,

    /// Number of skier ids, partitioned across each phase's workers
    #[arg(long, env = "SKILOAD_SKIERS")]
    pub skiers: Option<u32>,

    /// Number of lifts; lift ids are drawn from 0..lifts
    #[arg(long, env = "SKILOAD_LIFTS")]
    pub lifts: Option<u32>,

    /// Resort id sent with every request
    #[arg(long, value_name = "ID", env = "SKILOAD_RESORT")]
    pub resort: Option<String>,

    /// Ski day sent with every request
    #[arg(long, env = "SKILOAD_DAY")]
    pub day: Option<u32>,

    /// Share of a phase's workers that must finish before the next phase starts (1-100)
    #[arg(long, value_name = "P", env = "SKILOAD_TRIGGER_PERCENT")]
    pub trigger_percent: Option<u32>,

    /// Per-request timeout (e.g. 5s, 500ms); a timed-out request counts as failed
    #[arg(long, value_name = "DUR", value_parser = parse_duration, env = "SKILOAD_REQUEST_TIMEOUT")]
    pub request_timeout: Option<Duration>,

    /// Where to write the raw samples CSV (overwritten if it exists)
    #[arg(
        long,
        value_name = "FILE",
        default_value = "samples.csv",
        env = "SKILOAD_SAMPLES_OUT"
    )]
    pub samples_out: PathBuf,

    /// Do not write the samples CSV
    #[arg(long, conflicts_with = "samples_out")]
    pub no_samples: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}

#[derive(Debug, Args)]
pub struct ReportArgs {
    /// Samples CSV written by `skiload run`
    pub samples: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::HumanReadable)]
    pub output: OutputFormat,
}
