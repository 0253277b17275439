//! CLI argument definitions
//!
//! All Clap derive structs for `twinstep` command-line parsing.

use std::path::PathBuf;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

// ============================================================================
// Root CLI
// ============================================================================

/// Step-by-step playback of side-by-side architecture diagrams.
#[derive(Parser, Debug)]
#[command(name = "twinstep", author, version, about)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all non-error output.
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Color output control.
    #[arg(long, default_value = "auto", global = true, env = "TWINSTEP_COLOR")]
    pub color: ColorChoice,

    /// Log line format.
    #[arg(long, default_value = "human", global = true, env = "TWINSTEP_LOG_FORMAT")]
    pub log_format: OutputFormat,
}

// ============================================================================
// Top-Level Commands
// ============================================================================

/// Top-level subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Play a scenario, rendering every diagram frame to stdout.
    Play(PlayArgs),

    /// Validate scenario files without playing them.
    Validate(ValidateArgs),

    /// Print the planned phase timeline of a scenario.
    Timeline(TimelineArgs),

    /// Inspect built-in scenarios.
    Scenarios(ScenariosCommand),

    /// Display version information.
    Version(VersionArgs),
}

/// Where a scenario comes from: a built-in name or a file.
#[derive(Args, Debug, Clone)]
#[command(group = clap::ArgGroup::new("source").multiple(false))]
pub struct ScenarioSource {
    /// Built-in scenario name (see `twinstep scenarios list`).
    #[arg(group = "source")]
    pub scenario: Option<String>,

    /// Path to a YAML scenario file.
    #[arg(short, long, group = "source", env = "TWINSTEP_CONFIG")]
    pub config: Option<PathBuf>,
}

// ============================================================================
// Play Command
// ============================================================================

/// Arguments for `play`.
#[derive(Args, Debug)]
pub struct PlayArgs {
    /// Scenario to play.
    #[command(flatten)]
    pub source: ScenarioSource,

    /// Initial speed multiplier (clamped into the scenario's range).
    #[arg(long, env = "TWINSTEP_SPEED")]
    pub speed: Option<f64>,

    /// Start paused regardless of the scenario's autoplay setting.
    #[arg(long)]
    pub paused: bool,

    /// Stop after this many completed loops.
    #[arg(long, env = "TWINSTEP_CYCLES", value_parser = clap::value_parser!(u64).range(1..))]
    pub cycles: Option<u64>,

    /// Scale packet travel times with the playback speed.
    #[arg(long, env = "TWINSTEP_SYNC_PACKETS")]
    pub sync_packets: bool,

    /// Render only these diagrams (by id). Defaults to all.
    #[arg(long = "diagram", value_name = "ID")]
    pub diagrams: Vec<String>,

    /// Frame output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Write JSONL playback events to this file.
    #[arg(long, env = "TWINSTEP_EVENTS_FILE", conflicts_with = "events_stderr")]
    pub events_file: Option<PathBuf>,

    /// Write JSONL playback events to stderr.
    #[arg(long)]
    pub events_stderr: bool,

    /// Serve Prometheus metrics on this port.
    #[arg(long, env = "TWINSTEP_METRICS_PORT")]
    pub metrics_port: Option<u16>,

    /// Ignore stdin; playback is controlled by flags and signals only.
    #[arg(long)]
    pub no_input: bool,
}

// ============================================================================
// Validate / Timeline
// ============================================================================

/// Arguments for `validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Scenario files to validate.
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,

    /// Enable strict validation (warnings become errors).
    #[arg(long)]
    pub strict: bool,
}

/// Arguments for `timeline`.
#[derive(Args, Debug)]
pub struct TimelineArgs {
    /// Scenario to plan.
    #[command(flatten)]
    pub source: ScenarioSource,

    /// Speed multiplier to plan for.
    #[arg(long, default_value_t = 1.0)]
    pub speed: f64,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// Scenarios Command
// ============================================================================

/// Built-in scenario commands.
#[derive(Args, Debug)]
pub struct ScenariosCommand {
    /// Scenarios subcommand.
    #[command(subcommand)]
    pub subcommand: ScenariosSubcommand,
}

/// Scenarios subcommands.
#[derive(Subcommand, Debug)]
pub enum ScenariosSubcommand {
    /// List built-in scenarios.
    List(ScenariosListArgs),

    /// Print the YAML of a built-in scenario.
    Show(ScenariosShowArgs),
}

/// Arguments for `scenarios list`.
#[derive(Args, Debug)]
pub struct ScenariosListArgs {
    /// Filter by tag.
    #[arg(long)]
    pub tag: Option<String>,

    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

/// Arguments for `scenarios show`.
#[derive(Args, Debug)]
pub struct ScenariosShowArgs {
    /// Scenario name.
    pub name: String,
}

/// Arguments for version display.
#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Output format.
    #[arg(short, long, default_value = "human")]
    pub format: OutputFormat,
}

// ============================================================================
// CLI-Local Enums
// ============================================================================

/// Color output choice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ColorChoice {
    /// Auto-detect terminal support.
    #[default]
    Auto,
    /// Always use color.
    Always,
    /// Never use color.
    Never,
}

/// Output format for structured output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable output.
    #[default]
    Human,
    /// JSON output.
    Json,
}

// ============================================================================
// Tests
// ============================================================================
