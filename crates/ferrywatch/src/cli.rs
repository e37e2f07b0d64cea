//! Clap derive structures for the `ferrywatch` CLI.
//!
//! Defines the command tree, global flags, and shared scope arguments.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use ferrywatch_core::{OwnerRef, ResourceKind, WatchAction};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// ferrywatch -- follow a controller's resource event stream
#[derive(Debug, Parser)]
#[command(
    name = "ferrywatch",
    version,
    about = "Watch resource change events and the cache keys they invalidate",
    long_about = "Subscribes to a controller's live resource event feed\n\
        (/v1/resources/events), decodes each change notification and maps it\n\
        to the query-cache keys a console would invalidate.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Controller profile to use
    #[arg(long, short = 'p', env = "FERRYWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Controller base URL (overrides profile)
    #[arg(long, short = 'c', env = "FERRYWATCH_CONTROLLER", global = true)]
    pub controller: Option<String>,

    /// Config file path (defaults to the platform config directory)
    #[arg(long, env = "FERRYWATCH_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "FERRYWATCH_OUTPUT",
        default_value = "plain",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Log line format on stderr
    #[arg(long, env = "FERRYWATCH_LOG_FORMAT", default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Connect timeout in seconds (check)
    #[arg(long, env = "FERRYWATCH_TIMEOUT", default_value = "10", global = true)]
    pub timeout: u64,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines (default)
    Plain,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON (one document per line)
    JsonCompact,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Follow the event stream, printing notifications and invalidated keys
    #[command(alias = "w")]
    Watch(WatchArgs),

    /// Decode events offline and print the cache keys they invalidate
    #[command(alias = "k")]
    Keys(KeysArgs),

    /// Print the connection URL for a subscription scope
    Scope(ScopeCmdArgs),

    /// Check that the event stream accepts a connection
    Check(ScopeCmdArgs),

    /// Show the active relation table
    Relations(RelationsArgs),

    /// Manage CLI configuration
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Scope Arguments ──────────────────────────────────────────────────

/// Subscription filters. Unset flags fall back to the profile, then `All`.
#[derive(Debug, Clone, Default, Args)]
pub struct ScopeArgs {
    /// Action filter: created, updated, deleted, all (or 0-3)
    #[arg(long, short = 'a')]
    pub action: Option<WatchAction>,

    /// Resource kind filter (Instance, Cluster, Node, Machine, ...)
    #[arg(long, short = 'K')]
    pub kind: Option<ResourceKind>,

    /// Only this resource id
    #[arg(long)]
    pub id: Option<String>,

    /// Only resources owned by KIND/ID (e.g. Node/node-7)
    #[arg(long, value_parser = parse_owner)]
    pub owner: Option<OwnerRef>,
}

fn parse_owner(value: &str) -> Result<OwnerRef, String> {
    match value.split_once('/') {
        Some((kind, id)) if !kind.is_empty() && !id.is_empty() => Ok(OwnerRef::new(kind, id)),
        _ => Err(format!("expected KIND/ID, got '{value}'")),
    }
}

#[derive(Debug, Args)]
pub struct ScopeCmdArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,
}

// ── Watch ────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct WatchArgs {
    #[command(flatten)]
    pub scope: ScopeArgs,

    /// Exit after this many notifications
    #[arg(long, short = 'n')]
    pub count: Option<u64>,

    /// Give up after this many consecutive failed reconnects (default: forever)
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Extra upgrade-request header, NAME=VALUE (repeatable)
    #[arg(long = "header", short = 'H', value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Invalidate only direct keys (ignore relations)
    #[arg(long)]
    pub direct_only: bool,

    /// Print session counters on exit
    #[arg(long)]
    pub stats: bool,
}

fn parse_header(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((name, val)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), val.trim().to_owned()))
        }
        _ => Err(format!("expected NAME=VALUE, got '{value}'")),
    }
}

// ── Keys ─────────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct KeysArgs {
    /// Event JSON; omit or pass '-' to read one event per line from stdin
    pub event: Option<String>,

    /// Read events (one per line) from a file
    #[arg(long, short = 'f', conflicts_with = "event")]
    pub file: Option<PathBuf>,

    /// Ignore relations; print only direct keys
    #[arg(long)]
    pub direct_only: bool,
}

// ── Relations ────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct RelationsArgs {
    /// Show a single kind
    #[arg(long, short = 'K')]
    pub kind: Option<ResourceKind>,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create a config file with one profile
    Init {
        /// Controller base URL (e.g. http://10.0.0.5:8080)
        #[arg(long)]
        url: String,

        /// Profile name
        #[arg(long, default_value = "default")]
        name: String,

        /// Overwrite an existing config file
        #[arg(long)]
        force: bool,
    },

    /// Display current resolved configuration
    Show,

    /// Set a profile value
    Set {
        /// Profile key (controller, kind, action, owner, max_retries, header.NAME, ...)
        key: String,

        /// Value to set
        value: String,
    },

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to make default
        name: String,
    },

    /// Print the config file path
    Path,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
