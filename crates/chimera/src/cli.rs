//! Clap derive structures for the `chimera` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.
//! Also compiled by `build.rs` for man pages, so it may only use clap.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// chimera -- inspect and control devices on a Chimera network
#[derive(Debug, Parser)]
#[command(
    name = "chimera",
    version,
    about = "Inspect and control devices on a Chimera network",
    long_about = "A command-line client for the Chimera Device Service.\n\n\
        Lists and searches the device inventory, isolates or releases\n\
        devices, and toggles per-device blocklist categories.",
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
    /// Service profile to use
    #[arg(long, short = 'p', env = "CHIMERA_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Device Service URL (overrides profile)
    #[arg(long, short = 'u', env = "CHIMERA_API_URL", global = true)]
    pub api_url: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CHIMERA_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Skip confirmation prompts
    #[arg(long, short = 'y', global = true)]
    pub yes: bool,

    /// Accept self-signed TLS certificates
    #[arg(long, short = 'k', env = "CHIMERA_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CHIMERA_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List, inspect, and act on devices
    #[command(alias = "dev", alias = "d")]
    Devices(DevicesArgs),

    /// Show aggregate inventory statistics
    #[command(alias = "sum")]
    Summary,

    /// List the blocklist categories this service recognizes
    #[command(alias = "cat")]
    Categories,

    /// Show service version and reachability
    Status,

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Devices ──────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct DevicesArgs {
    #[command(subcommand)]
    pub command: DevicesCommand,
}

#[derive(Debug, Subcommand)]
pub enum DevicesCommand {
    /// List devices, optionally searched and filtered
    #[command(alias = "ls")]
    List(DevicesListArgs),

    /// Show a single device
    Get {
        /// Device ID
        device: u64,
    },

    /// Cut a device off the network
    Isolate {
        /// Device ID
        device: u64,
    },

    /// Restore network access for an isolated device
    Release {
        /// Device ID
        device: u64,
    },

    /// Toggle one blocklist category for a device
    #[command(alias = "toggle")]
    Block {
        /// Device ID
        device: u64,
        /// Blocklist category (see `chimera categories`)
        category: String,
    },

    /// Set a device's display name
    Rename {
        /// Device ID
        device: u64,
        /// New name
        name: String,
    },

    /// Move a device into another group
    SetGroup {
        /// Device ID
        device: u64,
        /// Group name or numeric group ID
        group: String,
    },
}

#[derive(Debug, Args)]
pub struct DevicesListArgs {
    /// Case-insensitive text matched against name, hostname, vendor, and IP
    #[arg(long, short = 's', default_value = "")]
    pub search: String,

    /// Filter: all, active, inactive, custom, high_risk, or a group name
    #[arg(long, short = 'f', default_value = "all")]
    pub filter: String,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Interactive configuration wizard
    Init,

    /// Show the effective configuration
    Show,

    /// Set the default profile
    #[command(alias = "use")]
    SetDefault {
        /// Profile name
        name: String,
    },

    /// Print the config file path
    Path,

    /// List configured profiles
    Profiles,
}

// ── Completions ──────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
