//! CLI argument definitions using clap derive

use clap::{ArgAction, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use std::path::PathBuf;

/// gitspace - find the git workspace a command should operate on
///
/// Resolves the working directory through an override, an editor-provided
/// hint, git itself, and finally the current directory.
#[derive(Parser, Debug)]
#[command(name = "gitspace")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Increase verbosity (-v info, -vv debug)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Configuration file path
    #[arg(short, long, global = true, env = "GITSPACE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log line format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text, env = "GITSPACE_LOG_FORMAT")]
    pub log_format: LogFormat,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the workspace for the current directory
    Detect(DetectArgs),

    /// Compare the cached workspace with a fresh resolution
    Info(DetectArgs),

    /// Show what git reports about a directory's repository
    Repo(RepoArgs),

    /// Check git availability and the detected workspace
    Status,

    /// List pending changes in the workspace (git status)
    Changes(DetectArgs),

    /// Print the workspace diff
    Diff(DiffArgs),

    /// Remove a stale index.lock from the workspace
    CleanupLock(CleanupLockArgs),

    /// Show or edit configuration
    Config(ConfigArgs),

    /// Answer JSON requests on stdin, one per line
    Serve,

    /// Print shell completions
    Completions(CompletionsArgs),
}

/// Arguments for detect and info
#[derive(Parser, Debug)]
pub struct DetectArgs {
    /// Use this directory instead of detecting one
    #[arg(long = "override", value_name = "PATH")]
    pub override_path: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the repo command
#[derive(Parser, Debug)]
pub struct RepoArgs {
    /// Directory to inspect (default: current directory)
    pub dir: Option<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

/// Arguments for the diff command
#[derive(Parser, Debug)]
pub struct DiffArgs {
    /// Diff the index against HEAD instead of the working tree against the index
    #[arg(long, alias = "cached")]
    pub staged: bool,

    /// Workspace override
    #[arg(long = "override", value_name = "PATH")]
    pub override_path: Option<String>,
}

/// Arguments for the cleanup-lock command
#[derive(Parser, Debug)]
pub struct CleanupLockArgs {
    /// Remove the lock even if it is recent
    #[arg(short, long)]
    pub force: bool,

    /// Workspace override
    #[arg(long = "override", value_name = "PATH")]
    pub override_path: Option<String>,
}

/// Arguments for the config command
#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: Option<ConfigAction>,
}

/// Config subcommands
#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show current configuration
    Show,

    /// Show configuration file path
    Path,

    /// Initialize default configuration
    Init {
        /// Overwrite existing configuration
        #[arg(short, long)]
        force: bool,
    },

    /// Set a configuration value
    Set {
        /// Configuration key (e.g., git.timeout_secs)
        key: String,
        /// Value to set
        value: String,
    },
}

/// Arguments for the completions command
#[derive(Parser, Debug)]
pub struct CompletionsArgs {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// JSON on one line
    Json,
}

/// Log line format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Text,
    Json,
}
