use std::path::PathBuf;

use camino::Utf8PathBuf;
use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shared application context for global flags
#[derive(Clone, Debug)]
pub struct AppContext {
    pub quiet: bool,    // global --quiet
    pub no_color: bool, // global --no-color
    pub dry_run: bool,  // global --dry-run
}

#[derive(Parser)]
#[command(name = "gv")]
#[command(about = "Turn free-text commands into structured file, line, git and host actions")]
#[command(version, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Suppress non-essential output
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Show what would be done without executing
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Read configuration from this file instead of the working directory
    #[arg(long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Print the canonical form of an utterance
    Normalize(NormalizeArgs),

    /// Resolve an utterance into an action without running it
    Resolve(ResolveArgs),

    /// Resolve an utterance, preview it, and execute with --apply
    Run(RunArgs),

    /// Resolve utterances from stdin, one per line, keeping the active file
    Session(SessionArgs),

    /// Initialize a gitvision.toml config file
    Init(InitArgs),
}

#[derive(Args)]
pub struct NormalizeArgs {
    /// Utterance words (joined with spaces)
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub utterance: Vec<String>,
}

/// Inputs shared by `resolve` and `run`
#[derive(Args, Clone, Debug)]
pub struct UtteranceArgs {
    /// Utterance words (joined with spaces)
    #[arg(required = true, num_args = 1.., allow_hyphen_values = true)]
    pub utterance: Vec<String>,

    /// Active file used to fill an omitted target
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<Utf8PathBuf>,

    /// Read a multi-line block payload from this file ("-" for stdin)
    #[arg(long, value_name = "FILE")]
    pub block_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub input: UtteranceArgs,

    /// Output format
    #[arg(long, default_value = "json", value_enum)]
    pub format: OutputFormat,
}

#[derive(Args)]
pub struct RunArgs {
    #[command(flatten)]
    pub input: UtteranceArgs,

    /// Execute the action instead of only previewing it
    #[arg(long)]
    pub apply: bool,
}

#[derive(Args)]
pub struct SessionArgs {
    /// File that starts out active
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<Utf8PathBuf>,
}

#[derive(Args)]
pub struct InitArgs {
    /// Directory to initialize config in
    #[arg(default_value = ".")]
    pub path: PathBuf,

    /// Overwrite existing config file
    #[arg(long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty JSON resolution
    Json,
    /// One human-readable line
    Text,
}

impl UtteranceArgs {
    pub fn text(&self) -> String {
        self.utterance.join(" ")
    }
}

impl NormalizeArgs {
    pub fn text(&self) -> String {
        self.utterance.join(" ")
    }
}
