use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// ptr-scale-lint CLI options.
#[derive(Debug, Parser)]
#[command(
    name = "ptr-scale-lint",
    version,
    about = "Find pointer arithmetic scaled by sizeof/offsetof values",
    args_conflicts_with_subcommands = true,
    subcommand_precedence_over_arg = true
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Command>,

    #[command(flatten)]
    pub check: CheckArgs,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze translation units (JSON function models).
    Check(CheckArgs),

    /// List available checkers.
    ListRules,

    /// Explain a checker.
    Explain {
        /// Checker name.
        rule: String,
    },
}

#[derive(Debug, Clone, ClapArgs)]
pub struct CheckArgs {
    /// Files/directories to analyze. Defaults to stdin when absent.
    #[arg(value_name = "PATH")]
    pub paths: Vec<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,

    /// Path to ptr-scale-lint.toml (otherwise discovered from the first path).
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Only run these checkers (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub only: Vec<String>,

    /// Skip these checkers (comma-separated).
    #[arg(long, value_delimiter = ',')]
    pub skip: Vec<String>,

    /// Also run preview checkers.
    #[arg(long)]
    pub preview: bool,

    /// Exit with code 1 if any diagnostics are emitted.
    #[arg(long)]
    pub deny_warnings: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Json,
    Github,
}
