use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tend")]
#[command(author = "Alberto Cavalcante")]
#[command(version)]
#[command(about = "Converge a machine to the state declared in a recipe", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Verbosity level
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Converge every resource declared in a recipe
    Apply(ApplyArgs),

    /// Show which provider a resource type resolves to on this machine
    Resolve(ResolveArgs),

    /// Show the platform facts providers are matched against
    Facts(FactArgs),

    /// List the built-in resource types
    Types,

    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Fact overrides shared by every command that resolves providers
#[derive(Args, Debug, Clone, Default)]
pub struct FactArgs {
    /// Override a gathered fact (repeatable), e.g. --fact platform_family=rhel
    #[arg(long = "fact", value_name = "KEY=VALUE")]
    pub facts: Vec<String>,
}

#[derive(Args)]
pub struct ApplyArgs {
    /// Recipe file (TOML)
    pub recipe: PathBuf,

    #[command(flatten)]
    pub facts: FactArgs,

    /// Evaluate guards and report what would run without changing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Keep going after a resource fails
    #[arg(long)]
    pub continue_on_error: bool,

    /// Write a JSON run report to this path
    #[arg(long, value_name = "PATH")]
    pub report: Option<PathBuf>,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Resource type name or synonym
    #[arg(value_name = "TYPE")]
    pub type_name: String,

    /// List every applicable provider, not just the winner
    #[arg(long)]
    pub all: bool,

    #[command(flatten)]
    pub facts: FactArgs,
}
