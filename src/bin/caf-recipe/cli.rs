//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

use caf_recipe::rules::Generation;

/// caf-recipe - Build configuration resolver for packaging CAF
#[derive(Parser)]
#[command(name = "caf-recipe")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve a configuration and print everything it produces
    Resolve(OutputArgs),

    /// Prune the options and check the toolchain only
    Validate(OutputArgs),

    /// Show the CMake arguments for the build step
    Flags(OutputArgs),

    /// Show the artifacts and system libraries of a configuration
    Manifest(OutputArgs),

    /// Show the steps a build of the configuration would run
    Plan(PlanArgs),

    /// Print a rule generation's table
    Rules(RulesArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

/// Inputs shared by every resolving command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Target operating system (defaults to the host)
    #[arg(long)]
    pub os: Option<String>,

    /// Compiler family (gcc, clang, apple-clang, visual-studio, intel)
    #[arg(long)]
    pub compiler: Option<String>,

    /// Compiler version (e.g. 4.9, 10, 16)
    #[arg(long)]
    pub compiler_version: Option<String>,

    /// Target architecture (defaults to the host)
    #[arg(long)]
    pub arch: Option<String>,

    /// Build type (debug, release, relwithdebinfo, minsizerel)
    #[arg(long)]
    pub build_type: Option<String>,

    /// Set a package option (repeatable)
    #[arg(short = 'o', long = "option", value_name = "KEY=VALUE", value_parser = parse_key_value)]
    pub options: Vec<(String, String)>,

    /// Rule generation to resolve with (1, 2 or 3)
    #[arg(long, conflicts_with = "rules")]
    pub generation: Option<Generation>,

    /// Custom rule table file (TOML)
    #[arg(long, value_name = "PATH")]
    pub rules: Option<PathBuf>,

    /// Profile file, applied over the global and project profiles
    #[arg(long, value_name = "PATH", env = "CAF_RECIPE_PROFILE")]
    pub profile: Option<PathBuf>,

    /// Do not fill unset options with their declared defaults
    #[arg(long)]
    pub no_defaults: bool,
}

#[derive(Args)]
pub struct OutputArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct PlanArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Source directory of the library
    #[arg(long, default_value = ".")]
    pub source_dir: PathBuf,

    /// Directory for build trees and packages
    #[arg(long, default_value = "build")]
    pub work_dir: PathBuf,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct RulesArgs {
    /// Rule generation to print (defaults to the latest)
    #[arg(long)]
    pub generation: Option<Generation>,

    /// Check a custom rule table instead of printing a built-in one
    #[arg(long, value_name = "PATH", conflicts_with = "generation")]
    pub check: Option<PathBuf>,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

fn parse_key_value(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{}`", s))?;

    let key = key.trim();
    if key.is_empty() {
        return Err(format!("missing option name in `{}`", s));
    }

    Ok((key.to_string(), value.trim().to_string()))
}
