//! caf-recipe CLI - Build configuration resolver for packaging CAF

use std::io::IsTerminal;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use caf_recipe::resolver::ResolveError;
use caf_recipe::util::diagnostic::emit;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color && std::io::stderr().is_terminal();

    if let Err(e) = run(cli) {
        // Resolution errors carry their own context and suggestions
        match e.downcast_ref::<ResolveError>() {
            Some(err) => emit(&err.to_diagnostic(), color),
            None => eprintln!("error: {:#}", e),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("caf_recipe=debug")
    } else {
        EnvFilter::new("caf_recipe=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .with_ansi(!cli.no_color)
        .init();

    // Execute command
    match cli.command {
        Commands::Resolve(args) => commands::resolve::execute(args),
        Commands::Validate(args) => commands::validate::execute(args),
        Commands::Flags(args) => commands::flags::execute(args),
        Commands::Manifest(args) => commands::manifest::execute(args),
        Commands::Plan(args) => commands::plan::execute(args),
        Commands::Rules(args) => commands::rules::execute(args),
        Commands::Completions(args) => commands::completions::execute(args),
    }
}
