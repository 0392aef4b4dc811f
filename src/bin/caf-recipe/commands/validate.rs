//! `caf-recipe validate` command
//!
//! Prunes the options and checks the toolchain without compiling anything.

use anyhow::Result;
use serde_json::json;

use caf_recipe::resolver::{prune, validate};

use super::{print_json, Configuration};
use crate::cli::OutputArgs;

pub fn execute(args: OutputArgs) -> Result<()> {
    let config = Configuration::load(&args.config)?;

    let pruned = prune(&config.options, &config.platform, &config.rules.schema)?;
    validate(&config.platform, &config.rules)?;

    if args.json {
        return print_json(&json!({
            "platform": config.platform,
            "generation": config.rules.generation,
            "accepted": true,
            "options": pruned.options(),
            "pruned": pruned.pruned(),
        }));
    }

    println!(
        "ok: {} is supported by {}",
        config.platform, config.rules.generation
    );
    for name in pruned.pruned() {
        println!("  pruned `{}`", name);
    }

    Ok(())
}
