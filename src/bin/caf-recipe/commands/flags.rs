//! `caf-recipe flags` command

use anyhow::Result;

use caf_recipe::ops::resolve;

use super::{print_json, Configuration};
use crate::cli::OutputArgs;

pub fn execute(args: OutputArgs) -> Result<()> {
    let config = Configuration::load(&args.config)?;
    let resolution = resolve(config.platform, &config.options, &config.rules)?;
    let invocation = resolution.build_invocation()?;

    if args.json {
        return print_json(&invocation);
    }

    if let Some(patch) = &invocation.patch {
        println!("# apply patch: {}", patch);
    }
    for arg in invocation.args() {
        println!("{}", arg);
    }

    Ok(())
}
