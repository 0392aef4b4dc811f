//! `caf-recipe manifest` command

use anyhow::Result;

use caf_recipe::ops::resolve;

use super::{print_json, Configuration};
use crate::cli::OutputArgs;

pub fn execute(args: OutputArgs) -> Result<()> {
    let config = Configuration::load(&args.config)?;
    let resolution = resolve(config.platform, &config.options, &config.rules)?;
    let manifest = resolution.manifest();

    if args.json {
        return print_json(manifest);
    }

    for artifact in manifest.artifacts() {
        println!("lib    {}", artifact);
    }
    for lib in manifest.system_libs() {
        println!("system {}", lib);
    }

    Ok(())
}
