//! `caf-recipe plan` command
//!
//! Dry run of fetch, build, install and publish for a configuration.

use anyhow::Result;

use caf_recipe::ops::{plan, resolve};

use super::{print_json, Configuration};
use crate::cli::PlanArgs;

pub fn execute(args: PlanArgs) -> Result<()> {
    let config = Configuration::load(&args.config)?;
    let resolution = resolve(config.platform, &config.options, &config.rules)?;
    let steps = plan(&resolution, &args.source_dir, &args.work_dir)?;

    if args.json {
        return print_json(&steps);
    }

    for (i, step) in steps.iter().enumerate() {
        println!("{:>2}. {}", i + 1, step);
    }

    Ok(())
}
