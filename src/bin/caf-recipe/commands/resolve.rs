//! `caf-recipe resolve` command

use anyhow::Result;

use caf_recipe::ops::resolve;

use super::{print_json, Configuration};
use crate::cli::OutputArgs;

pub fn execute(args: OutputArgs) -> Result<()> {
    let config = Configuration::load(&args.config)?;
    let resolution = resolve(config.platform, &config.options, &config.rules)?;
    let summary = resolution.summary()?;

    if args.json {
        return print_json(&summary);
    }

    println!("package id:   {}", summary.package_id);
    println!("generation:   {}", summary.generation);
    println!("platform:     {}", summary.platform);

    let options: Vec<String> = summary
        .options
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect();
    println!("options:      {}", join_or_none(&options));

    let pruned: Vec<String> = summary.pruned.iter().map(|n| n.to_string()).collect();
    println!("pruned:       {}", join_or_none(&pruned));

    let deps: Vec<String> = summary.dependencies.iter().map(|d| d.to_string()).collect();
    println!("dependencies: {}", join_or_none(&deps));

    if let Some(patch) = &summary.patch {
        println!("patch:        {}", patch);
    }

    println!();
    println!("definitions:");
    for arg in summary.definitions.to_cmake_args() {
        println!("  {}", arg);
    }

    println!();
    println!("manifest:");
    println!("  artifacts:   {}", summary.manifest.artifacts().join(" "));
    println!(
        "  system libs: {}",
        join_or_none(summary.manifest.system_libs())
    );

    Ok(())
}

fn join_or_none(items: &[String]) -> String {
    if items.is_empty() {
        "(none)".to_string()
    } else {
        items.join(", ")
    }
}
