//! `caf-recipe rules` command

use anyhow::Result;

use caf_recipe::rules::{Generation, RuleTable};

use super::print_json;
use crate::cli::RulesArgs;

pub fn execute(args: RulesArgs) -> Result<()> {
    if let Some(path) = &args.check {
        let table = RuleTable::load(path)?;
        println!("ok: rule table `{}` is consistent", table.generation);
        return Ok(());
    }

    let table = args.generation.unwrap_or_else(Generation::latest).rules();

    if args.json {
        return print_json(&table);
    }

    print!("{}", table.to_toml()?);
    Ok(())
}
