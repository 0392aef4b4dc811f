//! Command implementations

use anyhow::{Context, Result};

use caf_recipe::core::options::{canonicalize, OptionSet, RawOptions};
use caf_recipe::core::platform::{Arch, BuildType, Os, PlatformDescriptor};
use caf_recipe::ops::options_from_raw;
use caf_recipe::rules::RuleTable;
use caf_recipe::util::config::{
    global_profile_path, load_profiles, project_profile_path, Profile,
};

use crate::cli::ConfigArgs;

pub mod completions;
pub mod flags;
pub mod manifest;
pub mod plan;
pub mod resolve;
pub mod rules;
pub mod validate;

/// Everything a resolving command starts from.
pub struct Configuration {
    pub platform: PlatformDescriptor,
    pub rules: RuleTable,
    pub options: OptionSet,
}

impl Configuration {
    /// Merge profiles and flags into a platform, a rule table and options.
    ///
    /// Order of precedence (highest to lowest):
    /// 1. Command-line flags
    /// 2. `--profile` file
    /// 3. Project profile (.caf-recipe/profile.toml)
    /// 4. Global profile (~/.caf-recipe/profile.toml)
    /// 5. Built-in defaults
    pub fn load(args: &ConfigArgs) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let global = global_profile_path();
        let mut profile = load_profiles(global.as_deref(), &project_profile_path(&cwd));

        if let Some(path) = &args.profile {
            profile.merge(Profile::load(path)?);
        }

        // The most specific layer naming a table source picks the table
        let rules = match (&args.rules, args.generation, &profile.rules) {
            (Some(path), _, _) => RuleTable::load(path)?,
            (None, Some(generation), _) => generation.rules(),
            (None, None, Some(path)) => RuleTable::load(path)?,
            (None, None, None) => profile.generation.unwrap_or_default().rules(),
        };
        tracing::debug!("using rule table `{}`", rules.generation);

        let platform = platform_from(args, &profile)?;

        let mut raw: RawOptions = profile.raw_options()?;
        raw.extend(canonicalize(args.options.iter().cloned())?);
        let options = options_from_raw(&raw, &rules, !args.no_defaults)?;

        Ok(Configuration {
            platform,
            rules,
            options,
        })
    }
}

fn platform_from(args: &ConfigArgs, profile: &Profile) -> Result<PlatformDescriptor> {
    let settings = &profile.platform;

    let os = args
        .os
        .clone()
        .or_else(|| settings.os.clone())
        .or_else(|| Os::host().map(|os| os.as_str().to_string()))
        .context("no target OS given and the host OS is not supported\nhelp: pass --os")?;

    let arch = args
        .arch
        .clone()
        .or_else(|| settings.arch.clone())
        .or_else(|| Arch::host().map(|arch| arch.as_str().to_string()))
        .context("no target architecture given and the host architecture is not supported\nhelp: pass --arch")?;

    let compiler = args
        .compiler
        .clone()
        .or_else(|| settings.compiler.clone())
        .context("no compiler given\nhelp: pass --compiler or set `compiler` in a profile")?;

    let compiler_version = args
        .compiler_version
        .clone()
        .or_else(|| settings.compiler_version.clone())
        .context(
            "no compiler version given\nhelp: pass --compiler-version or set `compiler_version` in a profile",
        )?;

    let build_type = args
        .build_type
        .clone()
        .or_else(|| settings.build_type.clone())
        .unwrap_or_else(|| BuildType::default().as_str().to_string());

    let platform = PlatformDescriptor::parse(&os, &compiler, &compiler_version, &arch, &build_type)?;
    Ok(platform)
}

/// Print a value as pretty JSON.
pub fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value).context("failed to serialize output")?;
    println!("{}", json);
    Ok(())
}
