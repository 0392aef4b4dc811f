//! Profile file support.
//!
//! A profile pre-selects the platform, the option values and the rule
//! generation, so they do not have to be repeated on every invocation:
//! - Global: `~/.caf-recipe/profile.toml` - User-wide defaults
//! - Project: `.caf-recipe/profile.toml` - Project-specific overrides
//!
//! Project profiles take precedence over the global one, and an explicit
//! `--profile` file over both. Command-line flags win over everything.
//!
//! ```toml
//! generation = 3
//!
//! [platform]
//! os = "linux"
//! compiler = "gcc"
//! compiler_version = "9"
//!
//! [options]
//! shared = false
//! log_level = "DEBUG"
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::core::options::{canonicalize, OptionName, RawOptions};
use crate::resolver::errors::ResolveError;
use crate::rules::Generation;

/// Directory name used for both the global and the project profile.
pub const CONFIG_DIR: &str = ".caf-recipe";

/// Profile file name.
pub const PROFILE_FILE: &str = "profile.toml";

/// A resolution profile.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Profile {
    /// Rule generation to resolve with
    pub generation: Option<Generation>,

    /// Custom rule table, overriding the generation's built-in one
    pub rules: Option<PathBuf>,

    /// Platform settings
    pub platform: PlatformSettings,

    /// Option values, as written in the file
    pub options: BTreeMap<String, toml::Value>,
}

/// Platform fields of a profile. Parsed when the descriptor is built.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformSettings {
    pub os: Option<String>,
    pub compiler: Option<String>,
    pub compiler_version: Option<String>,
    pub arch: Option<String>,
    pub build_type: Option<String>,
}

impl PlatformSettings {
    /// Merge another settings block into this one (other takes precedence).
    pub fn merge(&mut self, other: PlatformSettings) {
        if other.os.is_some() {
            self.os = other.os;
        }
        if other.compiler.is_some() {
            self.compiler = other.compiler;
        }
        if other.compiler_version.is_some() {
            self.compiler_version = other.compiler_version;
        }
        if other.arch.is_some() {
            self.arch = other.arch;
        }
        if other.build_type.is_some() {
            self.build_type = other.build_type;
        }
    }
}

impl Profile {
    /// Load a profile from a file.
    ///
    /// A relative `rules` path is taken relative to the profile's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read profile: {}", path.display()))?;

        let mut profile: Profile = toml::from_str(&contents)
            .with_context(|| format!("failed to parse profile: {}", path.display()))?;

        if let (Some(rules), Some(dir)) = (profile.rules.as_mut(), path.parent()) {
            if rules.is_relative() {
                *rules = dir.join(&*rules);
            }
        }

        Ok(profile)
    }

    /// Load a profile with fallback to defaults if the file is missing or
    /// broken.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load profile from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another profile into this one (other takes precedence).
    ///
    /// `generation` and `rules` together select the rule table, so a profile
    /// that sets either replaces both. Options override per option, whatever
    /// the spelling of the key.
    pub fn merge(&mut self, other: Profile) {
        if other.generation.is_some() || other.rules.is_some() {
            self.generation = other.generation;
            self.rules = other.rules;
        }
        self.platform.merge(other.platform);

        for (key, value) in other.options {
            if let Ok(name) = key.parse::<OptionName>() {
                self.options
                    .retain(|existing, _| existing.parse::<OptionName>().ok() != Some(name));
            }
            self.options.insert(key, value);
        }
    }

    /// Option values as the raw strings the option schema parses, keyed by
    /// canonical option name.
    pub fn raw_options(&self) -> Result<RawOptions, ResolveError> {
        canonicalize(self.options.iter().map(|(key, value)| {
            let raw = match value {
                toml::Value::String(s) => s.clone(),
                toml::Value::Boolean(b) => b.to_string(),
                other => other.to_string(),
            };
            (key.clone(), raw)
        }))
    }
}

/// Load the merged profile from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project profile (.caf-recipe/profile.toml)
/// 2. Global profile (~/.caf-recipe/profile.toml)
/// 3. Defaults
pub fn load_profiles(global_path: Option<&Path>, project_path: &Path) -> Profile {
    let mut profile = Profile::default();

    if let Some(global_path) = global_path {
        profile.merge(Profile::load_or_default(global_path));
    }

    profile.merge(Profile::load_or_default(project_path));

    profile
}

/// Get the global config directory (~/.caf-recipe).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR))
}

/// Get the global profile path (~/.caf-recipe/profile.toml).
pub fn global_profile_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join(PROFILE_FILE))
}

/// Get the project profile path (.caf-recipe/profile.toml).
pub fn project_profile_path(project_root: &Path) -> PathBuf {
    project_root.join(CONFIG_DIR).join(PROFILE_FILE)
}
