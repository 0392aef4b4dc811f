//! Option pruning.
//!
//! Options that have no meaning on a platform are removed, never coerced to
//! a default. Defaults for options that survive are applied later by the
//! definition compiler.

use serde::Serialize;

use crate::core::options::{OptionName, OptionSchema, OptionSet, OptionValue};
use crate::core::platform::PlatformDescriptor;
use crate::resolver::errors::ResolveError;

/// An option set that has been pruned for one platform.
///
/// Remembers which declared options were removed so that a later lookup of
/// one of them fails instead of quietly reading as absent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrunedOptions {
    options: OptionSet,
    pruned: Vec<OptionName>,
    #[serde(skip)]
    platform: String,
}

impl PrunedOptions {
    /// The surviving options.
    pub fn options(&self) -> &OptionSet {
        &self.options
    }

    /// Declared options removed for this platform, in schema order.
    pub fn pruned(&self) -> &[OptionName] {
        &self.pruned
    }

    pub fn is_pruned(&self, name: OptionName) -> bool {
        self.pruned.contains(&name)
    }

    /// Look up an option. Referencing an option that was pruned is an error.
    pub fn get(&self, name: OptionName) -> Result<Option<OptionValue>, ResolveError> {
        if self.is_pruned(name) {
            return Err(ResolveError::PrunedOption {
                option: name,
                platform: self.platform.clone(),
            });
        }
        Ok(self.options.get(name))
    }

    /// Whether a boolean option is present and true. Pruned and absent
    /// options read as disabled.
    pub fn enabled(&self, name: OptionName) -> bool {
        matches!(self.options.get(name), Some(OptionValue::Bool(true)))
    }

    /// Static linkage unless `shared` is present and true.
    pub fn is_static(&self) -> bool {
        !self.enabled(OptionName::Shared)
    }
}

/// Remove every option the schema excludes on this platform.
///
/// The set is checked against the schema first. Options absent from the
/// input stay absent. Pruning an already pruned set for the same platform
/// yields the same set.
pub fn prune(
    options: &OptionSet,
    platform: &PlatformDescriptor,
    schema: &OptionSchema,
) -> Result<PrunedOptions, ResolveError> {
    schema.check(options)?;

    let mut kept = options.clone();
    let mut pruned = Vec::new();

    for spec in &schema.options {
        if spec.is_excluded(platform) {
            if kept.remove(spec.name) {
                tracing::debug!("pruned option `{}` for {}", spec.name, platform);
            }
            pruned.push(spec.name);
        }
    }

    Ok(PrunedOptions {
        options: kept,
        pruned,
        platform: platform.to_string(),
    })
}
