//! Manifest builder.

use crate::core::dependency::DependencySet;
use crate::core::manifest::Manifest;
use crate::core::platform::PlatformDescriptor;
use crate::resolver::prune::PrunedOptions;
use crate::rules::RuleTable;

/// Compute the artifacts and system libraries of a validated configuration.
///
/// Core artifacts come first, in link order, followed by the optional
/// backend artifact when a dependency was resolved. Every artifact carries
/// the static suffix in static builds. The toolchain is not re-checked.
pub fn build_manifest(
    options: &PrunedOptions,
    platform: &PlatformDescriptor,
    deps: &DependencySet,
    rules: &RuleTable,
) -> Manifest {
    let naming = &rules.artifacts;
    let suffix = if options.is_static() {
        naming.static_suffix.as_str()
    } else {
        ""
    };

    let mut artifacts: Vec<String> = naming
        .core
        .iter()
        .map(|name| format!("{}{}", name, suffix))
        .collect();

    if !deps.is_empty() {
        artifacts.push(format!("{}{}", naming.optional, suffix));
    }

    let system_libs = rules
        .system_libs
        .iter()
        .filter(|rule| rule.platform.matches(platform))
        .flat_map(|rule| rule.libs.iter().cloned())
        .collect();

    Manifest::new(artifacts, system_libs)
}
