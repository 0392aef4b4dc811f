//! Conditional dependency resolution.

use crate::core::dependency::DependencySet;
use crate::resolver::prune::PrunedOptions;
use crate::rules::DependencyPin;

/// Resolve the external dependencies required by the options.
///
/// The pinned requirement is included only when its gating option survived
/// pruning and is true. Nothing else changes the requirement.
pub fn resolve_deps(options: &PrunedOptions, pin: &DependencyPin) -> DependencySet {
    let mut deps = DependencySet::new();

    if options.enabled(pin.option) {
        tracing::debug!("`{}` enabled, requiring {}", pin.option, pin.requirement);
        deps.insert(pin.requirement.clone());
    }

    deps
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::OptionSet;
    use crate::core::platform::PlatformDescriptor;
    use crate::resolver::prune::prune;
    use crate::rules::Generation;

    fn deps_for(generation: Generation, os: &str, arch: &str, openssl: Option<bool>) -> DependencySet {
        let rules = generation.rules();
        let platform = PlatformDescriptor::parse(os, "gcc", "9", arch, "release").unwrap();
        let options = OptionSet {
            openssl,
            ..Default::default()
        };
        let pruned = prune(&options, &platform, &rules.schema).unwrap();
        resolve_deps(&pruned, &rules.dependency)
    }

    #[test]
    fn test_enabled_option_requires_pinned_dependency() {
        let deps = deps_for(Generation::Gen3, "linux", "x86_64", Some(true));
        assert_eq!(deps.len(), 1);

        let dep = deps.iter().next().unwrap();
        assert_eq!(dep.to_string(), "openssl/1.1.1g");
    }

    #[test]
    fn test_disabled_or_absent_option_requires_nothing() {
        assert!(deps_for(Generation::Gen3, "linux", "x86_64", Some(false)).is_empty());
        assert!(deps_for(Generation::Gen3, "linux", "x86_64", None).is_empty());
    }

    #[test]
    fn test_pruned_option_requires_nothing() {
        assert!(deps_for(Generation::Gen1, "linux", "x86", Some(true)).is_empty());
    }

    #[test]
    fn test_pin_follows_generation() {
        let gen1 = deps_for(Generation::Gen1, "linux", "x86_64", Some(true));
        let gen2 = deps_for(Generation::Gen2, "linux", "x86_64", Some(true));

        assert_eq!(
            gen1.iter().next().unwrap().to_string(),
            "OpenSSL/1.0.2o@conan/stable"
        );
        assert_eq!(gen2.iter().next().unwrap().to_string(), "openssl/1.1.1d");
    }
}
