//! Configuration resolution operations.
//!
//! Runs the full pipeline for one platform and one option set:
//! schema check and pruning, toolchain validation, dependency resolution and
//! the manifest. Build definitions are compiled lazily and cached, because
//! both the build phase and the install phase need them.

use std::cell::{Cell, RefCell};

use serde::Serialize;

use crate::builder::cmake::{select_patch, CMakeInvocation};
use crate::builder::definitions::compile;
use crate::builder::manifest::build_manifest;
use crate::core::definitions::BuildDefinitions;
use crate::core::dependency::DependencySet;
use crate::core::manifest::Manifest;
use crate::core::options::{OptionName, OptionSet, RawOptions};
use crate::core::platform::PlatformDescriptor;
use crate::resolver::{prune, resolve_deps, validate, PrunedOptions, ResolveError};
use crate::rules::RuleTable;
use crate::util::hash::Fingerprint;

/// Turn raw front-end input into a typed option set.
///
/// With `with_defaults`, every option the input leaves out gets its declared
/// default before pruning, the way a recipe's default options apply.
pub fn options_from_raw(
    raw: &RawOptions,
    rules: &RuleTable,
    with_defaults: bool,
) -> Result<OptionSet, ResolveError> {
    let options = rules.schema.parse(raw)?;
    if with_defaults {
        Ok(rules.schema.fill_defaults(options))
    } else {
        Ok(options)
    }
}

/// Resolve a configuration against a rule table.
pub fn resolve<'r>(
    platform: PlatformDescriptor,
    options: &OptionSet,
    rules: &'r RuleTable,
) -> Result<Resolution<'r>, ResolveError> {
    let stages = Stages::run(&platform, options, rules)?;
    Ok(Resolution {
        rules,
        platform,
        stages,
        definitions: DefinitionCache::default(),
    })
}

/// A validated configuration.
///
/// Only a configuration whose toolchain was accepted can exist as a
/// `Resolution`, so nothing downstream ever sees a rejected one.
#[derive(Debug)]
pub struct Resolution<'r> {
    rules: &'r RuleTable,
    platform: PlatformDescriptor,
    stages: Stages,
    definitions: DefinitionCache,
}

impl<'r> Resolution<'r> {
    pub fn rules(&self) -> &RuleTable {
        self.rules
    }

    pub fn platform(&self) -> &PlatformDescriptor {
        &self.platform
    }

    /// Options after pruning.
    pub fn options(&self) -> &PrunedOptions {
        &self.stages.options
    }

    /// Options removed for this platform.
    pub fn pruned(&self) -> &[OptionName] {
        self.stages.options.pruned()
    }

    pub fn deps(&self) -> &DependencySet {
        &self.stages.deps
    }

    pub fn manifest(&self) -> &Manifest {
        &self.stages.manifest
    }

    /// Deterministic identifier of the resolved configuration.
    pub fn package_id(&self) -> &str {
        &self.stages.package_id
    }

    /// Source patch for this platform, if the generation has one.
    pub fn patch(&self) -> Option<String> {
        select_patch(&self.platform, self.rules)
    }

    /// Build definitions, compiled on first use.
    pub fn definitions(&self) -> Result<BuildDefinitions, ResolveError> {
        self.definitions.get_or_compute(&self.stages.package_id, || {
            compile(&self.stages.options, &self.platform, self.rules)
        })
    }

    /// Number of times the definitions were compiled.
    pub fn definitions_compiled(&self) -> usize {
        self.definitions.compiled.get()
    }

    /// Everything the build step needs.
    pub fn build_invocation(&self) -> Result<CMakeInvocation, ResolveError> {
        Ok(CMakeInvocation {
            definitions: self.definitions()?,
            build_type: self.platform.build_type(),
            shared: !self.stages.options.is_static(),
            patch: self.patch(),
        })
    }

    /// Re-run the pipeline for new options on the same platform.
    ///
    /// On error the resolution is left unchanged.
    pub fn reconfigure(&mut self, options: &OptionSet) -> Result<(), ResolveError> {
        let stages = Stages::run(&self.platform, options, self.rules)?;
        if stages.package_id != self.stages.package_id {
            tracing::debug!("configuration changed, package id is now {}", stages.package_id);
        }
        self.stages = stages;
        Ok(())
    }

    /// Serializable view of the resolution.
    pub fn summary(&self) -> Result<ResolutionSummary, ResolveError> {
        Ok(ResolutionSummary {
            package_id: self.package_id().to_string(),
            generation: self.rules.generation.clone(),
            platform: self.platform.clone(),
            options: self.stages.options.options().clone(),
            pruned: self.pruned().to_vec(),
            dependencies: self.stages.deps.clone(),
            definitions: self.definitions()?,
            manifest: self.stages.manifest.clone(),
            patch: self.patch(),
        })
    }
}

/// Serializable view of a [`Resolution`].
#[derive(Debug, Clone, Serialize)]
pub struct ResolutionSummary {
    pub package_id: String,
    pub generation: String,
    pub platform: PlatformDescriptor,
    pub options: OptionSet,
    pub pruned: Vec<OptionName>,
    pub dependencies: DependencySet,
    pub definitions: BuildDefinitions,
    pub manifest: Manifest,
    pub patch: Option<String>,
}

/// Results of the eager pipeline stages.
#[derive(Debug, Clone)]
struct Stages {
    options: PrunedOptions,
    deps: DependencySet,
    manifest: Manifest,
    package_id: String,
}

impl Stages {
    fn run(
        platform: &PlatformDescriptor,
        options: &OptionSet,
        rules: &RuleTable,
    ) -> Result<Self, ResolveError> {
        tracing::debug!("resolving {} with {}", platform, rules.generation);

        let options = prune(options, platform, &rules.schema)?;
        if !options.pruned().is_empty() {
            let names: Vec<&str> = options.pruned().iter().map(|n| n.as_str()).collect();
            tracing::info!("Pruned {} for {}", names.join(", "), platform);
        }

        validate(platform, rules)?;

        let deps = resolve_deps(&options, &rules.dependency);
        let manifest = build_manifest(&options, platform, &deps, rules);
        let package_id = package_id(platform, &options, rules);

        tracing::info!(
            "Resolved {} ({} dependencies, {} artifacts)",
            platform,
            deps.len(),
            manifest.artifacts().len()
        );

        Ok(Stages {
            options,
            deps,
            manifest,
            package_id,
        })
    }
}

fn package_id(platform: &PlatformDescriptor, options: &PrunedOptions, rules: &RuleTable) -> String {
    let mut fp = Fingerprint::new();
    fp.update_str(&rules.generation)
        .update_pair("os", platform.os().as_str())
        .update_pair("compiler", platform.compiler().as_str())
        .update_pair("compiler.version", platform.compiler_version().as_str())
        .update_pair("arch", platform.arch().as_str())
        .update_pair("build_type", platform.build_type().as_str());

    for (name, value) in options.options().iter() {
        fp.update_pair(name.as_str(), &value.to_string());
    }

    fp.finish()
}

/// Compute-once cache for build definitions, keyed by package id.
#[derive(Debug, Default)]
struct DefinitionCache {
    entry: RefCell<Option<(String, BuildDefinitions)>>,
    compiled: Cell<usize>,
}

impl DefinitionCache {
    fn get_or_compute(
        &self,
        key: &str,
        compute: impl FnOnce() -> Result<BuildDefinitions, ResolveError>,
    ) -> Result<BuildDefinitions, ResolveError> {
        if let Some((cached_key, defs)) = self.entry.borrow().as_ref() {
            if cached_key == key {
                return Ok(defs.clone());
            }
        }

        let defs = compute()?;
        self.compiled.set(self.compiled.get() + 1);
        *self.entry.borrow_mut() = Some((key.to_string(), defs.clone()));
        Ok(defs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::LogLevel;
    use crate::rules::Generation;

    fn platform(os: &str, compiler: &str, version: &str, arch: &str) -> PlatformDescriptor {
        PlatformDescriptor::parse(os, compiler, version, arch, "release").unwrap()
    }

    fn example_options() -> OptionSet {
        OptionSet {
            shared: Some(false),
            openssl: Some(true),
            log_level: Some(LogLevel::None),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_linux_example() {
        let rules = Generation::Gen3.rules();
        let resolution = resolve(
            platform("linux", "gcc", "4.9", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap();

        assert_eq!(resolution.deps().len(), 1);
        assert_eq!(
            resolution.manifest().artifacts(),
            ["caf_core_static", "caf_io_static", "caf_openssl_static"]
        );
        assert!(resolution
            .manifest()
            .system_libs()
            .contains(&"pthread".to_string()));
        assert!(resolution.pruned().is_empty());
        assert_eq!(resolution.package_id().len(), 64);
    }

    #[test]
    fn test_resolve_rejects_old_gcc() {
        let rules = Generation::Gen3.rules();
        let err = resolve(
            platform("linux", "gcc", "4.7", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap_err();

        assert!(err.is_rejection());
        assert!(err.to_string().contains("4.8"));
    }

    #[test]
    fn test_windows_x86_prunes_before_validation() {
        let rules = Generation::Gen1.rules();
        let resolution = resolve(
            platform("windows", "visual-studio", "15", "x86"),
            &example_options(),
            &rules,
        )
        .unwrap();

        assert_eq!(resolution.pruned(), [OptionName::Shared, OptionName::Openssl]);
        assert!(resolution.deps().is_empty());
        assert!(matches!(
            resolution.options().get(OptionName::Openssl),
            Err(ResolveError::PrunedOption { .. })
        ));
    }

    #[test]
    fn test_schema_violation_stops_pipeline() {
        let rules = Generation::Gen1.rules();
        let options = OptionSet {
            fpic: Some(true),
            ..Default::default()
        };
        let err = resolve(platform("linux", "gcc", "9", "x86_64"), &options, &rules).unwrap_err();
        assert!(matches!(err, ResolveError::SchemaViolation { .. }));
    }

    #[test]
    fn test_package_id_is_deterministic() {
        let rules = Generation::Gen3.rules();
        let linux = platform("linux", "gcc", "9", "x86_64");

        let a = resolve(linux.clone(), &example_options(), &rules).unwrap();
        let b = resolve(linux.clone(), &example_options(), &rules).unwrap();
        assert_eq!(a.package_id(), b.package_id());

        let mut shared = example_options();
        shared.shared = Some(true);
        let c = resolve(linux, &shared, &rules).unwrap();
        assert_ne!(a.package_id(), c.package_id());

        let gen2 = Generation::Gen2.rules();
        let d = resolve(platform("linux", "gcc", "9", "x86_64"), &example_options(), &gen2)
            .unwrap();
        assert_ne!(a.package_id(), d.package_id());
    }

    #[test]
    fn test_definitions_computed_once() {
        let rules = Generation::Gen3.rules();
        let resolution = resolve(
            platform("linux", "gcc", "9", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap();

        assert_eq!(resolution.definitions_compiled(), 0);
        let build = resolution.build_invocation().unwrap();
        let install = resolution.build_invocation().unwrap();
        assert_eq!(build, install);
        assert_eq!(resolution.definitions_compiled(), 1);
    }

    #[test]
    fn test_reconfigure_recomputes_definitions() {
        let rules = Generation::Gen3.rules();
        let mut resolution = resolve(
            platform("linux", "gcc", "9", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap();

        let before = resolution.definitions().unwrap();
        let old_id = resolution.package_id().to_string();

        let mut shared = example_options();
        shared.shared = Some(true);
        resolution.reconfigure(&shared).unwrap();

        assert_ne!(resolution.package_id(), old_id);
        let after = resolution.definitions().unwrap();
        assert_eq!(resolution.definitions_compiled(), 2);
        assert_ne!(before, after);
        assert_eq!(resolution.manifest().artifacts()[0], "caf_core");
    }

    #[test]
    fn test_failed_reconfigure_keeps_resolution() {
        let rules = Generation::Gen1.rules();
        let mut resolution = resolve(
            platform("linux", "gcc", "9", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap();
        let id = resolution.package_id().to_string();

        let invalid = OptionSet {
            fpic: Some(false),
            ..Default::default()
        };
        assert!(resolution.reconfigure(&invalid).is_err());
        assert_eq!(resolution.package_id(), id);
    }

    #[test]
    fn test_options_from_raw_defaults() {
        let rules = Generation::Gen1.rules();
        let raw: RawOptions = [("shared".to_string(), "True".to_string())]
            .into_iter()
            .collect();

        let bare = options_from_raw(&raw, &rules, false).unwrap();
        assert_eq!(bare.openssl, None);

        let filled = options_from_raw(&raw, &rules, true).unwrap();
        assert_eq!(filled.shared, Some(true));
        assert_eq!(filled.openssl, Some(true));
        assert_eq!(filled.log_level, Some(LogLevel::None));
    }

    #[test]
    fn test_summary_serializes() {
        let rules = Generation::Gen3.rules();
        let resolution = resolve(
            platform("linux", "gcc", "9", "x86_64"),
            &example_options(),
            &rules,
        )
        .unwrap();

        let json = serde_json::to_value(resolution.summary().unwrap()).unwrap();
        assert_eq!(json["generation"], "gen3");
        assert_eq!(json["definitions"]["CAF_BUILD_STATIC"], true);
        assert_eq!(json["manifest"]["artifacts"][2], "caf_openssl_static");
    }
}
