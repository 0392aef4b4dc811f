//! Build definition compiler.
//!
//! Turns a pruned option set and the platform into the flat key/value
//! definitions the external build tool consumes.
//!
//! # Algorithm
//!
//! 1. Start from the generation's fixed definitions (auxiliary targets off,
//!    language standard).
//! 2. Every option that survived pruning takes its value, or its schema
//!    default when the user did not set it, and must have an effect in the
//!    rule table. A surviving option without one means the table has a gap.
//! 3. Linkage and the crypto-backend toggle are emitted for every platform,
//!    whether or not their options survived.
//! 4. Platform decision tables add thread, linker and architecture flags.

use std::collections::BTreeMap;

use crate::core::definitions::{BuildDefinitions, DefinitionValue};
use crate::core::options::{LogLevel, OptionDomain, OptionName, OptionSpec, OptionValue};
use crate::core::platform::PlatformDescriptor;
use crate::resolver::deps::resolve_deps;
use crate::resolver::errors::ResolveError;
use crate::resolver::prune::PrunedOptions;
use crate::rules::{LogLevelEncoding, OptionEffect, RuleTable};

pub const BUILD_STATIC: &str = "CAF_BUILD_STATIC";
pub const BUILD_STATIC_ONLY: &str = "CAF_BUILD_STATIC_ONLY";
pub const NO_OPENSSL: &str = "CAF_NO_OPENSSL";
pub const LOG_LEVEL: &str = "CAF_LOG_LEVEL";
pub const POSITION_INDEPENDENT_CODE: &str = "CMAKE_POSITION_INDEPENDENT_CODE";
pub const THREAD_LIBS: &str = "CMAKE_THREAD_LIBS_INIT";

/// Compile the build definitions for a validated configuration.
pub fn compile(
    options: &PrunedOptions,
    platform: &PlatformDescriptor,
    rules: &RuleTable,
) -> Result<BuildDefinitions, ResolveError> {
    let mut defs = Accumulator::default();

    for (key, value) in &rules.fixed_definitions {
        defs.insert(key, value.clone(), "fixed definitions")?;
    }

    for spec in &rules.schema.options {
        if options.is_pruned(spec.name) {
            continue;
        }

        let value = options.options().get(spec.name).unwrap_or(spec.default);
        let effect = rules.effect_of(spec.name).ok_or_else(|| {
            ResolveError::InternalInconsistency {
                detail: format!(
                    "option `{}` survived pruning but {} has no build rule for it",
                    spec.name, rules.generation
                ),
            }
        })?;

        match effect {
            // Emitted below for every platform
            OptionEffect::Linkage | OptionEffect::CryptoBackend => {}
            OptionEffect::PositionIndependentCode => {
                let pic = expect_bool(spec.name, value)?;
                defs.insert(POSITION_INDEPENDENT_CODE, pic.into(), "option fPIC")?;
            }
            OptionEffect::LogLevel => {
                let level = expect_level(spec.name, value)?;
                if let Some(encoded) = encode_log_level(level, spec, &rules.log_level_encoding)? {
                    defs.insert(LOG_LEVEL, encoded, "option log_level")?;
                }
            }
        }
    }

    let is_static = options.is_static();
    defs.insert(BUILD_STATIC, is_static.into(), "linkage")?;
    defs.insert(BUILD_STATIC_ONLY, is_static.into(), "linkage")?;

    let deps = resolve_deps(options, &rules.dependency);
    defs.insert(NO_OPENSSL, deps.is_empty().into(), "crypto backend")?;

    if let Some(rule) = rules
        .thread_flags
        .iter()
        .find(|rule| rule.platform.matches(platform))
    {
        defs.insert(THREAD_LIBS, rule.flag.as_str().into(), "thread flags")?;
    }

    for rule in rules.linker.iter().filter(|r| r.platform.matches(platform)) {
        for (key, value) in &rule.definitions {
            defs.insert(key, value.clone(), "linker settings")?;
        }
    }

    for rule in rules.arch_overrides.iter().filter(|r| r.platform.matches(platform)) {
        for (key, value) in &rule.definitions {
            defs.insert(key, value.clone(), "architecture overrides")?;
        }
    }

    let defs = defs.finish();
    tracing::debug!("compiled {} build definitions for {}", defs.len(), platform);
    Ok(defs)
}

/// Encode a log level according to the generation's scheme. `None` means
/// the definition is left out.
fn encode_log_level(
    level: LogLevel,
    spec: &OptionSpec,
    encoding: &LogLevelEncoding,
) -> Result<Option<DefinitionValue>, ResolveError> {
    match encoding {
        LogLevelEncoding::Index => {
            let OptionDomain::Levels { levels } = &spec.domain else {
                return Err(ResolveError::InternalInconsistency {
                    detail: format!("option `{}` has no level ordering to index", spec.name),
                });
            };
            let index = levels.iter().position(|l| *l == level).ok_or_else(|| {
                ResolveError::InternalInconsistency {
                    detail: format!("log level `{}` is missing from the declared ordering", level),
                }
            })?;
            Ok(Some(DefinitionValue::Int(index as i64)))
        }
        LogLevelEncoding::Symbolic { disabled } if level == *disabled => Ok(None),
        LogLevelEncoding::Symbolic { .. } => Ok(Some(level.as_str().into())),
    }
}

fn expect_bool(name: OptionName, value: OptionValue) -> Result<bool, ResolveError> {
    match value {
        OptionValue::Bool(b) => Ok(b),
        other => Err(type_mismatch(name, other)),
    }
}

fn expect_level(name: OptionName, value: OptionValue) -> Result<LogLevel, ResolveError> {
    match value {
        OptionValue::Level(level) => Ok(level),
        other => Err(type_mismatch(name, other)),
    }
}

fn type_mismatch(name: OptionName, value: OptionValue) -> ResolveError {
    ResolveError::InternalInconsistency {
        detail: format!("build rule for `{}` cannot use the value `{}`", name, value),
    }
}

/// Collects definitions and refuses conflicting writes to the same key.
#[derive(Default)]
struct Accumulator {
    entries: BTreeMap<String, (DefinitionValue, &'static str)>,
}

impl Accumulator {
    fn insert(
        &mut self,
        key: &str,
        value: DefinitionValue,
        origin: &'static str,
    ) -> Result<(), ResolveError> {
        if let Some((existing, existing_origin)) = self.entries.get(key) {
            if *existing != value {
                return Err(ResolveError::InternalInconsistency {
                    detail: format!(
                        "`{}` is set to `{}` by {} and to `{}` by {}",
                        key, existing, existing_origin, value, origin
                    ),
                });
            }
            return Ok(());
        }

        self.entries.insert(key.to_string(), (value, origin));
        Ok(())
    }

    fn finish(self) -> BuildDefinitions {
        BuildDefinitions::from_entries(
            self.entries
                .into_iter()
                .map(|(key, (value, _))| (key, value))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::OptionSet;
    use crate::core::platform::Os;
    use crate::resolver::prune::prune;
    use crate::rules::{DefinitionRule, Generation, PlatformMatch};

    fn platform(os: &str, compiler: &str, version: &str, arch: &str) -> PlatformDescriptor {
        PlatformDescriptor::parse(os, compiler, version, arch, "release").unwrap()
    }

    fn compile_with(
        rules: &RuleTable,
        platform: &PlatformDescriptor,
        options: OptionSet,
    ) -> Result<BuildDefinitions, ResolveError> {
        let pruned = prune(&options, platform, &rules.schema)?;
        compile(&pruned, platform, rules)
    }

    fn value(defs: &BuildDefinitions, key: &str) -> Option<String> {
        defs.get(key).map(|v| v.render())
    }

    #[test]
    fn test_linux_static_with_openssl() {
        let rules = Generation::Gen3.rules();
        let options = OptionSet {
            shared: Some(false),
            openssl: Some(true),
            log_level: Some(LogLevel::None),
            ..Default::default()
        };
        let defs = compile_with(&rules, &platform("linux", "gcc", "4.9", "x86_64"), options).unwrap();

        assert_eq!(value(&defs, BUILD_STATIC).as_deref(), Some("ON"));
        assert_eq!(value(&defs, BUILD_STATIC_ONLY).as_deref(), Some("ON"));
        assert_eq!(value(&defs, NO_OPENSSL).as_deref(), Some("OFF"));
        assert_eq!(value(&defs, POSITION_INDEPENDENT_CODE).as_deref(), Some("ON"));
        assert_eq!(
            value(&defs, THREAD_LIBS).as_deref(),
            Some("-Wl,--no-as-needed -lpthread")
        );
        assert_eq!(
            value(&defs, "CMAKE_SHARED_LINKER_FLAGS").as_deref(),
            Some("-pthread")
        );
        assert!(!defs.contains(LOG_LEVEL));

        for key in ["CAF_NO_EXAMPLES", "CAF_NO_TOOLS", "CAF_NO_UNIT_TESTS", "CAF_NO_PYTHON"] {
            assert_eq!(value(&defs, key).as_deref(), Some("ON"), "{}", key);
        }
    }

    #[test]
    fn test_absent_linkage_means_static() {
        let rules = Generation::Gen3.rules();
        let defs =
            compile_with(&rules, &platform("linux", "gcc", "9", "x86_64"), OptionSet::default())
                .unwrap();

        assert_eq!(value(&defs, BUILD_STATIC).as_deref(), Some("ON"));
        // Absent openssl resolves no dependency, so the backend is disabled
        assert_eq!(value(&defs, NO_OPENSSL).as_deref(), Some("ON"));
    }

    #[test]
    fn test_shared_build() {
        let rules = Generation::Gen3.rules();
        let options = OptionSet {
            shared: Some(true),
            ..Default::default()
        };
        let defs = compile_with(&rules, &platform("linux", "gcc", "9", "x86_64"), options).unwrap();

        assert_eq!(value(&defs, BUILD_STATIC).as_deref(), Some("OFF"));
        assert_eq!(value(&defs, THREAD_LIBS).as_deref(), Some("-pthread"));
    }

    #[test]
    fn test_pruned_linkage_on_windows_x86_is_static() {
        let rules = Generation::Gen3.rules();
        let options = OptionSet {
            shared: Some(true),
            openssl: Some(true),
            ..Default::default()
        };
        let defs = compile_with(
            &rules,
            &platform("windows", "visual-studio", "16", "x86"),
            options,
        )
        .unwrap();

        assert_eq!(value(&defs, BUILD_STATIC).as_deref(), Some("ON"));
        assert_eq!(value(&defs, NO_OPENSSL).as_deref(), Some("ON"));
        assert!(!defs.contains(POSITION_INDEPENDENT_CODE));
        assert!(!defs.contains(THREAD_LIBS));
        assert!(!defs.contains("CMAKE_SHARED_LINKER_FLAGS"));
    }

    #[test]
    fn test_numeric_log_level_encoding() {
        let rules = Generation::Gen1.rules();
        let linux = platform("linux", "gcc", "5", "x86_64");

        let none = compile_with(&rules, &linux, OptionSet::default()).unwrap();
        assert_eq!(none.get(LOG_LEVEL), Some(&DefinitionValue::Int(5)));

        let debug = OptionSet {
            log_level: Some(LogLevel::Debug),
            ..Default::default()
        };
        let defs = compile_with(&rules, &linux, debug).unwrap();
        assert_eq!(defs.get(LOG_LEVEL), Some(&DefinitionValue::Int(3)));
    }

    #[test]
    fn test_symbolic_log_level_encoding() {
        let rules = Generation::Gen3.rules();
        let options = OptionSet {
            log_level: Some(LogLevel::Trace),
            ..Default::default()
        };
        let defs = compile_with(&rules, &platform("linux", "clang", "10", "x86_64"), options)
            .unwrap();

        assert_eq!(value(&defs, LOG_LEVEL).as_deref(), Some("TRACE"));
        assert_eq!(value(&defs, THREAD_LIBS).as_deref(), Some("-lpthread"));
    }

    #[test]
    fn test_pic_toggle_only_from_gen2() {
        let linux = platform("linux", "gcc", "9", "x86_64");
        let no_pic = OptionSet {
            fpic: Some(false),
            ..Default::default()
        };

        let gen2 = compile_with(&Generation::Gen2.rules(), &linux, no_pic).unwrap();
        assert_eq!(value(&gen2, POSITION_INDEPENDENT_CODE).as_deref(), Some("OFF"));

        let gen1 = compile_with(&Generation::Gen1.rules(), &linux, OptionSet::default()).unwrap();
        assert!(!gen1.contains(POSITION_INDEPENDENT_CODE));
        assert!(!gen1.contains(THREAD_LIBS));
    }

    #[test]
    fn test_macos_x86_architecture_override() {
        let rules = Generation::Gen1.rules();
        let defs = compile_with(
            &rules,
            &platform("macos", "apple-clang", "9.0", "x86"),
            OptionSet::default(),
        )
        .unwrap();
        assert_eq!(value(&defs, "CMAKE_OSX_ARCHITECTURES").as_deref(), Some("i386"));

        let defs64 = compile_with(
            &rules,
            &platform("macos", "apple-clang", "9.0", "x86_64"),
            OptionSet::default(),
        )
        .unwrap();
        assert!(!defs64.contains("CMAKE_OSX_ARCHITECTURES"));
    }

    #[test]
    fn test_surviving_option_without_rule_is_inconsistent() {
        let mut rules = Generation::Gen3.rules();
        rules.effects.retain(|e| e.option != OptionName::Fpic);

        let err = compile_with(&rules, &platform("linux", "gcc", "9", "x86_64"), OptionSet::default())
            .unwrap_err();
        assert!(matches!(err, ResolveError::InternalInconsistency { .. }));
        assert!(err.to_string().contains("fPIC"));

        // The gap does not matter where the option is pruned
        assert!(compile_with(
            &rules,
            &platform("windows", "visual-studio", "16", "x86_64"),
            OptionSet::default()
        )
        .is_ok());
    }

    #[test]
    fn test_conflicting_rules_are_inconsistent() {
        let mut rules = Generation::Gen3.rules();
        let mut definitions = BTreeMap::new();
        definitions.insert("CAF_NO_TOOLS".to_string(), DefinitionValue::Bool(false));
        rules.linker.push(DefinitionRule {
            platform: PlatformMatch::os(Os::Linux),
            definitions,
        });

        let err = compile_with(&rules, &platform("linux", "gcc", "9", "x86_64"), OptionSet::default())
            .unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("CAF_NO_TOOLS"), "got: {}", msg);
        assert!(msg.contains("linker settings"), "got: {}", msg);
    }

    #[test]
    fn test_compile_is_deterministic() {
        let rules = Generation::Gen2.rules();
        let linux = platform("linux", "gcc", "7", "x86_64");
        let options = OptionSet {
            shared: Some(true),
            openssl: Some(true),
            log_level: Some(LogLevel::Info),
            fpic: Some(true),
        };

        let a = compile_with(&rules, &linux, options.clone()).unwrap();
        let b = compile_with(&rules, &linux, options).unwrap();
        assert_eq!(a.to_cmake_args(), b.to_cmake_args());
    }
}
