//! Rule generations.
//!
//! A rule generation is a frozen bundle of every table the resolver
//! consults: the option schema, toolchain rules, the dependency pin, the
//! log-level encoding and the tables that drive build definitions and the
//! manifest. One generation is pinned per resolution; the algorithms that
//! read the tables do not change between generations.
//!
//! Tables are plain data and round-trip through TOML, so a custom table can
//! be loaded from disk with [`RuleTable::load`].

use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result};
use semver::{Comparator, Op, Prerelease, VersionReq};
use serde::{Deserialize, Serialize};

use crate::core::definitions::DefinitionValue;
use crate::core::dependency::DependencyRequirement;
use crate::core::options::{LogLevel, OptionDomain, OptionName, OptionSchema, OptionValue};
use crate::core::platform::{Arch, CompilerName, Os, PlatformDescriptor};
use crate::resolver::errors::ResolveError;
use crate::resolver::version::version_matches;

mod generations;

/// Identifier of a built-in rule generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum Generation {
    Gen1,
    Gen2,
    Gen3,
}

impl Generation {
    pub const ALL: [Generation; 3] = [Generation::Gen1, Generation::Gen2, Generation::Gen3];

    pub fn latest() -> Self {
        Generation::Gen3
    }

    pub fn number(&self) -> u8 {
        match self {
            Generation::Gen1 => 1,
            Generation::Gen2 => 2,
            Generation::Gen3 => 3,
        }
    }

    /// The frozen rule table of this generation.
    pub fn rules(&self) -> RuleTable {
        match self {
            Generation::Gen1 => generations::gen1(),
            Generation::Gen2 => generations::gen2(),
            Generation::Gen3 => generations::gen3(),
        }
    }
}

impl Default for Generation {
    fn default() -> Self {
        Generation::latest()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gen{}", self.number())
    }
}

impl TryFrom<u8> for Generation {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Generation::Gen1),
            2 => Ok(Generation::Gen2),
            3 => Ok(Generation::Gen3),
            _ => Err(format!("unknown rule generation {}, valid: 1, 2, 3", value)),
        }
    }
}

impl From<Generation> for u8 {
    fn from(value: Generation) -> Self {
        value.number()
    }
}

impl FromStr for Generation {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.trim().trim_start_matches("gen");
        let number: u8 = digits
            .parse()
            .map_err(|_| format!("invalid rule generation `{}`", s))?;
        Generation::try_from(number)
    }
}

/// What a matching toolchain rule decides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    Accept,
    Reject,
}

/// A predicate over compiler, version window and optional architecture.
///
/// `reason` may contain `{version}`, which is replaced with the compiler
/// version as the user wrote it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainRule {
    pub compiler: CompilerName,
    pub versions: VersionReq,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
    pub verdict: Verdict,
    pub reason: String,
}

impl ToolchainRule {
    /// Reject versions below `major.minor`.
    pub fn minimum(compiler: CompilerName, major: u64, minor: u64, reason: &str) -> Self {
        ToolchainRule {
            compiler,
            versions: below(major, minor),
            arch: None,
            verdict: Verdict::Reject,
            reason: reason.to_string(),
        }
    }

    /// Reject a version window on one architecture.
    pub fn exception(compiler: CompilerName, versions: VersionReq, arch: Arch, reason: &str) -> Self {
        ToolchainRule {
            compiler,
            versions,
            arch: Some(arch),
            verdict: Verdict::Reject,
            reason: reason.to_string(),
        }
    }

    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        self.compiler == platform.compiler()
            && self.arch.map_or(true, |arch| arch == platform.arch())
            && version_matches(&self.versions, platform.compiler_version().version())
    }

    /// The reason with the platform's compiler version substituted.
    pub fn render_reason(&self, platform: &PlatformDescriptor) -> String {
        self.reason
            .replace("{version}", platform.compiler_version().as_str())
    }
}

/// How the log-level option is encoded into the build definitions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "scheme", rename_all = "lowercase")]
pub enum LogLevelEncoding {
    /// Position of the level in the schema's declared ordering.
    Index,
    /// The level's name; the definition is omitted for `disabled`.
    Symbolic { disabled: LogLevel },
}

/// The build-definition effect an option has.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum OptionEffect {
    Linkage,
    PositionIndependentCode,
    LogLevel,
    CryptoBackend,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EffectRule {
    pub option: OptionName,
    pub effect: OptionEffect,
}

/// The optional dependency and the boolean option that gates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DependencyPin {
    pub option: OptionName,
    pub requirement: DependencyRequirement,
}

/// Platform filter shared by the decision tables below. Unset fields match
/// anything.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformMatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compiler: Option<CompilerName>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub versions: Option<VersionReq>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
}

impl PlatformMatch {
    pub fn os(os: Os) -> Self {
        PlatformMatch {
            os: Some(os),
            ..Default::default()
        }
    }

    pub fn compiler(mut self, compiler: CompilerName) -> Self {
        self.compiler = Some(compiler);
        self
    }

    pub fn versions(mut self, versions: VersionReq) -> Self {
        self.versions = Some(versions);
        self
    }

    pub fn arch(mut self, arch: Arch) -> Self {
        self.arch = Some(arch);
        self
    }

    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        self.os.map_or(true, |os| os == platform.os())
            && self.compiler.map_or(true, |c| c == platform.compiler())
            && self.arch.map_or(true, |a| a == platform.arch())
            && self.versions.as_ref().map_or(true, |v| {
                version_matches(v, platform.compiler_version().version())
            })
    }
}

/// Thread library flag for `CMAKE_THREAD_LIBS_INIT`. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreadFlagRule {
    #[serde(rename = "when")]
    pub platform: PlatformMatch,
    pub flag: String,
}

/// Extra definitions added on matching platforms. Every match applies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefinitionRule {
    #[serde(rename = "when")]
    pub platform: PlatformMatch,
    pub definitions: BTreeMap<String, DefinitionValue>,
}

/// A source patch the build step must apply first. First match wins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchRule {
    #[serde(rename = "when")]
    pub platform: PlatformMatch,
    pub patch: String,
}

/// System libraries consumers must link on matching platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemLibsRule {
    #[serde(rename = "when")]
    pub platform: PlatformMatch,
    pub libs: Vec<String>,
}

/// Artifact naming.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactRules {
    /// Always-built libraries, in link order.
    pub core: Vec<String>,
    /// Library built only when the optional dependency is resolved.
    pub optional: String,
    /// Suffix appended to every artifact in static builds.
    pub static_suffix: String,
}

/// A complete, frozen rule generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RuleTable {
    /// Label of the generation, for display and fingerprints.
    pub generation: String,
    pub schema: OptionSchema,
    pub toolchain: Vec<ToolchainRule>,
    pub dependency: DependencyPin,
    pub log_level_encoding: LogLevelEncoding,
    pub effects: Vec<EffectRule>,
    /// Definitions every build gets, independent of options.
    pub fixed_definitions: BTreeMap<String, DefinitionValue>,
    #[serde(default)]
    pub thread_flags: Vec<ThreadFlagRule>,
    #[serde(default)]
    pub linker: Vec<DefinitionRule>,
    #[serde(default)]
    pub arch_overrides: Vec<DefinitionRule>,
    #[serde(default)]
    pub patches: Vec<PatchRule>,
    pub artifacts: ArtifactRules,
    #[serde(default)]
    pub system_libs: Vec<SystemLibsRule>,
}

impl RuleTable {
    /// Load a rule table from a TOML file and check it.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read rule table: {}", path.display()))?;

        let table: RuleTable = toml::from_str(&contents)
            .with_context(|| format!("failed to parse rule table: {}", path.display()))?;

        table
            .check()
            .with_context(|| format!("rule table rejected: {}", path.display()))?;

        tracing::debug!("loaded rule table `{}` from {}", table.generation, path.display());
        Ok(table)
    }

    /// Serialize as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("failed to serialize rule table")
    }

    /// The effect declared for an option.
    pub fn effect_of(&self, option: OptionName) -> Option<OptionEffect> {
        self.effects
            .iter()
            .find(|rule| rule.option == option)
            .map(|rule| rule.effect)
    }

    /// Whether any toolchain rule mentions this compiler family.
    pub fn knows_compiler(&self, compiler: CompilerName) -> bool {
        self.toolchain.iter().any(|rule| rule.compiler == compiler)
    }

    /// Check the table for contradictions.
    ///
    /// Rejects duplicate option declarations, defaults outside their domain,
    /// exclusions without a predicate and toolchain rules that share a
    /// (compiler, arch, versions) key but disagree on the verdict.
    pub fn check(&self) -> Result<(), ResolveError> {
        let mut seen = HashSet::new();
        for spec in &self.schema.options {
            if !seen.insert(spec.name) {
                return Err(invalid(format!("option `{}` is declared twice", spec.name)));
            }
            if spec.name.is_bool() != matches!(spec.domain, OptionDomain::Bool) {
                return Err(invalid(format!(
                    "option `{}` has a domain of the wrong kind",
                    spec.name
                )));
            }
            if !spec.domain.contains(&spec.default) {
                return Err(invalid(format!(
                    "default `{}` of option `{}` is outside its domain",
                    spec.default, spec.name
                )));
            }
            if spec
                .excluded_on
                .iter()
                .any(|e| e.os.is_none() && e.arch.is_none())
            {
                return Err(invalid(format!(
                    "option `{}` has an exclusion that matches every platform",
                    spec.name
                )));
            }
        }

        let mut verdicts: HashMap<(CompilerName, Option<Arch>, String), Verdict> = HashMap::new();
        for rule in &self.toolchain {
            let key = (rule.compiler, rule.arch, rule.versions.to_string());
            match verdicts.get(&key) {
                Some(existing) if *existing != rule.verdict => {
                    return Err(invalid(format!(
                        "contradictory toolchain rules for {} {}{}",
                        rule.compiler,
                        rule.versions,
                        rule.arch.map(|a| format!(" on {}", a)).unwrap_or_default()
                    )));
                }
                _ => {
                    verdicts.insert(key, rule.verdict);
                }
            }
        }

        if !self.dependency.option.is_bool() {
            return Err(invalid(format!(
                "dependency gate `{}` is not a boolean option",
                self.dependency.option
            )));
        }
        if self.schema.spec(self.dependency.option).is_none() {
            return Err(invalid(format!(
                "dependency gate `{}` is not declared in the schema",
                self.dependency.option
            )));
        }

        if let LogLevelEncoding::Symbolic { disabled } = &self.log_level_encoding {
            let declared = self
                .schema
                .spec(OptionName::LogLevel)
                .map_or(false, |spec| spec.domain.contains(&OptionValue::Level(*disabled)));
            if !declared {
                return Err(invalid(format!(
                    "disabled log level `{}` is not in the log_level domain",
                    disabled
                )));
            }
        }

        Ok(())
    }
}

fn invalid(detail: String) -> ResolveError {
    ResolveError::InvalidRuleTable { detail }
}

/// Versions strictly below `major.minor`.
pub fn below(major: u64, minor: u64) -> VersionReq {
    window(Op::Less, major, minor)
}

/// Versions strictly above every `major.minor.x` release.
pub fn above(major: u64, minor: u64) -> VersionReq {
    window(Op::Greater, major, minor)
}

fn window(op: Op, major: u64, minor: u64) -> VersionReq {
    VersionReq {
        comparators: vec![Comparator {
            op,
            major,
            minor: Some(minor),
            patch: None,
            pre: Prerelease::EMPTY,
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::options::OptionSpec;

    #[test]
    fn test_generation_parse() {
        assert_eq!("3".parse::<Generation>().unwrap(), Generation::Gen3);
        assert_eq!("gen1".parse::<Generation>().unwrap(), Generation::Gen1);
        assert!("4".parse::<Generation>().is_err());
        assert!("latest".parse::<Generation>().is_err());
        assert_eq!(Generation::default(), Generation::Gen3);
    }

    #[test]
    fn test_builtin_tables_are_consistent() {
        for generation in Generation::ALL {
            let table = generation.rules();
            table
                .check()
                .unwrap_or_else(|e| panic!("{} rejected: {}", generation, e));
            assert_eq!(table.generation, generation.to_string());
        }
    }

    #[test]
    fn test_builtin_tables_roundtrip_through_toml() {
        for generation in Generation::ALL {
            let table = generation.rules();
            let text = table.to_toml().unwrap();
            let parsed: RuleTable = toml::from_str(&text).unwrap();
            assert_eq!(parsed, table, "{} did not round-trip", generation);
        }
    }

    #[test]
    fn test_load_custom_table() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("rules.toml");

        let mut table = Generation::Gen3.rules();
        table.generation = "custom".to_string();
        table.toolchain.push(ToolchainRule::minimum(
            CompilerName::Intel,
            19,
            0,
            "icc >= 19.0 is required, yours is {version}",
        ));
        std::fs::write(&path, table.to_toml().unwrap()).unwrap();

        let loaded = RuleTable::load(&path).unwrap();
        assert_eq!(loaded.generation, "custom");
        assert!(loaded.knows_compiler(CompilerName::Intel));
    }

    #[test]
    fn test_check_rejects_contradictory_rules() {
        let mut table = Generation::Gen3.rules();
        let mut accept = table.toolchain[0].clone();
        accept.verdict = Verdict::Accept;
        table.toolchain.push(accept);

        let err = table.check().unwrap_err();
        assert!(matches!(err, ResolveError::InvalidRuleTable { .. }));
        assert!(err.to_string().contains("contradictory"));
    }

    #[test]
    fn test_check_rejects_duplicate_option() {
        let mut table = Generation::Gen1.rules();
        table
            .schema
            .options
            .push(OptionSpec::boolean(OptionName::Shared, true));

        assert!(table.check().unwrap_err().to_string().contains("declared twice"));
    }

    #[test]
    fn test_check_rejects_default_outside_domain() {
        let mut table = Generation::Gen3.rules();
        let spec = table
            .schema
            .options
            .iter_mut()
            .find(|s| s.name == OptionName::Shared)
            .unwrap();
        spec.default = OptionValue::Level(LogLevel::Info);

        assert!(table.check().unwrap_err().to_string().contains("outside its domain"));
    }

    #[test]
    fn test_check_rejects_undeclared_dependency_gate() {
        let mut table = Generation::Gen1.rules();
        table.dependency.option = OptionName::Fpic;

        assert!(table.check().unwrap_err().to_string().contains("not declared"));
    }

    #[test]
    fn test_check_rejects_disabled_level_outside_domain() {
        let mut table = Generation::Gen3.rules();
        let spec = table
            .schema
            .options
            .iter_mut()
            .find(|s| s.name == OptionName::LogLevel)
            .unwrap();
        spec.domain = OptionDomain::Levels {
            levels: vec![LogLevel::Error, LogLevel::Info],
        };
        spec.default = OptionValue::Level(LogLevel::Info);

        let err = table.check().unwrap_err();
        assert!(err.to_string().contains("disabled log level"));

        table.log_level_encoding = LogLevelEncoding::Index;
        table.check().unwrap();
    }

    #[test]
    fn test_reason_substitutes_version() {
        let rule = ToolchainRule::minimum(
            CompilerName::Gcc,
            4,
            8,
            "g++ >= 4.8 is required, yours is {version}",
        );
        let platform =
            PlatformDescriptor::parse("linux", "gcc", "4.7", "x86_64", "release").unwrap();

        assert!(rule.matches(&platform));
        assert_eq!(
            rule.render_reason(&platform),
            "g++ >= 4.8 is required, yours is 4.7"
        );
    }

    #[test]
    fn test_version_windows_display() {
        assert_eq!(below(4, 8).to_string(), "<4.8");
        assert_eq!(above(10, 0).to_string(), ">10.0");
    }

    #[test]
    fn test_platform_match_with_versions() {
        let m = PlatformMatch::os(Os::Linux)
            .compiler(CompilerName::Gcc)
            .versions(below(5, 0));
        let old = PlatformDescriptor::parse("linux", "gcc", "4.9", "x86_64", "debug").unwrap();
        let new = PlatformDescriptor::parse("linux", "gcc", "9", "x86_64", "debug").unwrap();
        let mac =
            PlatformDescriptor::parse("macos", "apple-clang", "11.0", "x86_64", "debug").unwrap();

        assert!(m.matches(&old));
        assert!(!m.matches(&new));
        assert!(!m.matches(&mac));
    }
}
