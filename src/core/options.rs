//! Package options and the schema that declares them.
//!
//! Options are a fixed, typed configuration (`OptionSet`) rather than a free
//! form map. Which options exist in a given rule generation, their value
//! domains, defaults and the platforms they are excluded on is declared by
//! an `OptionSchema`.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::core::platform::{Arch, Os, PlatformDescriptor};
use crate::resolver::errors::ResolveError;

/// Raw option input from a front end: option name to unparsed value.
pub type RawOptions = BTreeMap<String, String>;

/// Rewrite recognized option keys to their canonical spelling, so that
/// input layers (profiles, flags) override each other per option.
///
/// Unrecognized keys are kept as written and rejected later by
/// [`OptionSchema::parse`]. Two keys naming the same option within one
/// layer are a `SchemaViolation`.
pub fn canonicalize(
    raw: impl IntoIterator<Item = (String, String)>,
) -> Result<RawOptions, ResolveError> {
    let mut out = RawOptions::new();

    for (key, value) in raw {
        let canonical = match key.parse::<OptionName>() {
            Ok(name) => {
                if out.contains_key(name.as_str()) {
                    return Err(duplicate_key(name, &key));
                }
                name.as_str().to_string()
            }
            Err(_) => key,
        };
        out.insert(canonical, value);
    }

    Ok(out)
}

fn duplicate_key(name: OptionName, key: &str) -> ResolveError {
    ResolveError::SchemaViolation {
        option: name.to_string(),
        message: format!("`{}` sets the same option more than once", key),
    }
}

/// Name of a recognized package option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum OptionName {
    /// Build shared instead of static libraries
    #[serde(rename = "shared")]
    Shared,
    /// Position-independent code for static builds
    #[serde(rename = "fPIC")]
    Fpic,
    /// Compile-time logging severity
    #[serde(rename = "log_level")]
    LogLevel,
    /// Build the OpenSSL-backed networking module
    #[serde(rename = "openssl")]
    Openssl,
}

impl OptionName {
    pub const ALL: [OptionName; 4] = [
        OptionName::Shared,
        OptionName::Fpic,
        OptionName::LogLevel,
        OptionName::Openssl,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OptionName::Shared => "shared",
            OptionName::Fpic => "fPIC",
            OptionName::LogLevel => "log_level",
            OptionName::Openssl => "openssl",
        }
    }

    /// Whether values of this option are booleans.
    pub fn is_bool(&self) -> bool {
        !matches!(self, OptionName::LogLevel)
    }
}

impl fmt::Display for OptionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for OptionName {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OptionName::ALL
            .into_iter()
            .find(|name| name.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| ResolveError::SchemaViolation {
                option: s.to_string(),
                message: format!(
                    "unknown option, valid options: {}",
                    OptionName::ALL.map(|n| n.as_str()).join(", ")
                ),
            })
    }
}

/// Logging severity, ordered from most to least severe; `None` disables
/// logging entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LogLevel {
    Error,
    Warning,
    Info,
    Debug,
    Trace,
    None,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Error => "ERROR",
            LogLevel::Warning => "WARNING",
            LogLevel::Info => "INFO",
            LogLevel::Debug => "DEBUG",
            LogLevel::Trace => "TRACE",
            LogLevel::None => "NONE",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "ERROR" => Ok(LogLevel::Error),
            "WARNING" => Ok(LogLevel::Warning),
            "INFO" => Ok(LogLevel::Info),
            "DEBUG" => Ok(LogLevel::Debug),
            "TRACE" => Ok(LogLevel::Trace),
            "NONE" | "QUIET" => Ok(LogLevel::None),
            _ => Err(format!("`{}` is not a log level", s)),
        }
    }
}

/// A typed option value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OptionValue {
    Bool(bool),
    Level(LogLevel),
}

impl fmt::Display for OptionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OptionValue::Bool(b) => write!(f, "{}", b),
            OptionValue::Level(level) => write!(f, "{}", level),
        }
    }
}

/// The chosen package options. `None` means the option is absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,

    #[serde(rename = "fPIC", skip_serializing_if = "Option::is_none")]
    pub fpic: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub log_level: Option<LogLevel>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub openssl: Option<bool>,
}

impl OptionSet {
    /// Get the value of an option, if present.
    pub fn get(&self, name: OptionName) -> Option<OptionValue> {
        match name {
            OptionName::Shared => self.shared.map(OptionValue::Bool),
            OptionName::Fpic => self.fpic.map(OptionValue::Bool),
            OptionName::LogLevel => self.log_level.map(OptionValue::Level),
            OptionName::Openssl => self.openssl.map(OptionValue::Bool),
        }
    }

    /// Set an option, checking that the value has the option's type.
    pub fn set(&mut self, name: OptionName, value: OptionValue) -> Result<(), ResolveError> {
        match (name, value) {
            (OptionName::Shared, OptionValue::Bool(b)) => self.shared = Some(b),
            (OptionName::Fpic, OptionValue::Bool(b)) => self.fpic = Some(b),
            (OptionName::Openssl, OptionValue::Bool(b)) => self.openssl = Some(b),
            (OptionName::LogLevel, OptionValue::Level(level)) => self.log_level = Some(level),
            (name, value) => {
                return Err(ResolveError::SchemaViolation {
                    option: name.to_string(),
                    message: format!("`{}` has the wrong type for this option", value),
                })
            }
        }
        Ok(())
    }

    /// Remove an option, returning whether it was present.
    pub fn remove(&mut self, name: OptionName) -> bool {
        let present = self.contains(name);
        match name {
            OptionName::Shared => self.shared = None,
            OptionName::Fpic => self.fpic = None,
            OptionName::LogLevel => self.log_level = None,
            OptionName::Openssl => self.openssl = None,
        }
        present
    }

    pub fn contains(&self, name: OptionName) -> bool {
        self.get(name).is_some()
    }

    /// Iterate over present options in name order.
    pub fn iter(&self) -> impl Iterator<Item = (OptionName, OptionValue)> + '_ {
        OptionName::ALL
            .into_iter()
            .filter_map(|name| self.get(name).map(|value| (name, value)))
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Value domain of an option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum OptionDomain {
    Bool,
    /// An ordered enumeration of log levels. The order is significant for
    /// numeric encodings.
    Levels { levels: Vec<LogLevel> },
}

impl OptionDomain {
    fn describe(&self) -> String {
        match self {
            OptionDomain::Bool => "true, false".to_string(),
            OptionDomain::Levels { levels } => levels
                .iter()
                .map(|l| l.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        }
    }

    pub fn contains(&self, value: &OptionValue) -> bool {
        match (self, value) {
            (OptionDomain::Bool, OptionValue::Bool(_)) => true,
            (OptionDomain::Levels { levels }, OptionValue::Level(level)) => levels.contains(level),
            _ => false,
        }
    }
}

/// Platform predicate under which an option is removed.
///
/// Every field that is set must match; unset fields match anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<Os>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<Arch>,
}

impl Exclusion {
    pub fn os(os: Os) -> Self {
        Exclusion {
            os: Some(os),
            arch: None,
        }
    }

    pub fn arch(arch: Arch) -> Self {
        Exclusion {
            os: None,
            arch: Some(arch),
        }
    }

    pub fn os_and_arch(os: Os, arch: Arch) -> Self {
        Exclusion {
            os: Some(os),
            arch: Some(arch),
        }
    }

    pub fn matches(&self, platform: &PlatformDescriptor) -> bool {
        self.os.map_or(true, |os| os == platform.os())
            && self.arch.map_or(true, |arch| arch == platform.arch())
    }
}

impl fmt::Display for Exclusion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.os, self.arch) {
            (Some(os), Some(arch)) => write!(f, "os={} and arch={}", os, arch),
            (Some(os), None) => write!(f, "os={}", os),
            (None, Some(arch)) => write!(f, "arch={}", arch),
            (None, None) => write!(f, "any platform"),
        }
    }
}

/// Declaration of a single option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSpec {
    pub name: OptionName,
    pub domain: OptionDomain,
    pub default: OptionValue,
    /// The option is removed when any of these predicates match.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub excluded_on: Vec<Exclusion>,
}

impl OptionSpec {
    pub fn boolean(name: OptionName, default: bool) -> Self {
        OptionSpec {
            name,
            domain: OptionDomain::Bool,
            default: OptionValue::Bool(default),
            excluded_on: Vec::new(),
        }
    }

    pub fn levels(name: OptionName, levels: Vec<LogLevel>, default: LogLevel) -> Self {
        OptionSpec {
            name,
            domain: OptionDomain::Levels { levels },
            default: OptionValue::Level(default),
            excluded_on: Vec::new(),
        }
    }

    pub fn excluded_on(mut self, exclusion: Exclusion) -> Self {
        self.excluded_on.push(exclusion);
        self
    }

    /// Whether this option has no meaning on the given platform.
    pub fn is_excluded(&self, platform: &PlatformDescriptor) -> bool {
        self.excluded_on.iter().any(|e| e.matches(platform))
    }

    fn parse_value(&self, raw: &str) -> Result<OptionValue, ResolveError> {
        let value = match &self.domain {
            OptionDomain::Bool => match raw.to_lowercase().as_str() {
                "true" => Some(OptionValue::Bool(true)),
                "false" => Some(OptionValue::Bool(false)),
                _ => None,
            },
            OptionDomain::Levels { .. } => raw.parse().ok().map(OptionValue::Level),
        };

        match value {
            Some(value) if self.domain.contains(&value) => Ok(value),
            _ => Err(self.out_of_domain(raw)),
        }
    }

    fn out_of_domain(&self, raw: &str) -> ResolveError {
        ResolveError::SchemaViolation {
            option: self.name.to_string(),
            message: format!(
                "`{}` is not a valid value, valid values: {}",
                raw,
                self.domain.describe()
            ),
        }
    }
}

/// The options declared by a rule generation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionSchema {
    pub options: Vec<OptionSpec>,
}

impl OptionSchema {
    pub fn new(options: Vec<OptionSpec>) -> Self {
        OptionSchema { options }
    }

    pub fn spec(&self, name: OptionName) -> Option<&OptionSpec> {
        self.options.iter().find(|spec| spec.name == name)
    }

    /// Parse raw front-end input into a typed option set.
    ///
    /// Unknown keys, keys this schema does not declare and values outside
    /// the declared domain are rejected, and so are two keys naming the
    /// same option (`Shared` and `shared`).
    pub fn parse(&self, raw: &RawOptions) -> Result<OptionSet, ResolveError> {
        let mut set = OptionSet::default();

        for (key, value) in raw {
            let name: OptionName = key.parse()?;
            let spec = self.declared(name)?;
            if set.contains(name) {
                return Err(duplicate_key(name, key));
            }
            set.set(name, spec.parse_value(value)?)?;
        }

        Ok(set)
    }

    /// Check that every present option is declared and within its domain.
    pub fn check(&self, set: &OptionSet) -> Result<(), ResolveError> {
        for (name, value) in set.iter() {
            let spec = self.declared(name)?;
            if !spec.domain.contains(&value) {
                return Err(spec.out_of_domain(&value.to_string()));
            }
        }
        Ok(())
    }

    /// Fill every option the user did not set with its declared default.
    pub fn fill_defaults(&self, mut set: OptionSet) -> OptionSet {
        for spec in &self.options {
            if !set.contains(spec.name) {
                // Defaults are validated when the table is checked; a
                // mismatched default is left unset rather than guessed.
                if set.set(spec.name, spec.default).is_err() {
                    tracing::warn!("default for option `{}` has the wrong type", spec.name);
                }
            }
        }
        set
    }

    fn declared(&self, name: OptionName) -> Result<&OptionSpec, ResolveError> {
        self.spec(name).ok_or_else(|| ResolveError::SchemaViolation {
            option: name.to_string(),
            message: "option is not declared by this rule generation".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schema() -> OptionSchema {
        OptionSchema::new(vec![
            OptionSpec::boolean(OptionName::Shared, false).excluded_on(Exclusion::os(Os::Windows)),
            OptionSpec::levels(
                OptionName::LogLevel,
                vec![LogLevel::Error, LogLevel::Debug, LogLevel::None],
                LogLevel::None,
            ),
            OptionSpec::boolean(OptionName::Openssl, true),
        ])
    }

    fn raw(pairs: &[(&str, &str)]) -> RawOptions {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_parse_valid_options() {
        let set = schema()
            .parse(&raw(&[("shared", "True"), ("log_level", "debug")]))
            .unwrap();

        assert_eq!(set.shared, Some(true));
        assert_eq!(set.log_level, Some(LogLevel::Debug));
        assert_eq!(set.openssl, None);
    }

    #[test]
    fn test_parse_unknown_option() {
        let err = schema().parse(&raw(&[("threads", "true")])).unwrap_err();
        assert!(matches!(err, ResolveError::SchemaViolation { .. }));
        assert!(err.to_string().contains("threads"));
    }

    #[test]
    fn test_parse_rejects_keys_naming_same_option() {
        let err = schema()
            .parse(&raw(&[("Shared", "false"), ("shared", "true")]))
            .unwrap_err();
        assert!(matches!(err, ResolveError::SchemaViolation { .. }));
        assert!(err.to_string().contains("more than once"), "got: {}", err);
    }

    #[test]
    fn test_canonicalize_merges_layers_per_option() {
        let mut merged = canonicalize(raw(&[("shared", "true"), ("threads", "1")])).unwrap();
        merged.extend(canonicalize(raw(&[("Shared", "false"), ("FPIC", "false")])).unwrap());

        assert_eq!(merged.get("shared").map(String::as_str), Some("false"));
        assert_eq!(merged.get("fPIC").map(String::as_str), Some("false"));
        assert!(merged.contains_key("threads"));
        assert_eq!(merged.len(), 3);
    }

    #[test]
    fn test_canonicalize_rejects_duplicates_in_one_layer() {
        let layer = vec![
            ("shared".to_string(), "true".to_string()),
            ("SHARED".to_string(), "true".to_string()),
        ];
        assert!(canonicalize(layer).is_err());
    }

    #[test]
    fn test_parse_undeclared_option() {
        // fPIC is a known option name but this schema does not declare it
        let err = schema().parse(&raw(&[("fPIC", "true")])).unwrap_err();
        assert!(err.to_string().contains("not declared"));
    }

    #[test]
    fn test_parse_value_outside_domain() {
        let err = schema().parse(&raw(&[("log_level", "TRACE")])).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("TRACE"), "got: {}", msg);
        assert!(msg.contains("ERROR, DEBUG, NONE"), "got: {}", msg);

        let err = schema().parse(&raw(&[("shared", "yes")])).unwrap_err();
        assert!(err.to_string().contains("true, false"));
    }

    #[test]
    fn test_check_rejects_undeclared_typed_option() {
        let set = OptionSet {
            fpic: Some(true),
            ..Default::default()
        };
        assert!(schema().check(&set).is_err());
    }

    #[test]
    fn test_set_rejects_wrong_type() {
        let mut set = OptionSet::default();
        assert!(set
            .set(OptionName::Shared, OptionValue::Level(LogLevel::Info))
            .is_err());
        assert!(set.is_empty());
    }

    #[test]
    fn test_fill_defaults_keeps_user_values() {
        let set = OptionSet {
            openssl: Some(false),
            ..Default::default()
        };
        let filled = schema().fill_defaults(set);

        assert_eq!(filled.shared, Some(false));
        assert_eq!(filled.log_level, Some(LogLevel::None));
        assert_eq!(filled.openssl, Some(false));
        assert_eq!(filled.fpic, None);
    }

    #[test]
    fn test_exclusion_requires_all_fields() {
        use crate::core::platform::PlatformDescriptor;

        let both = Exclusion::os_and_arch(Os::Windows, Arch::X86);
        let win64 =
            PlatformDescriptor::parse("windows", "visual-studio", "16", "x86_64", "release")
                .unwrap();
        let win32 =
            PlatformDescriptor::parse("windows", "visual-studio", "16", "x86", "release").unwrap();

        assert!(!both.matches(&win64));
        assert!(both.matches(&win32));
        assert!(Exclusion::os(Os::Windows).matches(&win64));
    }

    #[test]
    fn test_option_set_iter_in_name_order() {
        let set = OptionSet {
            openssl: Some(true),
            shared: Some(false),
            ..Default::default()
        };
        let names: Vec<_> = set.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec![OptionName::Shared, OptionName::Openssl]);
    }
}
