//! Target platform description.
//!
//! A `PlatformDescriptor` is the immutable snapshot of the settings a package
//! is built for: operating system, compiler identity, architecture and build
//! type. It is created once per resolution and never modified.

use std::fmt;
use std::str::FromStr;

use semver::Version;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::resolver::version::parse_version_lenient;

/// Error returned when a platform setting cannot be parsed.
#[derive(Debug, Clone, Error)]
#[error("invalid {field} `{value}`, valid values: {expected}")]
pub struct PlatformParseError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

impl PlatformParseError {
    fn new(field: &'static str, value: &str, expected: &'static str) -> Self {
        PlatformParseError {
            field,
            value: value.to_string(),
            expected,
        }
    }
}

/// Target operating system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Os {
    Linux,
    Macos,
    Windows,
    Freebsd,
}

impl Os {
    pub fn as_str(&self) -> &'static str {
        match self {
            Os::Linux => "linux",
            Os::Macos => "macos",
            Os::Windows => "windows",
            Os::Freebsd => "freebsd",
        }
    }

    /// The operating system this binary runs on, if it is one we know.
    pub fn host() -> Option<Self> {
        std::env::consts::OS.parse().ok()
    }
}

impl fmt::Display for Os {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Os {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "linux" => Ok(Os::Linux),
            "macos" | "darwin" | "osx" => Ok(Os::Macos),
            "windows" | "win32" => Ok(Os::Windows),
            "freebsd" => Ok(Os::Freebsd),
            _ => Err(PlatformParseError::new(
                "os",
                s,
                "linux, macos, windows, freebsd",
            )),
        }
    }
}

/// Compiler family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CompilerName {
    /// GCC (GNU Compiler Collection)
    Gcc,
    /// Clang/LLVM
    Clang,
    /// Apple Clang (Xcode)
    AppleClang,
    /// Microsoft Visual Studio
    VisualStudio,
    /// Intel C++ compiler
    Intel,
}

impl CompilerName {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerName::Gcc => "gcc",
            CompilerName::Clang => "clang",
            CompilerName::AppleClang => "apple-clang",
            CompilerName::VisualStudio => "visual-studio",
            CompilerName::Intel => "intel",
        }
    }
}

impl fmt::Display for CompilerName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for CompilerName {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "gcc" | "g++" => Ok(CompilerName::Gcc),
            "clang" | "clang++" => Ok(CompilerName::Clang),
            "apple-clang" | "appleclang" => Ok(CompilerName::AppleClang),
            "visual-studio" | "visual studio" | "msvc" => Ok(CompilerName::VisualStudio),
            "intel" | "icc" => Ok(CompilerName::Intel),
            _ => Err(PlatformParseError::new(
                "compiler",
                s,
                "gcc, clang, apple-clang, visual-studio, intel",
            )),
        }
    }
}

/// CPU architecture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Arch {
    X86,
    X86_64,
    Armv7,
    Armv8,
}

impl Arch {
    pub fn as_str(&self) -> &'static str {
        match self {
            Arch::X86 => "x86",
            Arch::X86_64 => "x86_64",
            Arch::Armv7 => "armv7",
            Arch::Armv8 => "armv8",
        }
    }

    /// The architecture this binary runs on, if it is one we know.
    pub fn host() -> Option<Self> {
        std::env::consts::ARCH.parse().ok()
    }
}

impl fmt::Display for Arch {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Arch {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "x86" | "i386" | "i686" => Ok(Arch::X86),
            "x86_64" | "amd64" | "x64" => Ok(Arch::X86_64),
            "armv7" | "arm" => Ok(Arch::Armv7),
            "armv8" | "aarch64" | "arm64" => Ok(Arch::Armv8),
            _ => Err(PlatformParseError::new(
                "arch",
                s,
                "x86, x86_64, armv7, armv8",
            )),
        }
    }
}

/// Build type passed through to the build tool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildType {
    Debug,
    #[default]
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl BuildType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "debug",
            BuildType::Release => "release",
            BuildType::RelWithDebInfo => "relwithdebinfo",
            BuildType::MinSizeRel => "minsizerel",
        }
    }

    /// Spelling used by `CMAKE_BUILD_TYPE`.
    pub fn cmake_name(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
            BuildType::RelWithDebInfo => "RelWithDebInfo",
            BuildType::MinSizeRel => "MinSizeRel",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            "relwithdebinfo" => Ok(BuildType::RelWithDebInfo),
            "minsizerel" => Ok(BuildType::MinSizeRel),
            _ => Err(PlatformParseError::new(
                "build type",
                s,
                "debug, release, relwithdebinfo, minsizerel",
            )),
        }
    }
}

/// A compiler version as written in the settings, with its parsed form.
///
/// Ordering and equality use the parsed version only, so `"10"` and
/// `"10.0"` compare equal and `"10.0"` sorts after `"9.0"`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CompilerVersion {
    raw: String,
    version: Version,
}

impl CompilerVersion {
    /// The version exactly as the user spelled it.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The structured version used for comparisons.
    pub fn version(&self) -> &Version {
        &self.version
    }
}

impl PartialEq for CompilerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.version == other.version
    }
}

impl Eq for CompilerVersion {}

impl PartialOrd for CompilerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CompilerVersion {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.version.cmp(&other.version)
    }
}

impl fmt::Display for CompilerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.raw)
    }
}

impl FromStr for CompilerVersion {
    type Err = PlatformParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let version = parse_version_lenient(s).ok_or_else(|| {
            PlatformParseError::new("compiler version", s, "MAJOR[.MINOR[.PATCH]]")
        })?;

        Ok(CompilerVersion {
            raw: s.trim().to_string(),
            version,
        })
    }
}

impl TryFrom<String> for CompilerVersion {
    type Error = PlatformParseError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<CompilerVersion> for String {
    fn from(value: CompilerVersion) -> Self {
        value.raw
    }
}

/// Immutable description of the platform a package is resolved for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlatformDescriptor {
    os: Os,
    compiler: CompilerName,
    compiler_version: CompilerVersion,
    arch: Arch,
    build_type: BuildType,
}

impl PlatformDescriptor {
    pub fn new(
        os: Os,
        compiler: CompilerName,
        compiler_version: CompilerVersion,
        arch: Arch,
        build_type: BuildType,
    ) -> Self {
        PlatformDescriptor {
            os,
            compiler,
            compiler_version,
            arch,
            build_type,
        }
    }

    /// Parse every field from its string form.
    pub fn parse(
        os: &str,
        compiler: &str,
        compiler_version: &str,
        arch: &str,
        build_type: &str,
    ) -> Result<Self, PlatformParseError> {
        Ok(PlatformDescriptor::new(
            os.parse()?,
            compiler.parse()?,
            compiler_version.parse()?,
            arch.parse()?,
            build_type.parse()?,
        ))
    }

    pub fn os(&self) -> Os {
        self.os
    }

    pub fn compiler(&self) -> CompilerName {
        self.compiler
    }

    pub fn compiler_version(&self) -> &CompilerVersion {
        &self.compiler_version
    }

    pub fn arch(&self) -> Arch {
        self.arch
    }

    pub fn build_type(&self) -> BuildType {
        self.build_type
    }
}

impl fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}-{}/{}/{}",
            self.os, self.compiler, self.compiler_version, self.arch, self.build_type
        )
    }
}
