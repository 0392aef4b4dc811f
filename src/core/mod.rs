//! Core data structures for caf-recipe.
//!
//! This module contains the foundational types the resolver works on:
//! - Platform descriptors (OS, compiler identity, architecture, build type)
//! - Option schema and typed option sets
//! - Dependency requirements, build definitions and package manifests

pub mod definitions;
pub mod dependency;
pub mod manifest;
pub mod options;
pub mod platform;

pub use definitions::{BuildDefinitions, DefinitionValue};
pub use dependency::{DependencyRequirement, DependencySet};
pub use manifest::Manifest;
pub use options::{
    canonicalize, LogLevel, OptionName, OptionSchema, OptionSet, OptionValue, RawOptions,
};
pub use platform::{Arch, BuildType, CompilerName, CompilerVersion, Os, PlatformDescriptor};
