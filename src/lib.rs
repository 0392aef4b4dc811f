//! caf-recipe - build configuration resolver for packaging the CAF library
//!
//! This crate turns a target platform and a set of user options into a
//! validated build configuration: the options that apply, the toolchain
//! verdict, the external dependencies, the CMake definitions and the
//! package manifest. Every decision is driven by a pinned rule generation.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod rules;
pub mod util;

pub use core::{Manifest, OptionSet, PlatformDescriptor};
pub use ops::{resolve, Resolution};
pub use resolver::ResolveError;
pub use rules::{Generation, RuleTable};
