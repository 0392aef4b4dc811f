//! Build-side outputs of a resolved configuration.
//!
//! Compiles the definitions handed to CMake and the manifest handed to
//! package publication.

pub mod cmake;
pub mod definitions;
pub mod manifest;

pub use cmake::{select_patch, CMakeInvocation};
pub use definitions::compile;
pub use manifest::build_manifest;
