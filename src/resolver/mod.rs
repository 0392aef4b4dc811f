//! Configuration resolution.
//!
//! The resolver stages are pure functions of the platform, the options and
//! the pinned rule table: pruning, toolchain validation and conditional
//! dependency resolution. No I/O happens here.

pub mod deps;
pub mod errors;
pub mod prune;
pub mod toolchain;
pub mod version;

pub use deps::resolve_deps;
pub use errors::ResolveError;
pub use prune::{prune, PrunedOptions};
pub use toolchain::validate;
