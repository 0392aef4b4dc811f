//! High-level operations.
//!
//! This module contains the implementation of caf-recipe commands.

pub mod collaborators;
pub mod resolve;

pub use collaborators::{
    execute, plan, BuildInvoker, DependencyFetcher, DryRun, PackagePublisher, Step,
};
pub use resolve::{options_from_raw, resolve, Resolution, ResolutionSummary};
