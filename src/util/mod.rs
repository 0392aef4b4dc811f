//! Shared utilities

pub mod config;
pub mod diagnostic;
pub mod hash;

pub use config::Profile;
pub use diagnostic::Diagnostic;
