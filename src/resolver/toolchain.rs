//! Toolchain validation.
//!
//! Checks the platform's compiler identity against the rule table. The
//! algorithm is fixed; generations only change the table.
//!
//! # Algorithm
//!
//! 1. If no rule mentions the compiler family, accept. No constraint was
//!    declared for it.
//! 2. Evaluate architecture-scoped rules first, then unscoped ones, each in
//!    table order. Exceptions can therefore reject a version that the
//!    general minimum would let through.
//! 3. The first matching rule decides. If nothing matches, accept.

use crate::core::platform::PlatformDescriptor;
use crate::resolver::errors::ResolveError;
use crate::rules::{RuleTable, ToolchainRule, Verdict};

/// Validate the platform's toolchain. A rejection is terminal.
pub fn validate(platform: &PlatformDescriptor, rules: &RuleTable) -> Result<(), ResolveError> {
    let compiler = platform.compiler();

    if !rules.knows_compiler(compiler) {
        tracing::debug!(
            "no toolchain rules for `{}` in {}, accepting",
            compiler,
            rules.generation
        );
        return Ok(());
    }

    match first_match(platform, rules) {
        Some(rule) if rule.verdict == Verdict::Reject => {
            let reason = rule.render_reason(platform);
            tracing::debug!("toolchain rejected for {}: {}", platform, reason);
            Err(ResolveError::ToolchainRejected { reason })
        }
        Some(_) | None => {
            tracing::debug!("toolchain accepted for {}", platform);
            Ok(())
        }
    }
}

/// Find the deciding rule, most specific first.
fn first_match<'r>(
    platform: &PlatformDescriptor,
    rules: &'r RuleTable,
) -> Option<&'r ToolchainRule> {
    let (scoped, general): (Vec<&ToolchainRule>, Vec<&ToolchainRule>) = rules
        .toolchain
        .iter()
        .filter(|rule| rule.compiler == platform.compiler())
        .partition(|rule| rule.arch.is_some());

    scoped
        .into_iter()
        .chain(general)
        .find(|rule| rule.matches(platform))
}
