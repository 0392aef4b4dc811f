//! Resolution error types and diagnostics.

use miette::Diagnostic as MietteDiagnostic;
use thiserror::Error;

use crate::core::options::OptionName;
use crate::util::diagnostic::Diagnostic;

/// Error during configuration resolution.
///
/// Every variant is terminal: resolution is pure, so retrying with the same
/// inputs yields the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error, MietteDiagnostic)]
pub enum ResolveError {
    #[error("invalid option `{option}`: {message}")]
    #[diagnostic(code(caf_recipe::options::schema_violation))]
    SchemaViolation { option: String, message: String },

    #[error("option `{option}` does not apply to {platform}")]
    #[diagnostic(code(caf_recipe::options::pruned))]
    PrunedOption { option: OptionName, platform: String },

    #[error("unsupported toolchain: {reason}")]
    #[diagnostic(
        code(caf_recipe::toolchain::rejected),
        help("Use a supported compiler or pin an older rule generation with --generation")
    )]
    ToolchainRejected { reason: String },

    #[error("internal inconsistency: {detail}")]
    #[diagnostic(code(caf_recipe::rules::inconsistent))]
    InternalInconsistency { detail: String },

    #[error("invalid rule table: {detail}")]
    #[diagnostic(code(caf_recipe::rules::invalid))]
    InvalidRuleTable { detail: String },
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::SchemaViolation { option, message } => {
                Diagnostic::error(format!("invalid option `{}`", option))
                    .with_context(message.clone())
                    .with_suggestion("Run `caf-recipe rules` to see the options this generation declares")
            }

            ResolveError::PrunedOption { option, platform } => {
                Diagnostic::error(format!("option `{}` does not apply to {}", option, platform))
                    .with_context("the option was removed while pruning for this platform")
                    .with_suggestion(format!("Remove `{}` from the requested options", option))
            }

            ResolveError::ToolchainRejected { reason } => {
                Diagnostic::error("unsupported toolchain")
                    .with_context(reason.clone())
                    .with_suggestion("Use a newer compiler for this platform")
                    .with_suggestion("Pin an older rule generation with `--generation`")
            }

            ResolveError::InternalInconsistency { detail } => {
                Diagnostic::error("rule table is inconsistent")
                    .with_context(detail.clone())
                    .with_suggestion("Add the missing rule to the rule table")
            }

            ResolveError::InvalidRuleTable { detail } => Diagnostic::error("invalid rule table")
                .with_context(detail.clone())
                .with_suggestion("Fix the rule table file or use a built-in generation"),
        }
    }

    /// Whether this error is a toolchain rejection.
    pub fn is_rejection(&self) -> bool {
        matches!(self, ResolveError::ToolchainRejected { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejection_keeps_reason_verbatim() {
        let err = ResolveError::ToolchainRejected {
            reason: "g++ >= 4.8 is required, yours is 4.7".to_string(),
        };

        assert!(err.is_rejection());
        assert_eq!(
            err.to_string(),
            "unsupported toolchain: g++ >= 4.8 is required, yours is 4.7"
        );

        let output = err.to_diagnostic().format(false);
        assert!(output.contains("error: unsupported toolchain"));
        assert!(output.contains("g++ >= 4.8 is required, yours is 4.7"));
        assert!(output.contains("help: consider:"));
    }

    #[test]
    fn test_miette_code() {
        let err = ResolveError::InvalidRuleTable {
            detail: "duplicate".to_string(),
        };
        let code = MietteDiagnostic::code(&err).map(|c| c.to_string());
        assert_eq!(code.as_deref(), Some("caf_recipe::rules::invalid"));
    }
}
