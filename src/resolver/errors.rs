//! Resolution error types and diagnostics.

use std::path::PathBuf;

use thiserror::Error;

use crate::core::ManifestError;
use crate::util::diagnostic::Diagnostic;

/// Error while loading the dependency closure of a set of rules.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("package `{package}` has no manifest (needed by {})", from_display(.from))]
    MissingPackage {
        package: String,
        expected: PathBuf,
        from: Option<String>,
    },

    #[error("rule `{name}` is not declared in package `{package}` (needed by {})", from_display(.from))]
    UnknownRule {
        package: String,
        name: String,
        from: Option<String>,
        available: Vec<String>,
    },

    #[error("`{from}` depends on binary rule `{target}`")]
    BinaryDependency { from: String, target: String },

    #[error("cycle detected in dependency graph")]
    CycleDetected { rules: Vec<String> },

    #[error(transparent)]
    Manifest(#[from] ManifestError),
}

fn from_display(from: &Option<String>) -> String {
    match from {
        Some(from) => format!("`{}`", from),
        None => "the command line".to_string(),
    }
}

impl ResolveError {
    /// Convert to a user-friendly diagnostic.
    pub fn to_diagnostic(&self) -> Diagnostic {
        match self {
            ResolveError::MissingPackage {
                package, expected, ..
            } => Diagnostic::error(self.to_string())
                .with_context(format!("expected {}", expected.display()))
                .with_suggestion(format!(
                    "Check the package path `{}` in deplibs",
                    package
                ))
                .with_suggestion("Make sure FL_ROOT points at the top of the source tree"),

            ResolveError::UnknownRule {
                package,
                available,
                ..
            } => {
                let mut diag = Diagnostic::error(self.to_string());
                if available.is_empty() {
                    diag = diag.with_context(format!("package `{}` declares no rules", package));
                } else {
                    diag = diag.with_context(format!(
                        "package `{}` declares: {}",
                        package,
                        available.join(", ")
                    ));
                }
                diag.with_suggestion("Fix the rule name in deplibs")
            }

            ResolveError::BinaryDependency { target, .. } => Diagnostic::error(self.to_string())
                .with_context(format!("`{}` is declared with binrule", target))
                .with_suggestion("Move the shared code into a librule and depend on that"),

            ResolveError::CycleDetected { rules } => {
                let mut diag = Diagnostic::error("cycle detected in dependency graph");
                for rule in rules {
                    diag = diag.with_context(format!("`{}` is part of the cycle", rule));
                }
                diag.with_suggestion("Remove one of the deplibs entries that closes the cycle")
            }

            ResolveError::Manifest(e) => Diagnostic::error(e.to_string())
                .with_location(e.path())
                .with_suggestion("Run `fl-build check` to list every problem"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_rule_diagnostic() {
        let err = ResolveError::UnknownRule {
            package: "fastlib/col".to_string(),
            name: "cols".to_string(),
            from: Some("fastlib/math:math".to_string()),
            available: vec!["col".to_string()],
        };

        assert_eq!(
            err.to_string(),
            "rule `cols` is not declared in package `fastlib/col` (needed by `fastlib/math:math`)"
        );
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("declares: col"));
    }

    #[test]
    fn test_missing_package_from_command_line() {
        let err = ResolveError::MissingPackage {
            package: "nope".to_string(),
            expected: PathBuf::from("/fl/nope/build.py"),
            from: None,
        };
        assert!(err.to_string().contains("needed by the command line"));
        assert!(err.to_diagnostic().format(false).contains("/fl/nope/build.py"));
    }

    #[test]
    fn test_cycle_diagnostic_lists_members() {
        let err = ResolveError::CycleDetected {
            rules: vec!["a:a".to_string(), "b:b".to_string()],
        };
        let output = err.to_diagnostic().format(false);
        assert!(output.contains("`a:a` is part of the cycle"));
        assert!(output.contains("`b:b` is part of the cycle"));
    }
}
