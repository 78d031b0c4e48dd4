//! Package paths, rule identifiers and the references used in `deplibs`.
//!
//! A reference is written `[package]:name` or just `package`:
//!
//! | Text                  | Package        | Rule          |
//! |-----------------------|----------------|---------------|
//! | `:example`            | same manifest  | `example`     |
//! | `fastlib:fastlib_int` | `fastlib`      | `fastlib_int` |
//! | `fastlib/base:base`   | `fastlib/base` | `base`        |
//! | `fastlib/col`         | `fastlib/col`  | `col`         |

use std::fmt;
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error produced when a package path or rule reference is malformed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RuleRefError {
    #[error("empty rule reference")]
    Empty,

    #[error("rule reference `{0}` has an empty rule name")]
    EmptyName(String),

    #[error("invalid rule name `{0}`")]
    InvalidName(String),

    #[error("invalid package path `{path}`: {reason}")]
    InvalidPackagePath { path: String, reason: &'static str },
}

fn is_valid_component(s: &str) -> bool {
    !s.is_empty()
        && s != "."
        && s != ".."
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
}

/// Directory of a manifest relative to the workspace root, `/`-separated.
///
/// The workspace root itself is the empty path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PackagePath(String);

impl PackagePath {
    /// The package at the workspace root.
    pub fn root() -> Self {
        PackagePath(String::new())
    }

    /// Parse a `/`-separated package path.
    pub fn new(path: &str) -> Result<Self, RuleRefError> {
        if path.is_empty() {
            return Ok(Self::root());
        }
        if path.starts_with('/') {
            return Err(RuleRefError::InvalidPackagePath {
                path: path.to_string(),
                reason: "package paths are relative to the workspace root",
            });
        }
        if !path.split('/').all(is_valid_component) {
            return Err(RuleRefError::InvalidPackagePath {
                path: path.to_string(),
                reason: "components must be non-empty names without `.` or `..`",
            });
        }
        Ok(PackagePath(path.to_string()))
    }

    /// Build a package path from a directory relative to the workspace root.
    pub fn from_relative_dir(rel: &Path) -> Result<Self, RuleRefError> {
        let mut parts = Vec::new();
        for component in rel.components() {
            match component {
                Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
                Component::CurDir => {}
                _ => {
                    return Err(RuleRefError::InvalidPackagePath {
                        path: rel.display().to_string(),
                        reason: "directory is outside the workspace root",
                    })
                }
            }
        }
        Self::new(&parts.join("/"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    /// The final path component, used as the default rule name.
    pub fn last_component(&self) -> Option<&str> {
        self.0.rsplit('/').next().filter(|s| !s.is_empty())
    }

    /// The package directory under `root`.
    pub fn to_dir(&self, root: &Path) -> PathBuf {
        self.0.split('/').filter(|s| !s.is_empty()).fold(root.to_path_buf(), |dir, part| dir.join(part))
    }
}

impl fmt::Display for PackagePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for PackagePath {
    type Error = RuleRefError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        PackagePath::new(&value)
    }
}

impl From<PackagePath> for String {
    fn from(value: PackagePath) -> Self {
        value.0
    }
}

/// Fully-qualified identity of a rule: `package:name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RuleId {
    pub package: PackagePath,
    pub name: String,
}

impl RuleId {
    pub fn new(package: PackagePath, name: impl Into<String>) -> Self {
        RuleId {
            package,
            name: name.into(),
        }
    }
}

impl fmt::Display for RuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.package, self.name)
    }
}

/// A dependency reference as written in a manifest.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RuleRef {
    /// `None` for references into the declaring manifest (`:name`).
    package: Option<PackagePath>,
    name: String,
}

impl RuleRef {
    /// Reference to a rule in the declaring manifest.
    pub fn local(name: impl Into<String>) -> Self {
        RuleRef {
            package: None,
            name: name.into(),
        }
    }

    pub fn package(&self) -> Option<&PackagePath> {
        self.package.as_ref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_local(&self) -> bool {
        self.package.is_none()
    }

    /// Qualify the reference relative to the package that declares it.
    pub fn resolve(&self, current: &PackagePath) -> RuleId {
        let package = self.package.clone().unwrap_or_else(|| current.clone());
        RuleId::new(package, self.name.clone())
    }
}

impl FromStr for RuleRef {
    type Err = RuleRefError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Err(RuleRefError::Empty);
        }

        match s.split_once(':') {
            Some((package, name)) => {
                if name.is_empty() {
                    return Err(RuleRefError::EmptyName(s.to_string()));
                }
                if !is_valid_component(name) {
                    return Err(RuleRefError::InvalidName(name.to_string()));
                }
                let package = if package.is_empty() {
                    None
                } else {
                    Some(PackagePath::new(package)?)
                };
                Ok(RuleRef {
                    package,
                    name: name.to_string(),
                })
            }
            None => {
                let package = PackagePath::new(s)?;
                let name = package
                    .last_component()
                    .ok_or_else(|| RuleRefError::EmptyName(s.to_string()))?
                    .to_string();
                Ok(RuleRef {
                    package: Some(package),
                    name,
                })
            }
        }
    }
}

impl fmt::Display for RuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.package {
            Some(package) => write!(f, "{}:{}", package, self.name),
            None => write!(f, ":{}", self.name),
        }
    }
}

/// Check that `name` is usable as a rule name.
pub fn validate_rule_name(name: &str) -> Result<(), RuleRefError> {
    if name.is_empty() {
        return Err(RuleRefError::EmptyName(name.to_string()));
    }
    if !is_valid_component(name) {
        return Err(RuleRefError::InvalidName(name.to_string()));
    }
    Ok(())
}
