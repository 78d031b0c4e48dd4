//! Core data structures for fl-build.
//!
//! - Package paths, rule ids and dependency references
//! - Rule declarations (`librule`, `binrule`)
//! - `build.py` manifests and their parser
//! - The workspace that maps package paths to manifests

pub mod manifest;
pub mod reference;
pub mod rule;
pub mod workspace;

pub use manifest::{Manifest, ManifestError, ManifestParseError, MANIFEST_NAME};
pub use reference::{PackagePath, RuleId, RuleRef, RuleRefError};
pub use rule::{Language, Rule, RuleKind};
pub use workspace::{Workspace, BUILD_DIR_NAME};
