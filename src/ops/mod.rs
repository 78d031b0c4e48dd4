//! High-level operations.
//!
//! This module contains the implementation of fl-build commands.

pub mod check;
pub mod clean;
pub mod env;
pub mod fl_build;
pub mod tree;

pub use check::{validate, CheckScope, ValidationReport};
pub use clean::{clean, CleanOptions};
pub use env::{env_script, resolve_root, ShellKind};
pub use fl_build::{build, effective_settings, resolve_target, BuildOptions, BuildResult};
pub use tree::{render_tree, TreeOptions};
