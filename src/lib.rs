//! fl-build - reader, validator and builder for `build.py` manifests
//!
//! This crate provides the core library functionality for fl-build,
//! including manifest parsing, dependency resolution, build planning and
//! execution.

pub mod builder;
pub mod core;
pub mod ops;
pub mod resolver;
pub mod util;

/// Test utilities for fl-build unit tests.
///
/// Only available when compiling with `--cfg test`. Provides a fixture
/// builder for temporary source trees.
#[cfg(test)]
pub mod test_support;

pub use core::{Manifest, Rule, RuleId, RuleRef, Workspace};
pub use resolver::RuleGraph;
pub use util::context::GlobalContext;
