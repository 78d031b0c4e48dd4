//! Dependency resolution.
//!
//! Turns the `deplibs` references of a set of rules into a [`RuleGraph`],
//! loading manifests on demand. Resolution is deterministic: ties in the
//! build order are broken by rule id.

pub mod errors;
pub mod graph;

pub use errors::ResolveError;
pub use graph::{RuleGraph, RuleNode};
