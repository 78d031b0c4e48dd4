//! C/C++ build system.
//!
//! Turns a resolved rule graph into a build plan, then either runs the plan
//! with the native compiler driver or renders it as a Makefile.

pub mod context;
pub mod executor;
pub mod fingerprint;
pub mod makefile;
pub mod mode;
pub mod native;
pub mod plan;
pub mod toolchain;

pub use context::BuildContext;
pub use executor::BuildExecutor;
pub use mode::BuildMode;
pub use native::{Artifact, BuildOutcome, NativeBuilder};
pub use plan::BuildPlan;
pub use toolchain::{CommandSpec, CompilerFamily, Toolchain};
