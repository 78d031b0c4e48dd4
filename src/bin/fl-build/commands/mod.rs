//! Command implementations

pub mod build;
pub mod check;
pub mod clean;
pub mod completions;
pub mod env;
pub mod rules;
pub mod tree;

use anyhow::{anyhow, Result};

use flbuild::builder::{BuildMode, CompilerFamily};

/// Parse the `--mode` and `--compiler` flags.
pub(crate) fn parse_settings(
    mode: Option<&str>,
    compiler: Option<&str>,
) -> Result<(Option<BuildMode>, Option<CompilerFamily>)> {
    let mode = mode
        .map(|m| m.parse::<BuildMode>())
        .transpose()
        .map_err(|e| anyhow!("{}", e))?;
    let compiler = compiler
        .map(|c| c.parse::<CompilerFamily>())
        .transpose()
        .map_err(|e| anyhow!("{}", e))?;
    Ok((mode, compiler))
}
