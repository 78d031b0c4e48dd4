//! Implementation of `fl-build clean`.

use std::path::PathBuf;

use anyhow::Result;

use crate::builder::fingerprint::StepFingerprint;
use crate::builder::{BuildContext, BuildMode, BuildPlan, CompilerFamily};
use crate::core::{RuleId, Workspace};
use crate::resolver::RuleGraph;
use crate::util::config::Config;
use crate::util::fs::{remove_dir_all_if_exists, remove_file_if_exists};

/// Options for the clean command.
#[derive(Debug, Clone, Default)]
pub struct CleanOptions {
    /// Remove only the outputs of this rule's plan
    pub target: Option<RuleId>,
    pub mode: BuildMode,
    pub compiler: CompilerFamily,
    /// Remove the whole build directory
    pub all: bool,
}

/// Remove build outputs. Returns what was removed.
pub fn clean(ws: &mut Workspace, opts: &CleanOptions, config: &Config) -> Result<Vec<PathBuf>> {
    if opts.all {
        let build_dir = ws.build_dir().to_path_buf();
        if !build_dir.exists() {
            return Ok(Vec::new());
        }
        remove_dir_all_if_exists(&build_dir)?;
        return Ok(vec![build_dir]);
    }

    let Some(target) = &opts.target else {
        let output_dir = ws.output_dir(opts.compiler.as_str(), opts.mode);
        if !output_dir.exists() {
            return Ok(Vec::new());
        }
        remove_dir_all_if_exists(&output_dir)?;
        return Ok(vec![output_dir]);
    };

    let graph = RuleGraph::build(ws, std::slice::from_ref(target))?;
    let ctx = BuildContext::new(ws, opts.mode, opts.compiler, config);
    let plan = BuildPlan::new(&ctx, &graph, target)?;

    let mut removed = Vec::new();
    for output in plan.outputs() {
        if remove_file_if_exists(output)? {
            removed.push(output.to_path_buf());
        }
        remove_file_if_exists(&StepFingerprint::path_for(output))?;
    }
    tracing::debug!("removed {} output(s) of {}", removed.len(), target);
    Ok(removed)
}
