//! Implementation of `fl-build <target>`.

use std::path::{Path, PathBuf};

use anyhow::{bail, Result};

use crate::builder::{
    makefile, BuildContext, BuildExecutor, BuildMode, BuildOutcome, BuildPlan, CompilerFamily,
};
use crate::core::reference::validate_rule_name;
use crate::core::{RuleId, RuleRef, Workspace};
use crate::resolver::RuleGraph;
use crate::util::config::Config;
use crate::util::diagnostic::suggestions;
use crate::util::fs::copy_file;

/// Options for the build command.
#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Build mode (None = config, then `check`)
    pub mode: Option<BuildMode>,

    /// Compiler family (None = config, then gcc)
    pub compiler: Option<CompilerFamily>,

    /// Number of parallel jobs
    pub jobs: Option<usize>,

    /// Stop after planning
    pub emit_plan: bool,

    /// Write the Makefile but do not compile
    pub makefile_only: bool,

    /// Copy a built binary into this directory
    pub copy_to: Option<PathBuf>,

    /// Verbose output
    pub verbose: bool,
}

/// What a build produced.
#[derive(Debug)]
pub struct BuildResult {
    pub plan: BuildPlan,
    pub makefile: Option<PathBuf>,
    /// `None` when nothing was executed
    pub outcome: Option<BuildOutcome>,
    /// Copy of the binary in the invoking directory
    pub copied: Option<PathBuf>,
}

/// Resolve a command-line target relative to `cwd`.
///
/// A bare name is a rule of the manifest in `cwd`; anything containing `:`
/// or `/` is a rule reference relative to the package of `cwd`.
pub fn resolve_target(ws: &mut Workspace, cwd: &Path, target: &str) -> Result<RuleId> {
    let current = ws.package_for_dir(cwd);

    if target.contains(':') || target.contains('/') {
        let reference: RuleRef = target.parse()?;
        let current = match (&current, reference.is_local()) {
            (Ok(package), _) => package.clone(),
            (Err(_), false) => Default::default(),
            (Err(e), true) => bail!("{:#}\n{}", e, suggestions::SET_ROOT),
        };
        return Ok(reference.resolve(&current));
    }

    validate_rule_name(target)?;
    let current = match current {
        Ok(package) => package,
        Err(e) => bail!("{:#}\n{}", e, suggestions::SET_ROOT),
    };
    if ws.manifest(&current)?.is_none() {
        bail!(
            "no {} in {}\n{}",
            crate::core::MANIFEST_NAME,
            cwd.display(),
            suggestions::NO_MANIFEST
        );
    }
    Ok(RuleRef::local(target).resolve(&current))
}

/// Effective mode and compiler: options, then config, then defaults.
pub fn effective_settings(
    opts_mode: Option<BuildMode>,
    opts_compiler: Option<CompilerFamily>,
    config: &Config,
) -> Result<(BuildMode, CompilerFamily)> {
    let mode = match opts_mode {
        Some(mode) => mode,
        None => config.mode()?.unwrap_or_default(),
    };
    let compiler = match opts_compiler {
        Some(compiler) => compiler,
        None => config.compiler()?.unwrap_or_default(),
    };
    Ok((mode, compiler))
}

/// Plan and build `target`.
pub fn build(
    ws: &mut Workspace,
    target: &RuleId,
    opts: &BuildOptions,
    config: &Config,
) -> Result<BuildResult> {
    let graph = RuleGraph::build(ws, std::slice::from_ref(target))?;

    let (mode, compiler) = effective_settings(opts.mode, opts.compiler, config)?;
    let ctx = BuildContext::new(ws, mode, compiler, config).with_jobs(opts.jobs);

    let plan = BuildPlan::new(&ctx, &graph, target)?;
    tracing::debug!(
        "{}: {} compile step(s), {} step(s) total",
        plan.target,
        plan.compile_count(),
        plan.steps.len()
    );

    if opts.emit_plan {
        return Ok(BuildResult {
            plan,
            makefile: None,
            outcome: None,
            copied: None,
        });
    }

    let manifest_dir = match graph.node(target) {
        Some(node) => node.dir.clone(),
        None => bail!("rule `{}` missing from its own graph", target),
    };
    let is_binary = graph.node(target).is_some_and(|n| n.rule.is_binary());
    let local_copy = match (&opts.copy_to, &plan.artifact) {
        (Some(dir), Some(artifact)) if is_binary => local_copy_path(artifact, dir),
        _ => None,
    };
    let makefile = makefile::write(&plan, &ctx.toolchain, &manifest_dir, local_copy.as_deref())?;

    if opts.makefile_only {
        return Ok(BuildResult {
            plan,
            makefile: Some(makefile),
            outcome: None,
            copied: None,
        });
    }

    if !plan.steps.is_empty() {
        ctx.toolchain.check_available(plan.needs_c(), plan.needs_cxx())?;
    }

    tracing::info!("building {} ({} mode, {})", target, mode, compiler);
    let outcome = BuildExecutor::new(&ctx)
        .verbose(opts.verbose)
        .execute(&plan)?;

    let copied = match (&local_copy, &plan.artifact) {
        (Some(dest), Some(artifact)) => {
            copy_file(artifact, dest)?;
            tracing::debug!("copied {} to {}", artifact.display(), dest.display());
            Some(dest.clone())
        }
        _ => None,
    };

    Ok(BuildResult {
        plan,
        makefile: Some(makefile),
        outcome: Some(outcome),
        copied,
    })
}

/// Where the invoking directory's copy of a binary goes. `make` keeps it in
/// sync with the artifact.
fn local_copy_path(artifact: &Path, dir: &Path) -> Option<PathBuf> {
    let dest = dir.join(artifact.file_name()?);
    (dest != artifact).then_some(dest)
}
