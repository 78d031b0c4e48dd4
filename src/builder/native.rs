//! Native C/C++ compiler driver.
//!
//! Compiles sources in parallel, then archives and links in plan order.
//! Every step is fingerprinted and skipped when its output is up to date.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use rayon::prelude::*;
use serde::Serialize;

use crate::builder::context::BuildContext;
use crate::builder::executor::BuildProgress;
use crate::builder::fingerprint::StepFingerprint;
use crate::builder::plan::{ArchiveStep, BuildPlan, BuildStep, CompileStep, LinkStep};
use crate::builder::toolchain::CommandSpec;
use crate::util::fs::{ensure_dir, remove_file_if_exists};

/// A file produced by the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Artifact {
    /// Rule the artifact belongs to
    pub rule: String,
    pub path: PathBuf,
}

/// What a build run did.
#[derive(Debug, Default)]
pub struct BuildOutcome {
    pub artifacts: Vec<Artifact>,
    /// Steps that ran
    pub executed: usize,
    /// Steps skipped as up to date
    pub fresh: usize,
}

enum StepResult {
    Executed,
    Fresh,
}

/// Native C/C++ builder.
pub struct NativeBuilder<'a> {
    ctx: &'a BuildContext,
    progress: Option<BuildProgress>,
}

impl<'a> NativeBuilder<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        NativeBuilder {
            ctx,
            progress: None,
        }
    }

    pub fn with_progress(mut self, progress: BuildProgress) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Execute the build plan.
    ///
    /// Compile steps run in parallel on a pool of `ctx.jobs` threads; archive
    /// and link steps run sequentially afterwards.
    pub fn execute(&self, plan: &BuildPlan) -> Result<BuildOutcome> {
        let mut outcome = BuildOutcome::default();

        let compile_steps: Vec<&CompileStep> = plan.compile_steps().collect();
        if !compile_steps.is_empty() {
            tracing::info!("compiling {} file(s)", compile_steps.len());

            let mut pool = rayon::ThreadPoolBuilder::new();
            if let Some(jobs) = self.ctx.jobs {
                pool = pool.num_threads(jobs);
            }
            let pool = pool.build().context("failed to start compile workers")?;

            let results: Vec<Result<StepResult>> =
                pool.install(|| compile_steps.par_iter().map(|step| self.compile(step)).collect());

            let mut failures = Vec::new();
            for result in results {
                match result {
                    Ok(step) => outcome.record(step),
                    Err(e) => failures.push(e),
                }
            }
            if let Some(first) = failures.into_iter().next() {
                return Err(first);
            }
        }

        for step in &plan.steps {
            let (result, artifact) = match step {
                BuildStep::Compile(_) => continue,
                BuildStep::Archive(s) => (self.archive(s)?, artifact(&s.rule, &s.output)),
                BuildStep::Link(s) => (self.link(s)?, artifact(&s.rule, &s.output)),
            };
            outcome.record(result);
            outcome.artifacts.push(artifact);
        }

        Ok(outcome)
    }

    /// Compile a single source file.
    fn compile(&self, step: &CompileStep) -> Result<StepResult> {
        let command = self.ctx.toolchain.compile_command(step);

        let mut inputs = vec![step.source.clone()];
        inputs.extend(step.inputs.iter().cloned());

        let result = self.run_fingerprinted(&command, &inputs, &step.output, || {
            tracing::debug!(
                "compiling {} -> {} ({})",
                step.source.display(),
                step.output.display(),
                step.lang.as_str()
            );
            Ok(())
        });

        if let Some(progress) = &self.progress {
            progress.compiled(&step.source);
        }
        result.with_context(|| format!("compilation failed for {}", step.source.display()))
    }

    /// Create a static library.
    fn archive(&self, step: &ArchiveStep) -> Result<StepResult> {
        let command = self.ctx.toolchain.archive_command(step);

        let result = self.run_fingerprinted(&command, &step.objects, &step.output, || {
            tracing::debug!("creating static library {}", step.output.display());
            // `ar rcs` would keep members from a previous build.
            remove_file_if_exists(&step.output)?;
            Ok(())
        });

        if let Some(progress) = &self.progress {
            progress.linked(&step.output);
        }
        result.with_context(|| format!("archiving failed for {}", step.rule))
    }

    /// Link an executable.
    fn link(&self, step: &LinkStep) -> Result<StepResult> {
        let command = self.ctx.toolchain.link_command(step);

        let mut inputs = step.objects.clone();
        inputs.extend(step.archives.iter().cloned());

        let result = self.run_fingerprinted(&command, &inputs, &step.output, || {
            tracing::debug!("linking {}", step.output.display());
            Ok(())
        });

        if let Some(progress) = &self.progress {
            progress.linked(&step.output);
        }
        result.with_context(|| format!("linking failed for {}", step.rule))
    }

    /// Run `command` unless `output` is fresh, recording a new fingerprint
    /// on success.
    fn run_fingerprinted(
        &self,
        command: &CommandSpec,
        inputs: &[PathBuf],
        output: &Path,
        before: impl FnOnce() -> Result<()>,
    ) -> Result<StepResult> {
        let fingerprint = StepFingerprint::compute(command, inputs)?;
        if fingerprint.is_fresh(output) {
            tracing::debug!("fresh: {}", output.display());
            return Ok(StepResult::Fresh);
        }

        if let Some(parent) = output.parent() {
            ensure_dir(parent)?;
        }
        before()?;

        let process = command.to_process();
        tracing::debug!("running: {}", process.display_command());
        process.run()?;

        fingerprint.save(output)?;
        Ok(StepResult::Executed)
    }
}

impl BuildOutcome {
    fn record(&mut self, result: StepResult) {
        match result {
            StepResult::Executed => self.executed += 1,
            StepResult::Fresh => self.fresh += 1,
        }
    }

    /// Whether every step was already up to date.
    pub fn is_fresh(&self) -> bool {
        self.executed == 0
    }
}

fn artifact(rule: &str, path: &Path) -> Artifact {
    Artifact {
        rule: rule.to_string(),
        path: path.to_path_buf(),
    }
}
