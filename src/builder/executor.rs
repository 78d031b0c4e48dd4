//! Build executor with progress reporting.

use std::path::Path;
use std::time::Instant;

use anyhow::Result;
use indicatif::{ProgressBar, ProgressStyle};

use crate::builder::context::BuildContext;
use crate::builder::native::{BuildOutcome, NativeBuilder};
use crate::builder::plan::BuildPlan;

/// Build executor with progress tracking.
pub struct BuildExecutor<'a> {
    ctx: &'a BuildContext,
    verbose: bool,
}

impl<'a> BuildExecutor<'a> {
    pub fn new(ctx: &'a BuildContext) -> Self {
        BuildExecutor {
            ctx,
            verbose: false,
        }
    }

    /// Enable verbose output (disables the progress bar).
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Execute a build plan with progress reporting.
    pub fn execute(&self, plan: &BuildPlan) -> Result<BuildOutcome> {
        let start = Instant::now();

        let total_compile = plan.compile_count();
        let total_link = plan.steps.len() - total_compile;

        if self.verbose {
            eprintln!("   Compiling {} file(s)", total_compile);
            eprintln!("     Linking {} artifact(s)", total_link);
        }

        let mut progress = BuildProgress::new(total_compile, total_link);
        if !self.verbose && progress.total() > 1 {
            progress = progress.with_bar();
        }

        let result = NativeBuilder::new(self.ctx)
            .with_progress(progress.clone())
            .execute(plan);
        progress.finish();
        let outcome = result?;

        let elapsed = start.elapsed();
        if outcome.is_fresh() {
            eprintln!("       Fresh {} ({} mode)", plan.target, plan.mode);
        } else {
            eprintln!(
                "    Finished {} ({} mode) in {:.2}s",
                plan.target,
                plan.mode,
                elapsed.as_secs_f64()
            );
        }

        Ok(outcome)
    }
}

/// Progress callback for build steps.
///
/// Clones share one bar, so compile jobs on the rayon pool can report
/// independently.
#[derive(Clone)]
pub struct BuildProgress {
    total: usize,
    bar: Option<ProgressBar>,
}

impl BuildProgress {
    pub fn new(total_compile: usize, total_link: usize) -> Self {
        BuildProgress {
            total: total_compile + total_link,
            bar: None,
        }
    }

    /// Draw a progress bar on stderr.
    pub fn with_bar(mut self) -> Self {
        let bar = ProgressBar::new(self.total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        bar.set_style(style);
        self.bar = Some(bar);
        self
    }

    /// Record a finished compilation.
    pub fn compiled(&self, source: &Path) {
        self.tick(source);
    }

    /// Record a finished archive or link.
    pub fn linked(&self, output: &Path) {
        self.tick(output);
    }

    fn tick(&self, path: &Path) {
        if let Some(bar) = &self.bar {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            bar.set_message(name);
            bar.inc(1);
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    fn finish(&self) {
        if let Some(bar) = &self.bar {
            bar.finish_and_clear();
        }
    }
}
