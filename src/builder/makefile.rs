//! Makefile generation.
//!
//! Renders a build plan as a standalone Makefile so that `make` rebuilds
//! only what changed and `make clean` forces recompilation.

use std::fmt::Write as _;
use std::path::{Path, PathBuf};

use anyhow::Result;

use crate::builder::plan::{BuildPlan, BuildStep};
use crate::builder::toolchain::Toolchain;
use crate::core::Language;
use crate::util::fs::write_string;

pub const MAKEFILE_NAME: &str = "Makefile";

/// Render `plan` as a Makefile.
///
/// With `local_copy`, `all` also refreshes that copy of the artifact and
/// `clean` removes it.
pub fn render(plan: &BuildPlan, toolchain: &Toolchain, local_copy: Option<&Path>) -> String {
    let mut out = String::new();

    // `write!` into a String cannot fail.
    let _ = writeln!(
        out,
        "# Generated by fl-build for {} (mode {}, compiler {}).",
        plan.target, plan.mode, plan.compiler
    );
    let _ = writeln!(out, "# Regenerate with `fl-build {} --makefile-only`.\n", plan.target);

    let _ = writeln!(out, "CC = {}", toolchain.cc.display());
    let _ = writeln!(out, "CXX = {}", toolchain.cxx.display());
    let _ = writeln!(out, "AR = {}\n", toolchain.ar.display());

    let _ = writeln!(out, ".PHONY: all clean\n");

    match (&plan.artifact, local_copy) {
        (Some(artifact), Some(copy)) => {
            let _ = writeln!(out, "all: {}\n", copy.display());
            let _ = writeln!(out, "{}: {}", copy.display(), artifact.display());
            let _ = writeln!(out, "\tcp -f $< $@\n");
        }
        (Some(artifact), None) => {
            let _ = writeln!(out, "all: {}\n", artifact.display());
        }
        (None, _) => {
            let _ = writeln!(out, "all:\n");
        }
    }

    for step in &plan.steps {
        match step {
            BuildStep::Compile(c) => {
                let mut prereqs = vec![c.source.clone()];
                prereqs.extend(c.inputs.iter().cloned());
                let compiler = match c.lang {
                    Language::C => "$(CC)",
                    Language::Cxx => "$(CXX)",
                };
                rule(
                    &mut out,
                    &c.output,
                    &prereqs,
                    compiler,
                    &toolchain.compile_args(c),
                );
            }
            BuildStep::Archive(a) => {
                // `ar rcs` appends, so start from an empty archive.
                let _ = writeln!(out, "{}: {}", a.output.display(), join(&a.objects));
                let _ = writeln!(out, "\t@mkdir -p $(@D)");
                let _ = writeln!(out, "\t@rm -f $@");
                let _ = writeln!(out, "\t$(AR) {}\n", toolchain.archive_args(a).join(" "));
            }
            BuildStep::Link(l) => {
                let mut prereqs = l.objects.clone();
                prereqs.extend(l.archives.iter().cloned());
                let driver = if l.use_cxx_linker { "$(CXX)" } else { "$(CC)" };
                rule(&mut out, &l.output, &prereqs, driver, &toolchain.link_args(l));
            }
        }
    }

    let _ = writeln!(out, "clean:");
    for output in plan.outputs() {
        let _ = writeln!(out, "\trm -f {}", output.display());
    }
    if let (Some(_), Some(copy)) = (&plan.artifact, local_copy) {
        let _ = writeln!(out, "\trm -f {}", copy.display());
    }

    out
}

/// Write the Makefile for `plan` into `dir`.
pub fn write(
    plan: &BuildPlan,
    toolchain: &Toolchain,
    dir: &Path,
    local_copy: Option<&Path>,
) -> Result<PathBuf> {
    let path = dir.join(MAKEFILE_NAME);
    write_string(&path, &render(plan, toolchain, local_copy))?;
    tracing::debug!("wrote {}", path.display());
    Ok(path)
}

fn rule(out: &mut String, target: &Path, prereqs: &[PathBuf], program: &str, args: &[String]) {
    let _ = writeln!(out, "{}: {}", target.display(), join(prereqs));
    let _ = writeln!(out, "\t@mkdir -p $(@D)");
    let _ = writeln!(out, "\t{} {}\n", program, args.join(" "));
}

fn join(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" ")
}
