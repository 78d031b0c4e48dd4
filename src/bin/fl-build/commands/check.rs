//! `fl-build check` command

use anyhow::{bail, Result};

use crate::cli::CheckArgs;
use flbuild::core::Workspace;
use flbuild::ops::check::{validate, CheckScope};
use flbuild::ops::fl_build::resolve_target;
use flbuild::util::diagnostic;
use flbuild::util::GlobalContext;

pub fn execute(args: CheckArgs, ctx: &GlobalContext) -> Result<()> {
    let mut ws = Workspace::new(ctx.root())?;

    let scope = match args.target.as_deref() {
        Some(target) => CheckScope::Closure(vec![resolve_target(&mut ws, ctx.cwd(), target)?]),
        None => CheckScope::Tree,
    };

    let report = validate(&mut ws, &scope);
    for diag in &report.diagnostics {
        diagnostic::emit(diag, ctx.color());
    }

    eprintln!(
        "     Checked {} manifest(s), {} rule(s): {} error(s), {} warning(s)",
        report.manifests,
        report.rules,
        report.error_count(),
        report.warning_count()
    );

    if !report.is_ok() {
        bail!("validation failed with {} error(s)", report.error_count());
    }
    Ok(())
}
