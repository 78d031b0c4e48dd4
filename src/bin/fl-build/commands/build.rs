//! `fl-build [build] <target>` command

use anyhow::{bail, Result};

use crate::cli::BuildArgs;
use crate::commands::parse_settings;
use flbuild::core::Workspace;
use flbuild::ops::fl_build::{build, resolve_target, BuildOptions};
use flbuild::util::diagnostic::suggestions;
use flbuild::util::GlobalContext;

pub fn execute(args: BuildArgs, ctx: &GlobalContext, verbose: bool) -> Result<()> {
    let Some(target) = args.target.as_deref() else {
        bail!("no target given\n{}", suggestions::TARGET_NOT_FOUND);
    };

    let config = ctx.config();
    let mut ws = Workspace::new(ctx.root())?;
    let target = resolve_target(&mut ws, ctx.cwd(), target)?;

    let (mode, compiler) = parse_settings(args.mode.as_deref(), args.compiler.as_deref())?;

    // Jobs: CLI > config > None (auto-detect)
    let jobs = args.jobs.or(config.build.jobs);

    let opts = BuildOptions {
        mode,
        compiler,
        jobs,
        emit_plan: args.plan,
        makefile_only: args.makefile_only,
        copy_to: (!args.no_copy).then(|| ctx.cwd().to_path_buf()),
        verbose,
    };

    let result = build(&mut ws, &target, &opts, &config)?;

    if args.plan {
        println!("{}", result.plan.to_json()?);
        return Ok(());
    }

    if let Some(makefile) = &result.makefile {
        eprintln!("       Wrote {}", makefile.display());
    }

    if let Some(artifact) = &result.plan.artifact {
        if result.outcome.is_some() {
            eprintln!("    Artifact `{}` -> {}", target, artifact.display());
        }
    }
    if let Some(copied) = &result.copied {
        eprintln!("      Copied {}", copied.display());
    }

    Ok(())
}
