//! `fl-build clean` command

use anyhow::Result;

use crate::cli::CleanArgs;
use crate::commands::parse_settings;
use flbuild::core::Workspace;
use flbuild::ops::clean::{clean, CleanOptions};
use flbuild::ops::fl_build::{effective_settings, resolve_target};
use flbuild::util::GlobalContext;

pub fn execute(args: CleanArgs, ctx: &GlobalContext) -> Result<()> {
    let config = ctx.config();
    let mut ws = Workspace::new(ctx.root())?;

    let target = args
        .target
        .as_deref()
        .map(|t| resolve_target(&mut ws, ctx.cwd(), t))
        .transpose()?;

    let (mode, compiler) = parse_settings(args.mode.as_deref(), args.compiler.as_deref())?;
    let (mode, compiler) = effective_settings(mode, compiler, &config)?;

    let opts = CleanOptions {
        target,
        mode,
        compiler,
        all: args.all,
    };

    let removed = clean(&mut ws, &opts, &config)?;
    if removed.is_empty() {
        eprintln!("     Nothing to clean");
    }
    for path in &removed {
        eprintln!("     Removed {}", path.display());
    }

    Ok(())
}
