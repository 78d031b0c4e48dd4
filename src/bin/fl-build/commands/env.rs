//! `fl-build env` command

use anyhow::{anyhow, Context, Result};

use crate::cli::EnvArgs;
use flbuild::ops::env::{env_script, resolve_root, ShellKind};
use flbuild::util::config::{global_config_path, Config};
use flbuild::util::GlobalContext;

pub fn execute(args: EnvArgs, ctx: &GlobalContext) -> Result<()> {
    let root = resolve_root(ctx.cwd(), &args.root)?;
    let shell: ShellKind = args.shell.parse().map_err(|e| anyhow!("{}", e))?;

    if args.persist {
        let path = global_config_path().context("could not determine the home directory")?;
        let mut config = Config::load_or_default(&path);
        config.paths.root = Some(root.clone());
        config.save(&path)?;
        eprintln!("       Saved root to {}", path.display());
    }

    print!("{}", env_script(&root, shell));
    Ok(())
}
