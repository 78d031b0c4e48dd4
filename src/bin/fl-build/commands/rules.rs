//! `fl-build rules` command

use anyhow::{bail, Result};

use crate::cli::RulesArgs;
use flbuild::core::{Workspace, MANIFEST_NAME};
use flbuild::util::diagnostic::suggestions;
use flbuild::util::GlobalContext;

pub fn execute(args: RulesArgs, ctx: &GlobalContext) -> Result<()> {
    let dir = match args.dir {
        Some(dir) if dir.is_absolute() => dir,
        Some(dir) => ctx.cwd().join(dir),
        None => ctx.cwd().to_path_buf(),
    };

    let mut ws = Workspace::new(ctx.root())?;
    let package = ws.package_for_dir(&dir)?;

    let Some(manifest) = ws.manifest(&package)? else {
        bail!(
            "no {} in {}\n{}",
            MANIFEST_NAME,
            dir.display(),
            suggestions::NO_MANIFEST
        );
    };

    for rule in manifest.rules() {
        println!("{} {}:{}", rule.kind, package, rule.name);
        print_list("sources", &rule.sources);
        print_list("headers", &rule.headers);
        let deplibs: Vec<String> = rule.deplibs.iter().map(|d| d.to_string()).collect();
        print_list("deplibs", &deplibs);
    }

    Ok(())
}

fn print_list(label: &str, items: &[String]) {
    if !items.is_empty() {
        println!("    {}: {}", label, items.join(", "));
    }
}
