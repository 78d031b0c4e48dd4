//! `fl-build tree` command

use anyhow::Result;

use crate::cli::TreeArgs;
use flbuild::core::Workspace;
use flbuild::ops::fl_build::resolve_target;
use flbuild::ops::tree::{render_tree, TreeOptions};
use flbuild::resolver::RuleGraph;
use flbuild::util::GlobalContext;

pub fn execute(args: TreeArgs, ctx: &GlobalContext) -> Result<()> {
    let mut ws = Workspace::new(ctx.root())?;
    let target = resolve_target(&mut ws, ctx.cwd(), &args.target)?;

    let graph = RuleGraph::build(&mut ws, std::slice::from_ref(&target))?;

    let opts = TreeOptions {
        max_depth: args.depth,
        duplicates: args.duplicates,
    };
    print!("{}", render_tree(&graph, &target, opts));

    Ok(())
}
