//! Dependency tree rendering for `fl-build tree`.

use std::collections::HashSet;

use crate::core::RuleId;
use crate::resolver::{RuleGraph, RuleNode};

/// Options for rendering a tree.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreeOptions {
    /// Maximum depth to display (None = unlimited)
    pub max_depth: Option<usize>,
    /// Expand subtrees that were already printed
    pub duplicates: bool,
}

/// Render the dependencies of `root` as an indented tree.
///
/// A rule whose subtree was already printed is marked `(*)` and not expanded
/// again unless `duplicates` is set.
pub fn render_tree(graph: &RuleGraph, root: &RuleId, opts: TreeOptions) -> String {
    let mut out = String::new();
    let Some(node) = graph.node(root) else {
        return out;
    };

    out.push_str(&label(node));
    out.push('\n');

    let mut seen = HashSet::new();
    seen.insert(root.clone());
    render_children(graph, root, "", 1, opts, &mut seen, &mut out);
    out
}

fn render_children(
    graph: &RuleGraph,
    id: &RuleId,
    prefix: &str,
    depth: usize,
    opts: TreeOptions,
    seen: &mut HashSet<RuleId>,
    out: &mut String,
) {
    if opts.max_depth.is_some_and(|max| depth > max) {
        return;
    }

    let deps = graph.deps(id);
    let count = deps.len();
    for (i, dep) in deps.into_iter().enumerate() {
        let last = i + 1 == count;
        let branch = if last { "└── " } else { "├── " };

        let repeated = !seen.insert(dep.id.clone());
        let marker = if repeated && !opts.duplicates { " (*)" } else { "" };
        out.push_str(&format!(
            "{}{}{}{}\n",
            prefix,
            branch,
            label(dep),
            marker
        ));

        if repeated && !opts.duplicates {
            continue;
        }

        let child_prefix = format!("{}{}", prefix, if last { "    " } else { "│   " });
        render_children(graph, &dep.id, &child_prefix, depth + 1, opts, seen, out);
    }
}

fn label(node: &RuleNode) -> String {
    if node.rule.is_header_only() {
        format!("{} [{}, headers only]", node.id, node.rule.kind)
    } else {
        format!("{} [{}]", node.id, node.rule.kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PackagePath, Workspace};
    use crate::test_support::TreeFixture;

    fn diamond() -> (TreeFixture, RuleId) {
        let tree = TreeFixture::new()
            .library("fastlib/base", &["common.cc"], &[], &[])
            .library("fastlib/col", &[], &["arraylist.h"], &["fastlib/base"])
            .library("fastlib/math", &["math.cc"], &[], &["fastlib/base", "fastlib/col"])
            .manifest(
                "app",
                "binrule(name = 'main', sources = ['main.cc'], deplibs = ['fastlib/math', 'fastlib/col'])",
            )
            .file("app/main.cc", "");
        let id = RuleId::new(PackagePath::new("app").unwrap(), "main");
        (tree, id)
    }

    #[test]
    fn test_render_marks_repeats() {
        let (tree, id) = diamond();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let graph = RuleGraph::build(&mut ws, std::slice::from_ref(&id)).unwrap();

        let out = render_tree(&graph, &id, TreeOptions::default());
        let expected = "\
app:main [binrule]
├── fastlib/math:math [librule]
│   ├── fastlib/base:base [librule]
│   └── fastlib/col:col [librule, headers only]
│       └── fastlib/base:base [librule] (*)
└── fastlib/col:col [librule, headers only] (*)
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_depth_limit() {
        let (tree, id) = diamond();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let graph = RuleGraph::build(&mut ws, std::slice::from_ref(&id)).unwrap();

        let opts = TreeOptions {
            max_depth: Some(1),
            ..Default::default()
        };
        let out = render_tree(&graph, &id, opts);
        assert_eq!(out.lines().count(), 3);
        assert!(!out.contains("fastlib/base"));
    }

    #[test]
    fn test_render_duplicates_expanded() {
        let (tree, id) = diamond();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let graph = RuleGraph::build(&mut ws, std::slice::from_ref(&id)).unwrap();

        let opts = TreeOptions {
            duplicates: true,
            ..Default::default()
        };
        let out = render_tree(&graph, &id, opts);
        assert!(!out.contains("(*)"));
        assert_eq!(out.matches("fastlib/base:base").count(), 3);
    }
}
