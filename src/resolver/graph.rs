//! The rule dependency graph.
//!
//! Edges point from a dependent to its dependency. The graph only ever holds
//! the closure of the rules it was built from.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};
use std::path::PathBuf;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{Dfs, EdgeRef};
use petgraph::Direction;

use crate::core::{PackagePath, Rule, RuleId, Workspace};
use crate::resolver::errors::ResolveError;

/// A rule together with the directory its paths are relative to.
#[derive(Debug, Clone)]
pub struct RuleNode {
    pub id: RuleId,
    pub rule: Rule,
    pub dir: PathBuf,
}

/// Dependency graph over a rule closure.
#[derive(Debug)]
pub struct RuleGraph {
    graph: DiGraph<RuleNode, ()>,
    index: HashMap<RuleId, NodeIndex>,
    /// Dependencies first; ties broken by `RuleId`.
    order: Vec<NodeIndex>,
}

impl RuleGraph {
    /// Load the transitive closure of `roots` from the workspace.
    pub fn build(ws: &mut Workspace, roots: &[RuleId]) -> Result<Self, ResolveError> {
        let mut graph: DiGraph<RuleNode, ()> = DiGraph::new();
        let mut index: HashMap<RuleId, NodeIndex> = HashMap::new();
        let mut queue: VecDeque<NodeIndex> = VecDeque::new();

        for root in roots {
            if !index.contains_key(root) {
                let node = load_node(ws, root, None)?;
                let idx = graph.add_node(node);
                index.insert(root.clone(), idx);
                queue.push_back(idx);
            }
        }

        while let Some(idx) = queue.pop_front() {
            let from = graph[idx].id.clone();
            let deps: Vec<RuleId> = graph[idx]
                .rule
                .deplibs
                .iter()
                .map(|r| r.resolve(&from.package))
                .collect();

            for dep in deps {
                let dep_idx = match index.get(&dep) {
                    Some(&existing) => existing,
                    None => {
                        let node = load_node(ws, &dep, Some(&from))?;
                        let new_idx = graph.add_node(node);
                        index.insert(dep.clone(), new_idx);
                        queue.push_back(new_idx);
                        new_idx
                    }
                };

                if graph[dep_idx].rule.is_binary() {
                    return Err(ResolveError::BinaryDependency {
                        from: from.to_string(),
                        target: dep.to_string(),
                    });
                }

                graph.update_edge(idx, dep_idx, ());
            }
        }

        let order = build_order(&graph)?;

        tracing::debug!(
            "resolved {} rule(s) from {} root(s)",
            graph.node_count(),
            roots.len()
        );

        Ok(RuleGraph {
            graph,
            index,
            order,
        })
    }

    pub fn len(&self) -> usize {
        self.graph.node_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn contains(&self, id: &RuleId) -> bool {
        self.index.contains_key(id)
    }

    pub fn node(&self, id: &RuleId) -> Option<&RuleNode> {
        self.index.get(id).map(|&idx| &self.graph[idx])
    }

    /// Every rule, dependencies before dependents.
    pub fn build_order(&self) -> Vec<&RuleNode> {
        self.order.iter().map(|&idx| &self.graph[idx]).collect()
    }

    /// Direct dependencies of `id`, in declaration order.
    pub fn deps(&self, id: &RuleId) -> Vec<&RuleNode> {
        let Some(node) = self.node(id) else {
            return Vec::new();
        };
        let mut seen = HashSet::new();
        node.rule
            .deplibs
            .iter()
            .map(|r| r.resolve(&id.package))
            .filter(|dep| seen.insert(dep.clone()))
            .filter_map(|dep| self.node(&dep))
            .collect()
    }

    /// Rules that list `id` directly in their deplibs.
    pub fn dependents(&self, id: &RuleId) -> Vec<&RuleNode> {
        let Some(&idx) = self.index.get(id) else {
            return Vec::new();
        };
        let mut nodes: Vec<&RuleNode> = self
            .graph
            .edges_directed(idx, Direction::Incoming)
            .map(|e| &self.graph[e.source()])
            .collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));
        nodes
    }

    /// Transitive dependencies of `id` (excluding itself), in build order.
    pub fn closure(&self, id: &RuleId) -> Vec<&RuleNode> {
        let Some(&start) = self.index.get(id) else {
            return Vec::new();
        };

        let mut reachable = HashSet::new();
        let mut dfs = Dfs::new(&self.graph, start);
        while let Some(idx) = dfs.next(&self.graph) {
            if idx != start {
                reachable.insert(idx);
            }
        }

        self.order
            .iter()
            .filter(|idx| reachable.contains(idx))
            .map(|&idx| &self.graph[idx])
            .collect()
    }

    /// Libraries to link for `id`: each library precedes the libraries it
    /// depends on.
    pub fn link_order(&self, id: &RuleId) -> Vec<&RuleNode> {
        let mut libs: Vec<&RuleNode> = self
            .closure(id)
            .into_iter()
            .filter(|n| n.rule.is_library())
            .collect();
        libs.reverse();
        libs
    }
}

fn load_node(
    ws: &mut Workspace,
    id: &RuleId,
    from: Option<&RuleId>,
) -> Result<RuleNode, ResolveError> {
    let from_name = from.map(|f| f.to_string());
    let expected = ws.manifest_path(&id.package);

    let Some(manifest) = ws.manifest(&id.package)? else {
        return Err(ResolveError::MissingPackage {
            package: display_package(&id.package),
            expected,
            from: from_name,
        });
    };

    let Some(rule) = manifest.rule(&id.name) else {
        return Err(ResolveError::UnknownRule {
            package: display_package(&id.package),
            name: id.name.clone(),
            from: from_name,
            available: manifest.rule_names().iter().map(|s| s.to_string()).collect(),
        });
    };

    Ok(RuleNode {
        id: id.clone(),
        rule: rule.clone(),
        dir: manifest.dir().to_path_buf(),
    })
}

fn display_package(package: &PackagePath) -> String {
    if package.is_root() {
        "<root>".to_string()
    } else {
        package.to_string()
    }
}

/// Kahn's algorithm over dependency edges with a sorted ready set.
fn build_order(graph: &DiGraph<RuleNode, ()>) -> Result<Vec<NodeIndex>, ResolveError> {
    let mut remaining: HashMap<NodeIndex, usize> = graph
        .node_indices()
        .map(|idx| (idx, graph.edges_directed(idx, Direction::Outgoing).count()))
        .collect();

    let mut ready: BTreeSet<(RuleId, NodeIndex)> = remaining
        .iter()
        .filter(|(_, &count)| count == 0)
        .map(|(&idx, _)| (graph[idx].id.clone(), idx))
        .collect();

    let mut order = Vec::with_capacity(graph.node_count());

    while let Some((_, idx)) = ready.pop_first() {
        order.push(idx);
        for edge in graph.edges_directed(idx, Direction::Incoming) {
            let dependent = edge.source();
            if let Some(count) = remaining.get_mut(&dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.insert((graph[dependent].id.clone(), dependent));
                }
            }
        }
    }

    if order.len() < graph.node_count() {
        return Err(ResolveError::CycleDetected {
            rules: cycle_members(graph),
        });
    }

    Ok(order)
}

/// Rules of the first cycle, sorted.
pub(crate) fn cycle_members<N, E>(graph: &DiGraph<N, E>) -> Vec<String>
where
    N: HasRuleId,
{
    cycles(graph).into_iter().next().unwrap_or_default()
}

/// Every cycle in the graph as a sorted list of rule ids.
pub(crate) fn cycles<N, E>(graph: &DiGraph<N, E>) -> Vec<Vec<String>>
where
    N: HasRuleId,
{
    let mut found: Vec<Vec<String>> = tarjan_scc(graph)
        .into_iter()
        .filter(|scc| scc.len() > 1 || graph.contains_edge(scc[0], scc[0]))
        .map(|scc| {
            let mut ids: Vec<String> = scc.iter().map(|&i| graph[i].rule_id().to_string()).collect();
            ids.sort();
            ids
        })
        .collect();
    found.sort();
    found
}

/// Node weights that identify a rule.
pub(crate) trait HasRuleId {
    fn rule_id(&self) -> &RuleId;
}

impl HasRuleId for RuleNode {
    fn rule_id(&self) -> &RuleId {
        &self.id
    }
}

impl HasRuleId for RuleId {
    fn rule_id(&self) -> &RuleId {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TreeFixture;

    fn example_tree() -> TreeFixture {
        TreeFixture::new()
            .manifest("fastlib/base", "librule(sources = ['common.cc'], headers = ['common.h'])")
            .manifest(
                "fastlib/col",
                "librule(headers = ['arraylist.h'], deplibs = ['fastlib/base'])",
            )
            .manifest(
                "fastlib/math",
                r#"librule(
                    sources = ["discrete.cc"],
                    deplibs = ["fastlib/base:base", "fastlib/col:col"])
                binrule(name = "math_test", sources = ["math_test.cc"], deplibs = [":math"])"#,
            )
    }

    fn id(s: &str) -> RuleId {
        s.parse::<crate::core::RuleRef>()
            .unwrap()
            .resolve(&PackagePath::root())
    }

    fn names(nodes: &[&RuleNode]) -> Vec<String> {
        nodes.iter().map(|n| n.id.to_string()).collect()
    }

    #[test]
    fn test_build_order_puts_dependencies_first() {
        let tree = example_tree();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let graph = RuleGraph::build(&mut ws, &[id("fastlib/math:math_test")]).unwrap();

        assert_eq!(graph.len(), 4);
        assert_eq!(
            names(&graph.build_order()),
            vec![
                "fastlib/base:base",
                "fastlib/col:col",
                "fastlib/math:math",
                "fastlib/math:math_test"
            ]
        );
    }

    #[test]
    fn test_link_order_puts_dependents_first() {
        let tree = example_tree();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let target = id("fastlib/math:math_test");
        let graph = RuleGraph::build(&mut ws, &[target.clone()]).unwrap();

        assert_eq!(
            names(&graph.link_order(&target)),
            vec!["fastlib/math:math", "fastlib/col:col", "fastlib/base:base"]
        );
    }

    #[test]
    fn test_deps_and_dependents() {
        let tree = example_tree();
        let mut ws = Workspace::new(tree.root()).unwrap();
        let graph = RuleGraph::build(&mut ws, &[id("fastlib/math:math_test")]).unwrap();

        let math = id("fastlib/math:math");
        assert_eq!(
            names(&graph.deps(&math)),
            vec!["fastlib/base:base", "fastlib/col:col"]
        );
        assert_eq!(
            names(&graph.dependents(&id("fastlib/base"))),
            vec!["fastlib/col:col", "fastlib/math:math"]
        );
        assert_eq!(names(&graph.closure(&id("fastlib/col"))), vec!["fastlib/base:base"]);
    }

    #[test]
    fn test_missing_package() {
        let tree = TreeFixture::new().manifest("app", "binrule(name = 'app', deplibs = ['lib/none'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let err = RuleGraph::build(&mut ws, &[id("app:app")]).unwrap_err();
        match err {
            ResolveError::MissingPackage { package, from, .. } => {
                assert_eq!(package, "lib/none");
                assert_eq!(from.as_deref(), Some("app:app"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_rule_lists_available() {
        let tree = TreeFixture::new()
            .manifest("lib", "librule(name = 'real')")
            .manifest("app", "binrule(name = 'app', deplibs = ['lib:fake'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let err = RuleGraph::build(&mut ws, &[id("app:app")]).unwrap_err();
        assert!(matches!(
            err,
            ResolveError::UnknownRule { ref available, .. } if available == &vec!["real".to_string()]
        ));
    }

    #[test]
    fn test_binary_dependency_rejected() {
        let tree = TreeFixture::new().manifest(
            "app",
            "binrule(name = 'tool')\nbinrule(name = 'app', deplibs = [':tool'])",
        );
        let mut ws = Workspace::new(tree.root()).unwrap();

        let err = RuleGraph::build(&mut ws, &[id("app:app")]).unwrap_err();
        assert!(matches!(err, ResolveError::BinaryDependency { .. }));
    }

    #[test]
    fn test_cycle_detected() {
        let tree = TreeFixture::new()
            .manifest("a", "librule(deplibs = ['b'])")
            .manifest("b", "librule(deplibs = ['c'])")
            .manifest("c", "librule(deplibs = ['a'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let err = RuleGraph::build(&mut ws, &[id("a")]).unwrap_err();
        match err {
            ResolveError::CycleDetected { rules } => {
                assert_eq!(rules, vec!["a:a", "b:b", "c:c"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_self_dependency_is_a_cycle() {
        let tree = TreeFixture::new().manifest("a", "librule(deplibs = [':a'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let err = RuleGraph::build(&mut ws, &[id("a")]).unwrap_err();
        assert!(matches!(err, ResolveError::CycleDetected { rules } if rules == vec!["a:a"]));
    }

    #[test]
    fn test_duplicate_deplibs_collapse() {
        let tree = TreeFixture::new()
            .manifest("lib", "librule()")
            .manifest("app", "binrule(name = 'app', deplibs = ['lib', 'lib:lib'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let app = id("app:app");
        let graph = RuleGraph::build(&mut ws, &[app.clone()]).unwrap();
        assert_eq!(graph.deps(&app).len(), 1);
    }
}
