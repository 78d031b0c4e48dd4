//! Manifest validation.
//!
//! Unlike the resolver, validation never stops at the first problem: every
//! finding in scope is collected into a report.

use std::collections::{HashMap, HashSet, VecDeque};

use petgraph::graph::{DiGraph, NodeIndex};

use crate::core::rule::escapes_dir;
use crate::core::{Language, Manifest, PackagePath, Rule, RuleId, Workspace};
use crate::resolver::errors::ResolveError;
use crate::resolver::graph::cycles;
use crate::util::diagnostic::Diagnostic;

/// What to validate.
#[derive(Debug, Clone)]
pub enum CheckScope {
    /// The given rules and everything they depend on
    Closure(Vec<RuleId>),
    /// Every manifest under the workspace root
    Tree,
}

/// Findings of one validation run.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub diagnostics: Vec<Diagnostic>,
    /// Manifests examined
    pub manifests: usize,
    /// Rules examined
    pub rules: usize,
}

impl ValidationReport {
    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(|d| !d.is_error())
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn is_ok(&self) -> bool {
        self.error_count() == 0
    }
}

/// Validate the rules in `scope`.
pub fn validate(ws: &mut Workspace, scope: &CheckScope) -> ValidationReport {
    let mut checker = Checker::default();

    match scope {
        CheckScope::Tree => {
            for package in ws.discover() {
                if let Some(manifest) = checker.load(ws, &package, None) {
                    // Later declarations of a name are already reported as duplicates.
                    let mut names = HashSet::new();
                    for rule in manifest.rules() {
                        if names.insert(rule.name.as_str()) {
                            checker.check_rule(ws, &manifest, rule);
                        }
                    }
                }
            }
        }
        CheckScope::Closure(roots) => {
            let mut queue: VecDeque<(RuleId, Option<RuleId>)> =
                roots.iter().map(|r| (r.clone(), None)).collect();
            let mut visited: HashSet<RuleId> = HashSet::new();

            while let Some((id, from)) = queue.pop_front() {
                if !visited.insert(id.clone()) {
                    continue;
                }
                let Some(manifest) = checker.load(ws, &id.package, from.as_ref()) else {
                    continue;
                };
                let Some(rule) = manifest.rule(&id.name) else {
                    // Only roots get here; dependencies are checked before being queued.
                    checker.report(unknown_rule(&manifest, &id, from.as_ref()));
                    continue;
                };
                for dep in checker.check_rule(ws, &manifest, rule) {
                    queue.push_back((dep, Some(id.clone())));
                }
            }
        }
    }

    checker.finish()
}

#[derive(Default)]
struct Checker {
    report: ValidationReport,
    /// Packages whose manifest-level checks already ran
    loaded: HashSet<PackagePath>,
    graph: DiGraph<RuleId, ()>,
    nodes: HashMap<RuleId, NodeIndex>,
}

impl Checker {
    fn report(&mut self, diagnostic: Diagnostic) {
        self.report.diagnostics.push(diagnostic);
    }

    /// Load a manifest, running the manifest-level checks the first time.
    fn load(
        &mut self,
        ws: &mut Workspace,
        package: &PackagePath,
        from: Option<&RuleId>,
    ) -> Option<Manifest> {
        let first = self.loaded.insert(package.clone());
        let expected = ws.manifest_path(package);

        match ws.manifest(package) {
            Ok(Some(manifest)) => {
                let manifest = manifest.clone();
                if first {
                    self.report.manifests += 1;
                    self.check_duplicate_rules(&manifest);
                }
                Some(manifest)
            }
            Ok(None) => {
                if first {
                    self.report(
                        ResolveError::MissingPackage {
                            package: package.to_string(),
                            expected,
                            from: from.map(|f| f.to_string()),
                        }
                        .to_diagnostic(),
                    );
                }
                None
            }
            Err(e) => {
                if first {
                    let position = e.parse_error().map(|p| (p.line_col(), p.help.clone()));
                    let mut diag = ResolveError::Manifest(e).to_diagnostic();
                    if let Some(((line, column), help)) = position {
                        diag = diag.with_context(format!("at line {}, column {}", line, column));
                        if let Some(help) = help {
                            diag = diag.with_suggestion(help);
                        }
                    }
                    self.report(diag);
                }
                None
            }
        }
    }

    fn check_duplicate_rules(&mut self, manifest: &Manifest) {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut reported: HashSet<&str> = HashSet::new();
        for rule in manifest.rules() {
            if !seen.insert(rule.name.as_str()) && reported.insert(rule.name.as_str()) {
                let count = manifest.rules().iter().filter(|r| r.name == rule.name).count();
                self.report(
                    Diagnostic::error(format!(
                        "rule `{}` is declared {} times",
                        rule.name, count
                    ))
                    .with_location(manifest.path())
                    .with_context("rule names must be unique within a manifest")
                    .with_suggestion("Rename or remove the extra declarations"),
                );
            }
        }
    }

    /// Check one rule and return the dependencies that resolved.
    fn check_rule(&mut self, ws: &mut Workspace, manifest: &Manifest, rule: &Rule) -> Vec<RuleId> {
        self.report.rules += 1;
        let id = RuleId::new(manifest.package().clone(), rule.name.clone());
        let node = self.node(&id);

        self.check_files(manifest, rule, &id);
        self.check_duplicate_entries(manifest, rule, &id);

        if rule.is_library() && rule.sources.is_empty() && rule.headers.is_empty() {
            self.report(
                Diagnostic::warning(format!("library `{}` has no sources and no headers", id))
                    .with_location(manifest.path()),
            );
        }

        let mut resolved = Vec::new();
        let mut seen = HashSet::new();
        for dep in &rule.deplibs {
            let dep_id = dep.resolve(manifest.package());
            if !seen.insert(dep_id.clone()) {
                continue;
            }

            if dep_id == id {
                self.report(
                    Diagnostic::error(format!("`{}` depends on itself", id))
                        .with_location(manifest.path())
                        .with_suggestion(format!("Remove `{}` from deplibs", dep)),
                );
                continue;
            }

            let Some(dep_manifest) = self.load(ws, &dep_id.package, Some(&id)) else {
                continue;
            };
            let Some(dep_rule) = dep_manifest.rule(&dep_id.name) else {
                self.report(
                    unknown_rule(&dep_manifest, &dep_id, Some(&id)).with_location(manifest.path()),
                );
                continue;
            };
            if dep_rule.is_binary() {
                self.report(
                    ResolveError::BinaryDependency {
                        from: id.to_string(),
                        target: dep_id.to_string(),
                    }
                    .to_diagnostic()
                    .with_location(manifest.path()),
                );
                continue;
            }

            let dep_node = self.node(&dep_id);
            self.graph.update_edge(node, dep_node, ());
            resolved.push(dep_id);
        }

        resolved
    }

    fn check_files(&mut self, manifest: &Manifest, rule: &Rule, id: &RuleId) {
        let listed = rule
            .sources
            .iter()
            .map(|s| (s, true))
            .chain(rule.headers.iter().map(|h| (h, false)));

        for (file, is_source) in listed {
            if is_source && escapes_dir(file) {
                self.report(
                    Diagnostic::error(format!(
                        "`{}` lists source `{}` outside its directory",
                        id, file
                    ))
                    .with_location(manifest.path())
                    .with_context("sources are relative to the manifest and may not use `..`")
                    .with_suggestion("Move the file into a library of its own package and depend on it"),
                );
                continue;
            }

            let path = manifest.dir().join(file);
            if !path.is_file() {
                self.report(
                    Diagnostic::error(format!("`{}` lists `{}` which does not exist", id, file))
                        .with_location(manifest.path())
                        .with_context(format!("expected {}", path.display())),
                );
            } else if is_source && Language::from_path(&path).is_none() {
                self.report(
                    Diagnostic::error(format!(
                        "`{}` lists source `{}` with an unsupported extension",
                        id, file
                    ))
                    .with_location(manifest.path())
                    .with_suggestion("Use .c for C or .cc, .cpp, .cxx for C++")
                    .with_suggestion("Move non-source files to `headers`"),
                );
            }
        }
    }

    fn check_duplicate_entries(&mut self, manifest: &Manifest, rule: &Rule, id: &RuleId) {
        let deps: Vec<String> = rule
            .deplibs
            .iter()
            .map(|d| d.resolve(manifest.package()).to_string())
            .collect();

        let lists: [(&str, Vec<&str>); 3] = [
            ("sources", rule.sources.iter().map(String::as_str).collect()),
            ("headers", rule.headers.iter().map(String::as_str).collect()),
            ("deplibs", deps.iter().map(String::as_str).collect()),
        ];

        for (list, entries) in lists {
            let mut seen = HashSet::new();
            let mut reported = HashSet::new();
            for entry in entries {
                if !seen.insert(entry) && reported.insert(entry) {
                    self.report(
                        Diagnostic::warning(format!(
                            "`{}` lists `{}` more than once in {}",
                            id, entry, list
                        ))
                        .with_location(manifest.path()),
                    );
                }
            }
        }
    }

    fn node(&mut self, id: &RuleId) -> NodeIndex {
        if let Some(&idx) = self.nodes.get(id) {
            return idx;
        }
        let idx = self.graph.add_node(id.clone());
        self.nodes.insert(id.clone(), idx);
        idx
    }

    fn finish(mut self) -> ValidationReport {
        for members in cycles(&self.graph) {
            self.report(ResolveError::CycleDetected { rules: members }.to_diagnostic());
        }
        tracing::debug!(
            "checked {} rule(s) in {} manifest(s): {} finding(s)",
            self.report.rules,
            self.report.manifests,
            self.report.diagnostics.len()
        );
        self.report
    }
}

fn unknown_rule(manifest: &Manifest, id: &RuleId, from: Option<&RuleId>) -> Diagnostic {
    ResolveError::UnknownRule {
        package: id.package.to_string(),
        name: id.name.clone(),
        from: from.map(|f| f.to_string()),
        available: manifest.rule_names().iter().map(|s| s.to_string()).collect(),
    }
    .to_diagnostic()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RuleRef;
    use crate::test_support::TreeFixture;

    fn id(s: &str) -> RuleId {
        s.parse::<RuleRef>().unwrap().resolve(&PackagePath::root())
    }

    fn messages(report: &ValidationReport) -> Vec<String> {
        report.diagnostics.iter().map(|d| d.message.clone()).collect()
    }

    #[test]
    fn test_clean_tree_passes() {
        let tree = TreeFixture::new()
            .library("fastlib/base", &["common.cc"], &["common.h"], &[])
            .library("fastlib/math", &["discrete.cc"], &["discrete.h"], &["fastlib/base"]);
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Tree);
        assert!(report.is_ok(), "{:?}", messages(&report));
        assert_eq!(report.manifests, 2);
        assert_eq!(report.rules, 2);
        assert_eq!(report.warning_count(), 0);
    }

    #[test]
    fn test_duplicate_rule_names() {
        let tree = TreeFixture::new()
            .manifest("app", "binrule(name = 'main')\nbinrule(name = 'main')\nbinrule(name = 'main')");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Tree);
        assert_eq!(messages(&report), vec!["rule `main` is declared 3 times"]);
        assert_eq!(report.rules, 1);
    }

    #[test]
    fn test_duplicate_declaration_findings_reported_once() {
        let tree = TreeFixture::new().manifest(
            "app",
            "binrule(name = 'main', sources = ['gone.cc'])\nbinrule(name = 'main', sources = ['gone.cc'])",
        );
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Tree);
        let msgs = messages(&report);
        assert_eq!(msgs.iter().filter(|m| m.contains("`gone.cc`")).count(), 1);
        assert_eq!(report.error_count(), 2);
    }

    #[test]
    fn test_source_outside_directory() {
        let tree = TreeFixture::new()
            .library("base", &["common.cc"], &[], &[])
            .manifest("app", "binrule(name = 'app', sources = ['../base/common.cc'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Closure(vec![id("app")]));
        assert_eq!(
            messages(&report),
            vec!["`app:app` lists source `../base/common.cc` outside its directory"]
        );
    }

    #[test]
    fn test_collects_every_problem() {
        let tree = TreeFixture::new()
            .manifest("lib", "librule(name = 'real')\nbinrule(name = 'tool')")
            .manifest(
                "app",
                "binrule(name = 'app', sources = ['main.cc', 'gone.cc', 'notes.txt', 'main.cc'], \
                 deplibs = ['lib:fake', 'lib:tool', 'nowhere', ':app'])",
            )
            .file("app/main.cc", "")
            .file("app/notes.txt", "");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Closure(vec![id("app:app")]));
        let msgs = messages(&report);

        assert!(msgs.iter().any(|m| m.contains("lists `gone.cc` which does not exist")));
        assert!(msgs.iter().any(|m| m.contains("source `notes.txt` with an unsupported extension")));
        assert!(msgs.iter().any(|m| m.contains("rule `fake` is not declared")));
        assert!(msgs.iter().any(|m| m.contains("depends on binary rule `lib:tool`")));
        assert!(msgs.iter().any(|m| m.contains("package `nowhere` has no manifest")));
        assert!(msgs.iter().any(|m| m.contains("`app:app` depends on itself")));
        assert_eq!(report.error_count(), 6);

        assert!(msgs.iter().any(|m| m.contains("lists `main.cc` more than once in sources")));
        assert_eq!(report.warning_count(), 1);
    }

    #[test]
    fn test_cycle_reported_once() {
        let tree = TreeFixture::new()
            .manifest("a", "librule(deplibs = ['b'])")
            .manifest("b", "librule(deplibs = ['a'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Closure(vec![id("a")]));
        assert_eq!(report.error_count(), 1);
        let output = report.errors().next().unwrap().format(false);
        assert!(output.contains("`a:a` is part of the cycle"));
        assert!(output.contains("`b:b` is part of the cycle"));

        // Both libraries are empty.
        assert_eq!(report.warning_count(), 2);
    }

    #[test]
    fn test_parse_error_has_position() {
        let tree = TreeFixture::new()
            .manifest("ok", "librule()")
            .manifest("bad", "librule(\n  srcs = ['a.cc'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Tree);
        assert_eq!(report.error_count(), 1);
        let output = report.errors().next().unwrap().format(false);
        assert!(output.contains("unknown keyword argument `srcs`"));
        assert!(output.contains("at line 2, column 3"));
    }

    #[test]
    fn test_closure_ignores_unrelated_packages() {
        let tree = TreeFixture::new()
            .library("good", &["a.cc"], &[], &[])
            .manifest("broken", "librule(sources = ['missing.cc'])");
        let mut ws = Workspace::new(tree.root()).unwrap();

        let report = validate(&mut ws, &CheckScope::Closure(vec![id("good")]));
        assert!(report.is_ok());
        assert_eq!(report.manifests, 1);

        let report = validate(&mut ws, &CheckScope::Tree);
        assert_eq!(report.error_count(), 1);
    }
}
