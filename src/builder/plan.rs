//! Build plan generation.
//!
//! A BuildPlan describes every compile, archive and link step needed to
//! produce one target, in an order where each step's inputs are produced by
//! earlier steps.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::builder::context::BuildContext;
use crate::builder::mode::BuildMode;
use crate::builder::toolchain::CompilerFamily;
use crate::core::{Language, RuleId};
use crate::resolver::{RuleGraph, RuleNode};

/// A complete build plan for one target.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuildPlan {
    /// Rule the plan builds
    pub target: String,

    pub mode: BuildMode,

    pub compiler: CompilerFamily,

    /// All build steps in execution order
    pub steps: Vec<BuildStep>,

    /// Rules in the target's closure, dependencies first
    pub build_order: Vec<String>,

    /// Final output, `None` for a header-only library
    pub artifact: Option<PathBuf>,
}

/// A build step in the plan.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum BuildStep {
    /// Compile a source file to an object file
    Compile(CompileStep),
    /// Create a static library from object files
    Archive(ArchiveStep),
    /// Link objects and archives into an executable
    Link(LinkStep),
}

impl BuildStep {
    pub fn output(&self) -> &Path {
        match self {
            BuildStep::Compile(step) => &step.output,
            BuildStep::Archive(step) => &step.output,
            BuildStep::Link(step) => &step.output,
        }
    }
}

/// A single compilation step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompileStep {
    /// Rule this source belongs to
    pub rule: String,

    pub source: PathBuf,

    /// Output object file
    pub output: PathBuf,

    pub lang: Language,

    /// Full compiler flags, excluding `-c` and `-o`
    pub flags: Vec<String>,

    /// Headers of the rule and of its closure
    pub inputs: Vec<PathBuf>,
}

/// A step to create a static library.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchiveStep {
    pub rule: String,
    pub objects: Vec<PathBuf>,
    pub output: PathBuf,
}

/// A single link step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkStep {
    pub rule: String,

    /// The binary's own objects
    pub objects: Vec<PathBuf>,

    /// Library archives, each before the archives it depends on
    pub archives: Vec<PathBuf>,

    pub output: PathBuf,

    /// Linker flags
    pub ldflags: Vec<String>,

    /// Whether to use the C++ driver (g++/clang++ instead of gcc/clang)
    #[serde(default)]
    pub use_cxx_linker: bool,
}

impl BuildPlan {
    /// Create the plan for `target`, which must be part of `graph`.
    pub fn new(ctx: &BuildContext, graph: &RuleGraph, target: &RuleId) -> Result<Self> {
        let Some(target_node) = graph.node(target) else {
            bail!("rule `{}` is not part of the dependency graph", target);
        };

        let mut nodes = graph.closure(target);
        nodes.push(target_node);

        let mut steps = Vec::new();
        let mut archives: HashMap<&RuleId, PathBuf> = HashMap::new();
        let mut has_cxx = false;
        let mut artifact = None;

        for node in &nodes {
            if node.rule.is_header_only() {
                tracing::debug!("skipping header-only library {}", node.id);
                continue;
            }

            let inputs = header_inputs(graph, node);
            let flags = compile_flags(ctx, node);

            if let Some(source) = node.rule.escaping_sources().next() {
                bail!(
                    "source `{}` of rule `{}` is outside {}\n\
                     help: list sources relative to the manifest directory, without `..`",
                    source,
                    node.id,
                    node.dir.display()
                );
            }

            let mut objects = Vec::new();
            for source in &node.rule.sources {
                let source_path = node.dir.join(source);
                let Some(lang) = Language::from_path(&source_path) else {
                    bail!(
                        "`{}` in rule `{}` has an unsupported extension\n\
                         help: use .c for C or .cc, .cpp, .cxx for C++",
                        source,
                        node.id
                    );
                };
                has_cxx |= lang == Language::Cxx;

                let output = ctx.object_path(&node.id.package, &node.rule.name, source);
                objects.push(output.clone());

                steps.push(BuildStep::Compile(CompileStep {
                    rule: node.id.to_string(),
                    source: source_path,
                    output,
                    lang,
                    flags: flags.clone(),
                    inputs: inputs.clone(),
                }));
            }

            if node.rule.is_library() {
                let output = ctx.archive_path(&node.id.package, &node.rule.name);
                archives.insert(&node.id, output.clone());
                steps.push(BuildStep::Archive(ArchiveStep {
                    rule: node.id.to_string(),
                    objects,
                    output: output.clone(),
                }));
                if node.id == *target {
                    artifact = Some(output);
                }
            } else {
                let output = ctx.binary_path(&node.id.package, &node.rule.name);
                let libs = graph.link_order(&node.id);

                let mut ldflags: Vec<String> =
                    ctx.mode.ldflags().iter().map(|f| f.to_string()).collect();
                ldflags.extend(ctx.ldflags.iter().cloned());
                ldflags.extend(node.rule.linkflags.iter().cloned());
                for lib in &libs {
                    ldflags.extend(lib.rule.linkflags.iter().cloned());
                }

                steps.push(BuildStep::Link(LinkStep {
                    rule: node.id.to_string(),
                    objects,
                    archives: libs
                        .iter()
                        .filter_map(|lib| archives.get(&lib.id).cloned())
                        .collect(),
                    output: output.clone(),
                    ldflags,
                    use_cxx_linker: has_cxx,
                }));
                artifact = Some(output);
            }
        }

        tracing::debug!("planned {} step(s) for {}", steps.len(), target);

        Ok(BuildPlan {
            target: target.to_string(),
            mode: ctx.mode,
            compiler: ctx.family(),
            steps,
            build_order: nodes.iter().map(|n| n.id.to_string()).collect(),
            artifact,
        })
    }

    pub fn compile_steps(&self) -> impl Iterator<Item = &CompileStep> {
        self.steps.iter().filter_map(|s| match s {
            BuildStep::Compile(c) => Some(c),
            _ => None,
        })
    }

    pub fn compile_count(&self) -> usize {
        self.compile_steps().count()
    }

    /// Every file the plan writes.
    pub fn outputs(&self) -> Vec<&Path> {
        self.steps.iter().map(|s| s.output()).collect()
    }

    pub fn needs_c(&self) -> bool {
        self.compile_steps().any(|c| c.lang == Language::C)
    }

    pub fn needs_cxx(&self) -> bool {
        self.compile_steps().any(|c| c.lang == Language::Cxx)
            || self.steps.iter().any(|s| matches!(s, BuildStep::Link(l) if l.use_cxx_linker))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Mode flags, then config, then the rule's own flags, then include paths.
fn compile_flags(ctx: &BuildContext, node: &RuleNode) -> Vec<String> {
    let mut flags: Vec<String> = ctx.mode.cflags().iter().map(|f| f.to_string()).collect();
    flags.extend(ctx.cflags.iter().cloned());
    flags.extend(node.rule.cflags.iter().cloned());
    flags.push(format!("-I{}", ctx.root.display()));
    if node.dir != ctx.root {
        flags.push(format!("-I{}", node.dir.display()));
    }
    flags
}

/// Headers a source of `node` may include.
fn header_inputs(graph: &RuleGraph, node: &RuleNode) -> Vec<PathBuf> {
    let mut inputs = node.rule.header_paths(&node.dir);
    for dep in graph.closure(&node.id) {
        inputs.extend(dep.rule.header_paths(&dep.dir));
    }
    inputs
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{PackagePath, RuleRef, Workspace};
    use crate::test_support::TreeFixture;
    use crate::util::config::Config;

    fn id(s: &str) -> RuleId {
        s.parse::<RuleRef>().unwrap().resolve(&PackagePath::root())
    }

    fn tree() -> TreeFixture {
        TreeFixture::new()
            .library("fastlib/base", &["common.cc"], &["common.h"], &[])
            .library("fastlib/col", &[], &["arraylist.h"], &["fastlib/base"])
            .library("fastlib/math", &["discrete.cc", "kernel.c"], &["discrete.h"], &["fastlib/base", "fastlib/col"])
            .manifest(
                "u/example",
                "binrule(name = 'main', sources = ['main.c'], deplibs = ['fastlib/math'], linkflags = ['-lm'])",
            )
            .file("u/example/main.c", "int main(void) { return 0; }\n")
    }

    fn plan_for(tree: &TreeFixture, target: &str, mode: BuildMode) -> BuildPlan {
        let mut ws = Workspace::new(tree.root()).unwrap();
        let target = id(target);
        let graph = RuleGraph::build(&mut ws, &[target.clone()]).unwrap();
        let ctx = BuildContext::new(&ws, mode, CompilerFamily::Gcc, &Config::default());
        BuildPlan::new(&ctx, &graph, &target).unwrap()
    }

    #[test]
    fn test_binary_plan_steps_in_order() {
        let tree = tree();
        let plan = plan_for(&tree, "u/example:main", BuildMode::Check);
        let out = tree.path("build/gcc_check");

        assert_eq!(
            plan.build_order,
            vec!["fastlib/base:base", "fastlib/col:col", "fastlib/math:math", "u/example:main"]
        );
        assert_eq!(plan.compile_count(), 4);
        assert_eq!(plan.artifact, Some(out.join("u/example/@bin/main")));

        let kinds: Vec<&str> = plan
            .steps
            .iter()
            .map(|s| match s {
                BuildStep::Compile(_) => "compile",
                BuildStep::Archive(_) => "archive",
                BuildStep::Link(_) => "link",
            })
            .collect();
        assert_eq!(
            kinds,
            vec!["compile", "archive", "compile", "compile", "archive", "compile", "link"]
        );

        let Some(BuildStep::Link(link)) = plan.steps.last() else {
            panic!("last step should link");
        };
        assert_eq!(
            link.archives,
            vec![
                out.join("fastlib/math/@lib/libmath.a"),
                out.join("fastlib/base/@lib/libbase.a")
            ]
        );
        assert_eq!(link.ldflags, vec!["-lm"]);
        assert!(link.use_cxx_linker);
    }

    #[test]
    fn test_compile_flags_and_inputs() {
        let tree = tree();
        let plan = plan_for(&tree, "fastlib/math", BuildMode::Fast);

        let step = plan
            .compile_steps()
            .find(|c| c.source.ends_with("discrete.cc"))
            .unwrap();
        assert_eq!(step.lang, Language::Cxx);
        assert_eq!(
            step.output,
            tree.path("build/gcc_fast/fastlib/math/@obj/math/discrete.cc.o")
        );
        assert_eq!(&step.flags[..2], &["-O3", "-DNDEBUG"]);
        let root = crate::util::fs::normalize_path(tree.root());
        assert!(step.flags.contains(&format!("-I{}", root.display())));
        assert!(step.inputs.contains(&tree.path("fastlib/col/arraylist.h")));
        assert!(step.inputs.contains(&tree.path("fastlib/base/common.h")));

        assert_eq!(
            plan.artifact,
            Some(tree.path("build/gcc_fast/fastlib/math/@lib/libmath.a"))
        );
    }

    #[test]
    fn test_header_only_target_has_no_artifact() {
        let tree = TreeFixture::new().library("col", &[], &["list.h"], &[]);
        let plan = plan_for(&tree, "col", BuildMode::Check);
        assert!(plan.steps.is_empty());
        assert!(plan.artifact.is_none());
    }

    #[test]
    fn test_profile_mode_links_with_pg() {
        let tree = tree();
        let plan = plan_for(&tree, "u/example:main", BuildMode::Profile);
        let Some(BuildStep::Link(link)) = plan.steps.last() else {
            panic!("last step should link");
        };
        assert_eq!(link.ldflags, vec!["-pg", "-lm"]);
    }

    #[test]
    fn test_unsupported_extension() {
        let tree = TreeFixture::new().library("lib", &["code.f90"], &[], &[]);
        let mut ws = Workspace::new(tree.root()).unwrap();
        let target = id("lib");
        let graph = RuleGraph::build(&mut ws, &[target.clone()]).unwrap();
        let ctx = BuildContext::new(&ws, BuildMode::Check, CompilerFamily::Gcc, &Config::default());

        let err = BuildPlan::new(&ctx, &graph, &target).unwrap_err();
        assert!(err.to_string().contains("unsupported extension"));
    }

    #[test]
    fn test_plan_serializes_step_type() {
        let tree = tree();
        let plan = plan_for(&tree, "fastlib/base", BuildMode::Check);
        let json = plan.to_json().unwrap();
        assert!(json.contains("\"type\": \"compile\""));
        assert!(json.contains("\"type\": \"archive\""));
        assert!(json.contains("\"mode\": \"check\""));
    }

    #[test]
    fn test_same_stem_sources_get_distinct_objects() {
        let tree = TreeFixture::new().library("mix", &["x.c", "x.cc", "sub/x.cc"], &[], &[]);
        let plan = plan_for(&tree, "mix", BuildMode::Check);
        let objects: Vec<PathBuf> = plan.compile_steps().map(|c| c.output.clone()).collect();
        let out = tree.path("build/gcc_check/mix/@obj/mix");
        assert_eq!(
            objects,
            vec![out.join("x.c.o"), out.join("x.cc.o"), out.join("sub/x.cc.o")]
        );
    }

    #[test]
    fn test_binary_and_nested_package_do_not_collide() {
        let tree = TreeFixture::new()
            .manifest("u", "binrule(name = 'example', sources = ['a.cc'])")
            .file("u/a.cc", "")
            .manifest("u/example", "binrule(name = 'obj', sources = ['b.cc'])")
            .file("u/example/b.cc", "");

        let outer = plan_for(&tree, "u:example", BuildMode::Check);
        let inner = plan_for(&tree, "u/example:obj", BuildMode::Check);
        let outer_bin = outer.artifact.unwrap();
        for output in inner.outputs() {
            assert!(!output.starts_with(&outer_bin));
        }
        assert_eq!(inner.artifact, Some(tree.path("build/gcc_check/u/example/@bin/obj")));
    }

    #[test]
    fn test_source_outside_package_rejected() {
        let tree = TreeFixture::new()
            .library("base", &["common.cc"], &[], &[])
            .manifest("app", "binrule(name = 'app', sources = ['../base/common.cc'])");
        let mut ws = Workspace::new(tree.root()).unwrap();
        let target = id("app");
        let graph = RuleGraph::build(&mut ws, &[target.clone()]).unwrap();
        let ctx = BuildContext::new(&ws, BuildMode::Check, CompilerFamily::Gcc, &Config::default());

        let err = BuildPlan::new(&ctx, &graph, &target).unwrap_err();
        assert!(err.to_string().contains("source `../base/common.cc` of rule `app:app` is outside"));
    }
}
