//! Workspace - the source tree rooted at `FL_ROOT`.
//!
//! Every directory holding a `build.py` is a package. Manifests are loaded
//! lazily and cached by package path.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

use crate::builder::mode::BuildMode;
use crate::core::manifest::{Manifest, ManifestError, MANIFEST_NAME};
use crate::core::reference::{PackagePath, RuleId};
use crate::core::rule::Rule;
use crate::util::fs::normalize_path;

/// Directory under the root that receives build outputs.
pub const BUILD_DIR_NAME: &str = "build";

/// A source tree of packages.
#[derive(Debug)]
pub struct Workspace {
    root: PathBuf,
    build_dir: PathBuf,
    /// `None` records a package directory without a manifest.
    manifests: BTreeMap<PackagePath, Option<Manifest>>,
}

impl Workspace {
    /// Create a workspace rooted at `root`.
    pub fn new(root: &Path) -> Result<Self> {
        if !root.is_dir() {
            anyhow::bail!(
                "workspace root `{}` is not a directory\n\
                 help: set FL_ROOT or pass --root",
                root.display()
            );
        }
        let root = normalize_path(root);
        let build_dir = root.join(BUILD_DIR_NAME);

        Ok(Workspace {
            root,
            build_dir,
            manifests: BTreeMap::new(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    /// Output directory for one compiler/mode combination.
    pub fn output_dir(&self, compiler: &str, mode: BuildMode) -> PathBuf {
        self.build_dir.join(format!("{}_{}", compiler, mode))
    }

    /// Path of the manifest for `package`, whether or not it exists.
    pub fn manifest_path(&self, package: &PackagePath) -> PathBuf {
        package.to_dir(&self.root).join(MANIFEST_NAME)
    }

    /// Package path of a directory inside the workspace.
    pub fn package_for_dir(&self, dir: &Path) -> Result<PackagePath> {
        let dir = normalize_path(dir);
        let rel = dir.strip_prefix(&self.root).with_context(|| {
            format!(
                "`{}` is outside the workspace root `{}`",
                dir.display(),
                self.root.display()
            )
        })?;
        Ok(PackagePath::from_relative_dir(rel)?)
    }

    /// Load (or fetch from cache) the manifest of `package`.
    ///
    /// Returns `Ok(None)` when the package has no `build.py`.
    pub fn manifest(&mut self, package: &PackagePath) -> Result<Option<&Manifest>, ManifestError> {
        if !self.manifests.contains_key(package) {
            let path = self.manifest_path(package);
            let loaded = if path.is_file() {
                tracing::debug!("loading manifest {}", path.display());
                Some(Manifest::load(&path, package.clone())?)
            } else {
                None
            };
            self.manifests.insert(package.clone(), loaded);
        }
        Ok(self.manifests.get(package).and_then(|m| m.as_ref()))
    }

    /// Look up a rule by its fully-qualified id.
    pub fn rule(&mut self, id: &RuleId) -> Result<Option<&Rule>, ManifestError> {
        Ok(self.manifest(&id.package)?.and_then(|m| m.rule(&id.name)))
    }

    /// Find every package under the root, without parsing the manifests.
    ///
    /// Hidden directories and the build output directory are skipped.
    pub fn discover(&self) -> Vec<PackagePath> {
        let build_dir = self.build_dir.clone();
        let mut packages: Vec<PackagePath> = WalkDir::new(&self.root)
            .follow_links(false)
            .into_iter()
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                let hidden = entry.file_name().to_string_lossy().starts_with('.');
                !hidden && entry.path() != build_dir
            })
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file() && entry.file_name() == MANIFEST_NAME)
            .filter_map(|entry| {
                let dir = entry.path().parent()?;
                let rel = dir.strip_prefix(&self.root).ok()?;
                PackagePath::from_relative_dir(rel).ok()
            })
            .collect();

        packages.sort();
        packages
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TreeFixture;

    fn fixture() -> TreeFixture {
        TreeFixture::new()
            .manifest(
                "fastlib/math",
                r#"librule(sources = ["discrete.cc"], headers = ["discrete.h"])"#,
            )
            .file("fastlib/math/discrete.cc", "")
            .file("fastlib/math/discrete.h", "")
            .manifest("u/example", r#"binrule(name = "main", sources = ["main.cc"], deplibs = ["fastlib/math"])"#)
            .manifest(".hidden/pkg", "librule(name = 'x')")
    }

    #[test]
    fn test_lazy_manifest_loading() {
        let tree = fixture();
        let mut ws = Workspace::new(tree.root()).unwrap();

        let math = PackagePath::new("fastlib/math").unwrap();
        let manifest = ws.manifest(&math).unwrap().unwrap();
        assert_eq!(manifest.rule_names(), vec!["math"]);

        let missing = PackagePath::new("fastlib/none").unwrap();
        assert!(ws.manifest(&missing).unwrap().is_none());

        let id = RuleId::new(math, "math");
        assert!(ws.rule(&id).unwrap().is_some());
    }

    #[test]
    fn test_package_for_dir() {
        let tree = fixture();
        let ws = Workspace::new(tree.root()).unwrap();

        let pkg = ws.package_for_dir(&tree.root().join("u/example")).unwrap();
        assert_eq!(pkg.as_str(), "u/example");
        assert!(ws.package_for_dir(tree.root()).unwrap().is_root());

        let outside = tempfile::TempDir::new().unwrap();
        assert!(ws.package_for_dir(outside.path()).is_err());
    }

    #[test]
    fn test_discover_skips_hidden_and_build_dirs() {
        let tree = fixture().manifest("build/gcc_check/junk", "librule(name = 'junk')");
        let ws = Workspace::new(tree.root()).unwrap();

        let found: Vec<String> = ws.discover().iter().map(|p| p.to_string()).collect();
        assert_eq!(found, vec!["fastlib/math", "u/example"]);
    }

    #[test]
    fn test_output_dir() {
        let tree = fixture();
        let ws = Workspace::new(tree.root()).unwrap();
        assert!(ws
            .output_dir("gcc", BuildMode::Check)
            .ends_with("build/gcc_check"));
    }

    #[test]
    fn test_root_must_exist() {
        assert!(Workspace::new(Path::new("/definitely/not/here")).is_err());
    }
}
