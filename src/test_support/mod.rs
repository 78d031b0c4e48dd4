//! Test fixtures for source trees.
//!
//! [`TreeFixture`] lays out packages and files in a temporary directory that
//! serves as a workspace root.

use std::path::{Path, PathBuf};

use tempfile::TempDir;

use crate::core::MANIFEST_NAME;

/// A temporary source tree.
pub struct TreeFixture {
    dir: TempDir,
}

impl TreeFixture {
    pub fn new() -> Self {
        TreeFixture {
            dir: TempDir::new().expect("failed to create temp dir"),
        }
    }

    /// Root of the tree as created. Use [`TreeFixture::path`] to compare with
    /// paths a `Workspace` hands out, which are normalized.
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    /// Absolute path of `rel` inside the tree.
    pub fn path(&self, rel: &str) -> PathBuf {
        crate::util::fs::normalize_path(self.dir.path()).join(rel)
    }

    /// Write `contents` to `rel`, creating parent directories.
    pub fn file(self, rel: &str, contents: &str) -> Self {
        let path = self.dir.path().join(rel);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("failed to create fixture dir");
        }
        std::fs::write(&path, contents).expect("failed to write fixture file");
        self
    }

    /// Write a `build.py` for `package` (`""` for the root package).
    pub fn manifest(self, package: &str, contents: &str) -> Self {
        let rel = if package.is_empty() {
            MANIFEST_NAME.to_string()
        } else {
            format!("{}/{}", package, MANIFEST_NAME)
        };
        self.file(&rel, contents)
    }

    /// Write a library package whose sources and headers all exist.
    pub fn library(self, package: &str, sources: &[&str], headers: &[&str], deplibs: &[&str]) -> Self {
        let list = |items: &[&str]| {
            items
                .iter()
                .map(|s| format!("\"{}\"", s))
                .collect::<Vec<_>>()
                .join(", ")
        };
        let manifest = format!(
            "librule(\n    sources = [{}],\n    headers = [{}],\n    deplibs = [{}],\n)\n",
            list(sources),
            list(headers),
            list(deplibs)
        );

        let mut tree = self.manifest(package, &manifest);
        for file in sources.iter().chain(headers) {
            tree = tree.file(&format!("{}/{}", package, file), "");
        }
        tree
    }
}

impl Default for TreeFixture {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_fixture_writes_files() {
        let tree = TreeFixture::new().library("fastlib/base", &["common.cc"], &["common.h"], &[]);

        assert!(tree.root().join("fastlib/base/build.py").is_file());
        assert!(tree.root().join("fastlib/base/common.cc").is_file());
        let manifest = std::fs::read_to_string(tree.root().join("fastlib/base/build.py")).unwrap();
        assert!(manifest.contains("sources = [\"common.cc\"]"));
    }

    #[test]
    fn test_path_matches_workspace_root() {
        let tree = TreeFixture::new().manifest("", "librule(name = 'top')");
        let ws = crate::core::Workspace::new(tree.root()).unwrap();
        assert_eq!(ws.root(), tree.path("").as_path());
        assert_eq!(ws.manifest_path(&crate::core::PackagePath::root()), tree.path("build.py"));
    }
}
