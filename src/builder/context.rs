//! Build context - toolchain, mode, and output layout.

use std::path::{Path, PathBuf};

use crate::builder::mode::BuildMode;
use crate::builder::toolchain::{CompilerFamily, Toolchain};
use crate::core::{PackagePath, Workspace};
use crate::util::config::Config;

/// Everything a plan needs to know about the build besides the rules.
#[derive(Debug, Clone)]
pub struct BuildContext {
    /// Workspace root, always on the include path
    pub root: PathBuf,

    /// `<root>/build/<compiler>_<mode>`
    pub output_dir: PathBuf,

    pub mode: BuildMode,

    pub toolchain: Toolchain,

    /// Extra compiler flags from config
    pub cflags: Vec<String>,

    /// Extra linker flags from config
    pub ldflags: Vec<String>,

    /// Parallel compile jobs (None = rayon default)
    pub jobs: Option<usize>,
}

impl BuildContext {
    /// Create a context for `mode` and `family`, layering in config defaults.
    pub fn new(ws: &Workspace, mode: BuildMode, family: CompilerFamily, config: &Config) -> Self {
        BuildContext {
            root: ws.root().to_path_buf(),
            output_dir: ws.output_dir(family.as_str(), mode),
            mode,
            toolchain: Toolchain::from_settings(family, &config.toolchain),
            cflags: config.build.cflags.clone(),
            ldflags: config.build.ldflags.clone(),
            jobs: config.build.jobs,
        }
    }

    pub fn with_jobs(mut self, jobs: Option<usize>) -> Self {
        if jobs.is_some() {
            self.jobs = jobs;
        }
        self
    }

    pub fn family(&self) -> CompilerFamily {
        self.toolchain.family
    }

    /// Output directory of one package.
    ///
    /// Rule outputs live in `@bin`, `@lib` and `@obj` below it. `@` never
    /// appears in a package path, so these never overlap a nested package's
    /// directory or each other.
    pub fn package_dir(&self, package: &PackagePath) -> PathBuf {
        package.to_dir(&self.output_dir)
    }

    /// Executable produced by a binary rule.
    pub fn binary_path(&self, package: &PackagePath, rule: &str) -> PathBuf {
        self.package_dir(package).join("@bin").join(rule)
    }

    /// Static archive produced by a library rule.
    pub fn archive_path(&self, package: &PackagePath, rule: &str) -> PathBuf {
        self.package_dir(package)
            .join("@lib")
            .join(format!("lib{}.a", rule))
    }

    /// Directory holding the objects of one rule.
    pub fn object_dir(&self, package: &PackagePath, rule: &str) -> PathBuf {
        self.package_dir(package).join("@obj").join(rule)
    }

    /// Object file for `source`, keeping its full name so `x.c` and `x.cc`
    /// stay apart.
    pub fn object_path(&self, package: &PackagePath, rule: &str, source: &str) -> PathBuf {
        self.object_dir(package, rule).join(format!("{}.o", source))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}
