//! Global context for fl-build operations.
//!
//! Provides centralized access to the working directory, the workspace root
//! and the merged configuration.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::util::config::{self, Config};
use crate::util::fs::normalize_path;

/// Environment variable naming the workspace root (set by `fl-build env`).
pub const ROOT_ENV: &str = "FL_ROOT";

/// Where the workspace root came from, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootSource {
    Flag,
    Env,
    Config,
    Cwd,
}

/// Global context containing configuration and paths.
#[derive(Debug, Clone)]
pub struct GlobalContext {
    /// Current working directory
    cwd: PathBuf,

    /// Workspace root
    root: PathBuf,

    root_source: RootSource,

    /// Global config file, if a home directory exists
    global_config: Option<PathBuf>,

    /// Whether to use colors in output
    color: bool,
}

impl GlobalContext {
    /// Create a context for the current process.
    ///
    /// The root is taken from `root_flag`, then `FL_ROOT`, then the
    /// `paths.root` config entry, then the current directory.
    pub fn new(root_flag: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("failed to get current directory")?;
        let env_root = std::env::var_os(ROOT_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Ok(Self::resolve(cwd, root_flag, env_root, config::global_config_path()))
    }

    /// Create a context with an explicit working directory and no environment lookup.
    pub fn with_cwd(cwd: PathBuf, root: Option<PathBuf>) -> Self {
        Self::resolve(cwd, root, None, None)
    }

    fn resolve(
        cwd: PathBuf,
        root_flag: Option<PathBuf>,
        env_root: Option<PathBuf>,
        global_config: Option<PathBuf>,
    ) -> Self {
        let config_root = || {
            global_config
                .as_deref()
                .map(Config::load_or_default)
                .and_then(|c| c.paths.root)
        };

        let (root, root_source) = if let Some(root) = root_flag {
            (root, RootSource::Flag)
        } else if let Some(root) = env_root {
            (root, RootSource::Env)
        } else if let Some(root) = config_root() {
            (root, RootSource::Config)
        } else {
            (cwd.clone(), RootSource::Cwd)
        };

        let root = if root.is_absolute() {
            root
        } else {
            cwd.join(root)
        };

        tracing::debug!("workspace root {} ({:?})", root.display(), root_source);

        GlobalContext {
            cwd,
            root: normalize_path(&root),
            root_source,
            global_config,
            color: true,
        }
    }

    /// Set color output mode.
    pub fn set_color(&mut self, color: bool) {
        self.color = color;
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn root_source(&self) -> RootSource {
        self.root_source
    }

    pub fn color(&self) -> bool {
        self.color
    }

    /// Project config path under the workspace root.
    pub fn project_config_path(&self) -> PathBuf {
        config::project_config_path(&self.root)
    }

    pub fn global_config_path(&self) -> Option<&Path> {
        self.global_config.as_deref()
    }

    /// Load the merged global and project configuration.
    pub fn config(&self) -> Config {
        config::load_config(
            self.global_config.as_deref(),
            Some(&self.project_config_path()),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_flag_wins() {
        let tmp = TempDir::new().unwrap();
        let flag = tmp.path().join("flag");
        let env = tmp.path().join("env");
        std::fs::create_dir_all(&flag).unwrap();
        std::fs::create_dir_all(&env).unwrap();

        let ctx = GlobalContext::resolve(tmp.path().to_path_buf(), Some(flag.clone()), Some(env), None);
        assert_eq!(ctx.root(), normalize_path(&flag));
        assert_eq!(ctx.root_source(), RootSource::Flag);
    }

    #[test]
    fn test_env_before_config() {
        let tmp = TempDir::new().unwrap();
        let env = tmp.path().join("env");
        std::fs::create_dir_all(&env).unwrap();

        let global = tmp.path().join("config.toml");
        std::fs::write(&global, "[paths]\nroot = \"/from/config\"\n").unwrap();

        let ctx = GlobalContext::resolve(tmp.path().to_path_buf(), None, Some(env.clone()), Some(global.clone()));
        assert_eq!(ctx.root_source(), RootSource::Env);

        let ctx = GlobalContext::resolve(tmp.path().to_path_buf(), None, None, Some(global));
        assert_eq!(ctx.root_source(), RootSource::Config);
        assert_eq!(ctx.root(), Path::new("/from/config"));
    }

    #[test]
    fn test_cwd_fallback_and_relative_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir_all(tmp.path().join("tree")).unwrap();

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf(), None);
        assert_eq!(ctx.root_source(), RootSource::Cwd);
        assert_eq!(ctx.root(), normalize_path(tmp.path()));

        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf(), Some(PathBuf::from("tree")));
        assert_eq!(ctx.root(), normalize_path(&tmp.path().join("tree")));
    }

    #[test]
    fn test_project_config_path() {
        let tmp = TempDir::new().unwrap();
        let ctx = GlobalContext::with_cwd(tmp.path().to_path_buf(), None);
        assert!(ctx
            .project_config_path()
            .ends_with(".fl-build/config.toml"));
    }
}
