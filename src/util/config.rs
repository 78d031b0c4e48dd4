//! Configuration file support for fl-build.
//!
//! Two locations are read:
//! - Global: `~/.fl-build/config.toml` - User-wide defaults
//! - Project: `<root>/.fl-build/config.toml` - Tree-specific overrides
//!
//! Project config takes precedence over global config.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::mode::BuildMode;
use crate::builder::toolchain::CompilerFamily;

/// Directory name holding configuration, both under `~` and under the root.
pub const CONFIG_DIR_NAME: &str = ".fl-build";

/// fl-build configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Build settings
    pub build: BuildConfig,

    /// Compiler overrides
    pub toolchain: ToolchainSettings,

    /// Path settings
    pub paths: PathsConfig,
}

/// Build-related configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Default build mode (check, debug, fast, ...)
    pub mode: Option<String>,

    /// Default compiler family (gcc, clang)
    pub compiler: Option<String>,

    /// Default number of parallel jobs (None = auto-detect)
    pub jobs: Option<usize>,

    /// Extra compiler flags for every source
    pub cflags: Vec<String>,

    /// Extra linker flags for every binary
    pub ldflags: Vec<String>,
}

/// Toolchain settings for C/C++ compilation.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainSettings {
    /// Path to the C compiler (e.g., /usr/bin/gcc-12)
    pub cc: Option<PathBuf>,

    /// Path to the C++ compiler (e.g., /usr/bin/g++-12)
    pub cxx: Option<PathBuf>,

    /// Path to the archiver (e.g., /usr/bin/ar)
    pub ar: Option<PathBuf>,
}

/// Path configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Workspace root used when neither --root nor FL_ROOT is given
    pub root: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config file: {}", path.display()))
    }

    /// Load configuration with fallback to defaults if file doesn't exist.
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            Self::load(path).unwrap_or_else(|e| {
                tracing::warn!("Failed to load config from {}: {:#}", path.display(), e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        if other.build.mode.is_some() {
            self.build.mode = other.build.mode;
        }
        if other.build.compiler.is_some() {
            self.build.compiler = other.build.compiler;
        }
        if other.build.jobs.is_some() {
            self.build.jobs = other.build.jobs;
        }
        if !other.build.cflags.is_empty() {
            self.build.cflags = other.build.cflags;
        }
        if !other.build.ldflags.is_empty() {
            self.build.ldflags = other.build.ldflags;
        }

        if other.toolchain.cc.is_some() {
            self.toolchain.cc = other.toolchain.cc;
        }
        if other.toolchain.cxx.is_some() {
            self.toolchain.cxx = other.toolchain.cxx;
        }
        if other.toolchain.ar.is_some() {
            self.toolchain.ar = other.toolchain.ar;
        }

        if other.paths.root.is_some() {
            self.paths.root = other.paths.root;
        }
    }

    /// Parse the configured build mode.
    pub fn mode(&self) -> Result<Option<BuildMode>> {
        self.build
            .mode
            .as_deref()
            .map(|m| m.parse().map_err(|e| anyhow::anyhow!("invalid `build.mode` in config: {}", e)))
            .transpose()
    }

    /// Parse the configured compiler family.
    pub fn compiler(&self) -> Result<Option<CompilerFamily>> {
        self.build
            .compiler
            .as_deref()
            .map(|c| {
                c.parse()
                    .map_err(|e| anyhow::anyhow!("invalid `build.compiler` in config: {}", e))
            })
            .transpose()
    }

    /// Save configuration to a file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).with_context(|| {
                format!("failed to create config directory: {}", parent.display())
            })?;
        }

        let contents =
            toml::to_string_pretty(self).with_context(|| "failed to serialize config")?;

        std::fs::write(path, contents)
            .with_context(|| format!("failed to write config file: {}", path.display()))
    }
}

/// Get the global config directory (~/.fl-build).
pub fn global_config_dir() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|b| b.home_dir().join(CONFIG_DIR_NAME))
}

/// Get the global config path (~/.fl-build/config.toml).
pub fn global_config_path() -> Option<PathBuf> {
    global_config_dir().map(|dir| dir.join("config.toml"))
}

/// Get the project config path (<root>/.fl-build/config.toml).
pub fn project_config_path(root: &Path) -> PathBuf {
    root.join(CONFIG_DIR_NAME).join("config.toml")
}

/// Load merged configuration from global and project locations.
///
/// Order of precedence (highest to lowest):
/// 1. Project config (<root>/.fl-build/config.toml)
/// 2. Global config (~/.fl-build/config.toml)
/// 3. Defaults
pub fn load_config(global_path: Option<&Path>, project_path: Option<&Path>) -> Config {
    let mut config = Config::default();

    if let Some(global_path) = global_path {
        config.merge(Config::load_or_default(global_path));
    }

    if let Some(project_path) = project_path {
        config.merge(Config::load_or_default(project_path));
    }

    config
}
