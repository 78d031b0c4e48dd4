//! GCC-style toolchain abstraction.
//!
//! Toolchain selection priority:
//! 1. `[toolchain]` section of the config files
//! 2. Environment variables (CC, CXX, AR)
//! 3. Defaults for the compiler family

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::builder::plan::{ArchiveStep, CompileStep, LinkStep};
use crate::core::Language;
use crate::util::config::ToolchainSettings;
use crate::util::process::{find_executable, ProcessBuilder};

/// Supported compiler families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CompilerFamily {
    #[default]
    Gcc,
    Clang,
}

impl CompilerFamily {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
        }
    }

    fn default_cc(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "gcc",
            CompilerFamily::Clang => "clang",
        }
    }

    fn default_cxx(&self) -> &'static str {
        match self {
            CompilerFamily::Gcc => "g++",
            CompilerFamily::Clang => "clang++",
        }
    }
}

impl fmt::Display for CompilerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CompilerFamily {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gcc" => Ok(CompilerFamily::Gcc),
            "clang" => Ok(CompilerFamily::Clang),
            other => Err(format!("unknown compiler `{}` (expected gcc or clang)", other)),
        }
    }
}

/// A command to execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        CommandSpec {
            program: program.into(),
            args: Vec::new(),
        }
    }

    pub fn args(mut self, args: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.args.extend(args.into_iter().map(|a| a.into()));
        self
    }

    pub fn to_process(&self) -> ProcessBuilder {
        ProcessBuilder::new(&self.program).args(&self.args)
    }
}

/// Compiler and archiver paths for one compiler family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub family: CompilerFamily,
    pub cc: PathBuf,
    pub cxx: PathBuf,
    pub ar: PathBuf,
}

impl Toolchain {
    /// Defaults for `family`, ignoring config and environment.
    pub fn new(family: CompilerFamily) -> Self {
        Toolchain {
            family,
            cc: PathBuf::from(family.default_cc()),
            cxx: PathBuf::from(family.default_cxx()),
            ar: PathBuf::from("ar"),
        }
    }

    /// Resolve the toolchain from config, then the process environment.
    pub fn from_settings(family: CompilerFamily, settings: &ToolchainSettings) -> Self {
        Self::resolve(family, settings, |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    fn resolve(
        family: CompilerFamily,
        settings: &ToolchainSettings,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let defaults = Self::new(family);
        let pick = |configured: &Option<PathBuf>, var: &str, default: PathBuf| {
            configured
                .clone()
                .or_else(|| env(var).map(PathBuf::from))
                .unwrap_or(default)
        };

        let toolchain = Toolchain {
            family,
            cc: pick(&settings.cc, "CC", defaults.cc),
            cxx: pick(&settings.cxx, "CXX", defaults.cxx),
            ar: pick(&settings.ar, "AR", defaults.ar),
        };
        tracing::debug!(
            "toolchain: cc={} cxx={} ar={}",
            toolchain.cc.display(),
            toolchain.cxx.display(),
            toolchain.ar.display()
        );
        toolchain
    }

    pub fn compiler_for(&self, lang: Language) -> &Path {
        match lang {
            Language::C => &self.cc,
            Language::Cxx => &self.cxx,
        }
    }

    /// Arguments after the compiler program.
    pub fn compile_args(&self, step: &CompileStep) -> Vec<String> {
        let mut args = step.flags.clone();
        args.push("-c".to_string());
        args.push(step.source.display().to_string());
        args.push("-o".to_string());
        args.push(step.output.display().to_string());
        args
    }

    pub fn compile_command(&self, step: &CompileStep) -> CommandSpec {
        CommandSpec::new(self.compiler_for(step.lang)).args(self.compile_args(step))
    }

    /// Arguments after the archiver program.
    pub fn archive_args(&self, step: &ArchiveStep) -> Vec<String> {
        let mut args = vec!["rcs".to_string(), step.output.display().to_string()];
        args.extend(step.objects.iter().map(|o| o.display().to_string()));
        args
    }

    pub fn archive_command(&self, step: &ArchiveStep) -> CommandSpec {
        CommandSpec::new(&self.ar).args(self.archive_args(step))
    }

    /// Arguments after the linker driver.
    pub fn link_args(&self, step: &LinkStep) -> Vec<String> {
        let mut args = vec!["-o".to_string(), step.output.display().to_string()];
        args.extend(step.objects.iter().map(|o| o.display().to_string()));
        args.extend(step.archives.iter().map(|a| a.display().to_string()));
        args.extend(step.ldflags.iter().cloned());
        args
    }

    pub fn link_command(&self, step: &LinkStep) -> CommandSpec {
        let driver = if step.use_cxx_linker {
            &self.cxx
        } else {
            &self.cc
        };
        CommandSpec::new(driver).args(self.link_args(step))
    }

    /// Fail early when a required program is not on PATH.
    pub fn check_available(&self, needs_c: bool, needs_cxx: bool) -> Result<()> {
        let mut required = vec![&self.ar];
        if needs_c {
            required.push(&self.cc);
        }
        if needs_cxx {
            required.push(&self.cxx);
        }
        for program in required {
            if find_executable(program).is_none() {
                bail!(
                    "`{}` not found\n\
                     help: install it, set CC/CXX/AR, or configure [toolchain] in .fl-build/config.toml",
                    program.display()
                );
            }
        }
        Ok(())
    }
}
