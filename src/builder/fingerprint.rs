//! Build fingerprinting for incremental builds.
//!
//! A fingerprint captures the command line of a step and the content of
//! every file it reads. It is stored next to the step's output as
//! `<output>.fp`; a step whose fingerprint matches and whose output exists
//! is skipped.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::builder::toolchain::CommandSpec;
use crate::util::hash::{hash_file, hash_parts};

const MISSING: &str = "missing";

/// Fingerprint for one build step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFingerprint {
    /// Hash of program and arguments
    pub command_hash: String,

    /// Input file hashes
    pub input_hashes: BTreeMap<PathBuf, String>,
}

impl StepFingerprint {
    /// Fingerprint `command` reading `inputs`.
    ///
    /// Inputs that do not exist are recorded as missing rather than failing,
    /// so the compiler gets to report them.
    pub fn compute(command: &CommandSpec, inputs: &[PathBuf]) -> Result<Self> {
        let program = command.program.to_string_lossy();
        let command_hash =
            hash_parts(std::iter::once(&*program).chain(command.args.iter().map(String::as_str)));

        let mut input_hashes = BTreeMap::new();
        for input in inputs {
            let hash = if input.is_file() {
                hash_file(input)?
            } else {
                MISSING.to_string()
            };
            input_hashes.insert(input.clone(), hash);
        }

        Ok(StepFingerprint {
            command_hash,
            input_hashes,
        })
    }

    /// Where the fingerprint of `output` is stored.
    pub fn path_for(output: &Path) -> PathBuf {
        let mut name = output.as_os_str().to_owned();
        name.push(".fp");
        PathBuf::from(name)
    }

    /// Load the stored fingerprint of `output`, if any.
    pub fn load(output: &Path) -> Option<Self> {
        let contents = std::fs::read_to_string(Self::path_for(output)).ok()?;
        serde_json::from_str(&contents).ok()
    }

    pub fn save(&self, output: &Path) -> Result<()> {
        let path = Self::path_for(output);
        let json = serde_json::to_string(self).context("failed to serialize fingerprint")?;
        crate::util::fs::write_string(&path, &json)
    }

    /// Whether `output` exists and was produced from exactly these inputs.
    pub fn is_fresh(&self, output: &Path) -> bool {
        output.exists() && Self::load(output).as_ref() == Some(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn command() -> CommandSpec {
        CommandSpec::new("g++").args(["-O2", "-c", "a.cc", "-o", "a.o"])
    }

    #[test]
    fn test_fingerprint_tracks_inputs_and_command() {
        let tmp = TempDir::new().unwrap();
        let source = tmp.path().join("a.cc");
        let output = tmp.path().join("a.o");
        std::fs::write(&source, "int x;").unwrap();
        std::fs::write(&output, "obj").unwrap();

        let fp = StepFingerprint::compute(&command(), &[source.clone()]).unwrap();
        assert!(!fp.is_fresh(&output));

        fp.save(&output).unwrap();
        assert!(tmp.path().join("a.o.fp").is_file());
        assert!(fp.is_fresh(&output));

        std::fs::write(&source, "int y;").unwrap();
        let changed = StepFingerprint::compute(&command(), &[source.clone()]).unwrap();
        assert!(!changed.is_fresh(&output));

        let other_flags = CommandSpec::new("g++").args(["-O3", "-c", "a.cc", "-o", "a.o"]);
        let reflagged = StepFingerprint::compute(&other_flags, &[source]).unwrap();
        assert_ne!(reflagged.command_hash, changed.command_hash);
    }

    #[test]
    fn test_missing_output_is_stale() {
        let tmp = TempDir::new().unwrap();
        let output = tmp.path().join("lib.a");

        let fp = StepFingerprint::compute(&command(), &[tmp.path().join("gone.h")]).unwrap();
        assert_eq!(fp.input_hashes.values().next().map(String::as_str), Some(MISSING));
        fp.save(&output).unwrap();
        assert!(!fp.is_fresh(&output));
    }
}
