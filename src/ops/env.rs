//! Environment setup for `fl-build env`.
//!
//! Prints a script that exports `FL_ROOT` for the given shell, meant to be
//! evaluated by the caller: `eval "$(fl-build env /path/to/fastlib)"`.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{bail, Result};

use crate::util::context::ROOT_ENV;
use crate::util::fs::normalize_path;

/// Shell syntax for the emitted script.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellKind {
    /// POSIX sh, bash, zsh
    #[default]
    Sh,
    Fish,
}

impl ShellKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShellKind::Sh => "sh",
            ShellKind::Fish => "fish",
        }
    }
}

impl fmt::Display for ShellKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ShellKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "sh" | "bash" | "zsh" => Ok(ShellKind::Sh),
            "fish" => Ok(ShellKind::Fish),
            _ => Err(format!("unsupported shell `{}` (expected sh, bash, zsh or fish)", s)),
        }
    }
}

/// Check that `root` is a directory and return its absolute form.
pub fn resolve_root(cwd: &Path, root: &Path) -> Result<PathBuf> {
    let root = if root.is_absolute() {
        root.to_path_buf()
    } else {
        cwd.join(root)
    };
    if !root.is_dir() {
        bail!("`{}` is not a directory", root.display());
    }
    Ok(normalize_path(&root))
}

/// Script exporting `FL_ROOT` in `shell` syntax.
pub fn env_script(root: &Path, shell: ShellKind) -> String {
    let value = quote(&root.display().to_string());
    match shell {
        ShellKind::Sh => format!("export {}={}\n", ROOT_ENV, value),
        ShellKind::Fish => format!("set -gx {} {}\n", ROOT_ENV, value),
    }
}

/// Single-quote `s`, closing and reopening the quotes around embedded `'`.
fn quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_shell_parse() {
        assert_eq!("bash".parse::<ShellKind>().unwrap(), ShellKind::Sh);
        assert_eq!("fish".parse::<ShellKind>().unwrap(), ShellKind::Fish);
        assert!("powershell".parse::<ShellKind>().is_err());
    }

    #[test]
    fn test_env_script() {
        let root = Path::new("/home/me/fastlib");
        assert_eq!(
            env_script(root, ShellKind::Sh),
            "export FL_ROOT='/home/me/fastlib'\n"
        );
        assert_eq!(
            env_script(root, ShellKind::Fish),
            "set -gx FL_ROOT '/home/me/fastlib'\n"
        );
    }

    #[test]
    fn test_quote_embedded_quote() {
        assert_eq!(quote("it's"), r"'it'\''s'");
    }

    #[test]
    fn test_resolve_root() {
        let tmp = TempDir::new().unwrap();
        std::fs::create_dir(tmp.path().join("fastlib")).unwrap();

        let root = resolve_root(tmp.path(), Path::new("fastlib")).unwrap();
        assert!(root.is_absolute());
        assert!(root.ends_with("fastlib"));

        assert!(resolve_root(tmp.path(), Path::new("missing")).is_err());
    }
}
