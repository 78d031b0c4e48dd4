//! Build modes.
//!
//! A mode is a named set of compile and link flags. `check` is the default:
//! optimized code with debug assertions enabled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    /// Debug build with verbose tracing compiled in.
    Verbose,
    /// Unoptimized debug build.
    Debug,
    /// Optimized, with debug checks.
    #[default]
    Check,
    /// Optimized, checks compiled out.
    Fast,
    /// Fast plus relaxed floating point.
    Unsafe,
    /// Instrumented for gprof.
    Profile,
}

impl BuildMode {
    pub const ALL: [BuildMode; 6] = [
        BuildMode::Verbose,
        BuildMode::Debug,
        BuildMode::Check,
        BuildMode::Fast,
        BuildMode::Unsafe,
        BuildMode::Profile,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BuildMode::Verbose => "verbose",
            BuildMode::Debug => "debug",
            BuildMode::Check => "check",
            BuildMode::Fast => "fast",
            BuildMode::Unsafe => "unsafe",
            BuildMode::Profile => "profile",
        }
    }

    pub fn cflags(&self) -> &'static [&'static str] {
        match self {
            BuildMode::Verbose => &["-g", "-O0", "-DDEBUG", "-DVERBOSE"],
            BuildMode::Debug => &["-g", "-O0", "-DDEBUG"],
            BuildMode::Check => &["-g", "-O2", "-DDEBUG"],
            BuildMode::Fast => &["-O3", "-DNDEBUG"],
            BuildMode::Unsafe => &["-O3", "-ffast-math", "-DNDEBUG", "-DUNSAFE"],
            BuildMode::Profile => &["-O2", "-pg", "-DNDEBUG"],
        }
    }

    pub fn ldflags(&self) -> &'static [&'static str] {
        match self {
            BuildMode::Profile => &["-pg"],
            _ => &[],
        }
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BuildMode::ALL
            .iter()
            .copied()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| {
                let known: Vec<&str> = BuildMode::ALL.iter().map(|m| m.as_str()).collect();
                format!("unknown mode `{}` (expected one of: {})", s, known.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_check() {
        assert_eq!(BuildMode::default(), BuildMode::Check);
        assert!(BuildMode::Check.cflags().contains(&"-DDEBUG"));
    }

    #[test]
    fn test_parse_modes() {
        for mode in BuildMode::ALL {
            assert_eq!(mode.as_str().parse::<BuildMode>().unwrap(), mode);
        }
        let err = "turbo".parse::<BuildMode>().unwrap_err();
        assert!(err.contains("expected one of: verbose, debug, check"));
    }

    #[test]
    fn test_profile_links_with_pg() {
        assert_eq!(BuildMode::Profile.ldflags(), &["-pg"]);
        assert!(BuildMode::Fast.ldflags().is_empty());
        assert!(BuildMode::Fast.cflags().contains(&"-DNDEBUG"));
    }
}
