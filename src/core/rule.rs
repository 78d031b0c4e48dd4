//! Build rule declarations.
//!
//! A rule is inert data read from a manifest: it names a set of sources and
//! headers and the other rules it depends on. Nothing here touches the
//! filesystem.

use std::fmt;
use std::path::{Component, Path, PathBuf};

use miette::SourceSpan;
use serde::{Deserialize, Serialize};

use crate::core::reference::RuleRef;

/// The two kinds of declaration a manifest can contain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleKind {
    /// `librule(...)`: a linkable library.
    Library,
    /// `binrule(...)`: an executable.
    Binary,
}

impl RuleKind {
    /// The manifest function that declares this kind.
    pub fn function_name(&self) -> &'static str {
        match self {
            RuleKind::Library => "librule",
            RuleKind::Binary => "binrule",
        }
    }

    pub fn from_function_name(name: &str) -> Option<Self> {
        match name {
            "librule" => Some(RuleKind::Library),
            "binrule" => Some(RuleKind::Binary),
            _ => None,
        }
    }
}

impl fmt::Display for RuleKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.function_name())
    }
}

/// Source language, derived from the file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    C,
    #[default]
    Cxx,
}

impl Language {
    /// Detect the language of a source file, `None` for unsupported extensions.
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "c" => Some(Language::C),
            "cc" | "cpp" | "cxx" | "C" | "c++" => Some(Language::Cxx),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::C => "c",
            Language::Cxx => "c++",
        }
    }
}

/// A single `librule` or `binrule` declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Rule {
    pub name: String,
    pub kind: RuleKind,
    /// Files compiled into the artifact, relative to the manifest directory.
    pub sources: Vec<String>,
    /// Include files exposed to dependents.
    pub headers: Vec<String>,
    pub deplibs: Vec<RuleRef>,
    /// Extra compiler flags for this rule's sources.
    pub cflags: Vec<String>,
    /// Extra flags for any binary linking this rule.
    pub linkflags: Vec<String>,
    /// Location of the declaration in its manifest.
    pub span: SourceSpan,
}

impl Rule {
    pub fn new(name: impl Into<String>, kind: RuleKind) -> Self {
        Rule {
            name: name.into(),
            kind,
            sources: Vec::new(),
            headers: Vec::new(),
            deplibs: Vec::new(),
            cflags: Vec::new(),
            linkflags: Vec::new(),
            span: SourceSpan::from(0..0),
        }
    }

    pub fn is_library(&self) -> bool {
        self.kind == RuleKind::Library
    }

    pub fn is_binary(&self) -> bool {
        self.kind == RuleKind::Binary
    }

    /// A library without sources produces no archive.
    pub fn is_header_only(&self) -> bool {
        self.is_library() && self.sources.is_empty()
    }

    pub fn source_paths(&self, dir: &Path) -> Vec<PathBuf> {
        self.sources.iter().map(|s| dir.join(s)).collect()
    }

    pub fn header_paths(&self, dir: &Path) -> Vec<PathBuf> {
        self.headers.iter().map(|h| dir.join(h)).collect()
    }

    /// Sources that are absolute or climb out of the manifest directory.
    pub fn escaping_sources(&self) -> impl Iterator<Item = &str> {
        self.sources
            .iter()
            .map(String::as_str)
            .filter(|s| escapes_dir(s))
    }
}

/// Whether a listed file leaves the directory it is relative to.
pub fn escapes_dir(file: &str) -> bool {
    Path::new(file)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_from_path() {
        assert_eq!(Language::from_path(Path::new("helper.c")), Some(Language::C));
        assert_eq!(Language::from_path(Path::new("main.cc")), Some(Language::Cxx));
        assert_eq!(Language::from_path(Path::new("sub/geometry.cpp")), Some(Language::Cxx));
        assert_eq!(Language::from_path(Path::new("kernel.h")), None);
        assert_eq!(Language::from_path(Path::new("Makefile")), None);
    }

    #[test]
    fn test_rule_kind_names() {
        assert_eq!(RuleKind::from_function_name("librule"), Some(RuleKind::Library));
        assert_eq!(RuleKind::from_function_name("binrule"), Some(RuleKind::Binary));
        assert_eq!(RuleKind::from_function_name("testrule"), None);
        assert_eq!(RuleKind::Binary.to_string(), "binrule");
    }

    #[test]
    fn test_header_only() {
        let mut rule = Rule::new("la", RuleKind::Library);
        rule.headers.push("la.h".to_string());
        assert!(rule.is_header_only());

        rule.sources.push("la.cc".to_string());
        assert!(!rule.is_header_only());
        assert_eq!(
            rule.source_paths(Path::new("/x")),
            vec![PathBuf::from("/x/la.cc")]
        );
    }

    #[test]
    fn test_escaping_sources() {
        let mut rule = Rule::new("la", RuleKind::Library);
        rule.sources = vec![
            "la.cc".to_string(),
            "./sub/vec.cc".to_string(),
            "../base/common.cc".to_string(),
            "/tmp/x.cc".to_string(),
        ];
        assert_eq!(
            rule.escaping_sources().collect::<Vec<_>>(),
            vec!["../base/common.cc", "/tmp/x.cc"]
        );
    }
}
