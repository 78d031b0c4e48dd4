//! `build.py` manifest loading.
//!
//! A manifest is a sequence of `librule(...)` and `binrule(...)` calls with
//! keyword arguments. Only string literals and lists of string literals are
//! accepted as values; everything else is a parse error reported with the
//! offending span.

mod lexer;
mod parser;

use std::path::{Path, PathBuf};

use miette::{Diagnostic as MietteDiagnostic, NamedSource, SourceSpan};
use thiserror::Error;

use crate::core::reference::{validate_rule_name, PackagePath, RuleRef};
use crate::core::rule::{Rule, RuleKind};

use parser::{Parser, RuleDecl, Spanned};

/// File name of a manifest.
pub const MANIFEST_NAME: &str = "build.py";

/// Syntax error before the source text is attached.
#[derive(Debug, Clone)]
pub(crate) struct ParseError {
    pub message: String,
    pub span: SourceSpan,
    pub help: Option<String>,
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: impl Into<SourceSpan>) -> Self {
        ParseError {
            message: message.into(),
            span: span.into(),
            help: None,
        }
    }

    pub fn with_help(mut self, help: impl Into<String>) -> Self {
        self.help = Some(help.into());
        self
    }
}

/// A manifest syntax or schema error with its source attached.
#[derive(Debug, Error, MietteDiagnostic)]
#[error("{message}")]
#[diagnostic(code(flbuild::manifest::parse))]
pub struct ManifestParseError {
    pub message: String,
    #[source_code]
    pub src: NamedSource<String>,
    #[label("here")]
    pub span: SourceSpan,
    #[help]
    pub help: Option<String>,
}

impl ManifestParseError {
    /// 1-based line and column of the error.
    pub fn line_col(&self) -> (usize, usize) {
        let text = self.src.inner();
        let before = text.get(..self.span.offset()).unwrap_or(text);
        let line = before.matches('\n').count() + 1;
        let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
        (line, column)
    }
}

/// Error loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("failed to read manifest `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{}: {}", path.display(), error.message)]
    Parse {
        path: PathBuf,
        error: Box<ManifestParseError>,
    },
}

impl ManifestError {
    /// The miette report for parse errors, if any.
    pub fn parse_error(&self) -> Option<&ManifestParseError> {
        match self {
            ManifestError::Parse { error, .. } => Some(error),
            ManifestError::Io { .. } => None,
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            ManifestError::Io { path, .. } | ManifestError::Parse { path, .. } => path,
        }
    }
}

/// A parsed `build.py`.
#[derive(Debug, Clone)]
pub struct Manifest {
    package: PackagePath,
    path: PathBuf,
    dir: PathBuf,
    rules: Vec<Rule>,
}

impl Manifest {
    /// Read and parse the manifest at `path`.
    pub fn load(path: &Path, package: PackagePath) -> Result<Self, ManifestError> {
        let source = std::fs::read_to_string(path).map_err(|source| ManifestError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&source, path, package)
    }

    /// Parse manifest text as if read from `path`.
    pub fn parse(source: &str, path: &Path, package: PackagePath) -> Result<Self, ManifestError> {
        let dir = path.parent().unwrap_or(Path::new(".")).to_path_buf();
        let default_name = package
            .last_component()
            .map(str::to_string)
            .or_else(|| dir.file_name().map(|n| n.to_string_lossy().into_owned()));

        let wrap = |e: ParseError| ManifestError::Parse {
            path: path.to_path_buf(),
            error: Box::new(ManifestParseError {
                message: e.message,
                src: NamedSource::new(path.display().to_string(), source.to_string()),
                span: e.span,
                help: e.help,
            }),
        };

        let tokens = lexer::tokenize(source).map_err(wrap)?;
        let decls = Parser::new(tokens).parse_file().map_err(wrap)?;

        let rules = decls
            .into_iter()
            .map(|decl| build_rule(decl, default_name.as_deref()))
            .collect::<Result<Vec<_>, _>>()
            .map_err(wrap)?;

        tracing::debug!("parsed {} rule(s) from {}", rules.len(), path.display());

        Ok(Manifest {
            package,
            path: path.to_path_buf(),
            dir,
            rules,
        })
    }

    pub fn package(&self) -> &PackagePath {
        &self.package
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that source and header paths are relative to.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Every declaration in file order, duplicates included.
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// The first rule declared with `name`.
    pub fn rule(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.name == name)
    }

    pub fn rule_names(&self) -> Vec<&str> {
        self.rules.iter().map(|r| r.name.as_str()).collect()
    }
}

fn strings(items: Vec<Spanned>) -> Vec<String> {
    items.into_iter().map(|s| s.value).collect()
}

fn build_rule(decl: RuleDecl, default_name: Option<&str>) -> Result<Rule, ParseError> {
    let kind = decl.kind.unwrap_or(RuleKind::Library);

    let name = match &decl.name {
        Some(name) => {
            validate_rule_name(&name.value)
                .map_err(|e| ParseError::new(e.to_string(), name.span))?;
            name.value.clone()
        }
        None if kind == RuleKind::Library => default_name
            .ok_or_else(|| {
                ParseError::new("cannot infer a library name for this manifest", decl.span)
                    .with_help("add `name = \"...\"` to the librule")
            })?
            .to_string(),
        None => {
            return Err(ParseError::new("`binrule` requires a `name`", decl.span)
                .with_help("add `name = \"...\"` to name the executable"))
        }
    };

    let deplibs = decl
        .deplibs
        .iter()
        .map(|dep| {
            dep.value
                .parse::<RuleRef>()
                .map_err(|e| ParseError::new(e.to_string(), dep.span))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rule = Rule::new(name, kind);
    rule.sources = strings(decl.sources);
    rule.headers = strings(decl.headers);
    rule.deplibs = deplibs;
    rule.cflags = strings(decl.cflags);
    rule.linkflags = strings(decl.linkflags);
    rule.span = decl.span;
    Ok(rule)
}
