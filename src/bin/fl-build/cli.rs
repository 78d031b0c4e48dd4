//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;

/// fl-build - build C/C++ rules declared in build.py manifests
#[derive(Parser)]
#[command(name = "fl-build")]
#[command(author, version, about, long_about = None)]
#[command(subcommand_precedence_over_arg = true)]
pub struct Cli {
    /// Root of the source tree (defaults to FL_ROOT, then the config, then the current directory)
    #[arg(long, global = true, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Building is the default command: `fl-build main`. Subcommand names
    /// take precedence over the target.
    #[command(flatten)]
    pub build: BuildArgs,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build a rule and everything it depends on
    Build(BuildArgs),

    /// Validate manifests: names, references, files and cycles
    Check(CheckArgs),

    /// Display the dependency tree of a rule
    Tree(TreeArgs),

    /// List the rules declared in a manifest
    Rules(RulesArgs),

    /// Remove build outputs
    Clean(CleanArgs),

    /// Print shell commands that point FL_ROOT at a source tree
    Env(EnvArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

#[derive(Args, Default)]
pub struct BuildArgs {
    /// Rule to build: `name` in this directory, or `pkg`, `pkg:name`, `:name`
    pub target: Option<String>,

    /// Build mode: verbose, debug, check, fast, unsafe or profile
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Compiler family: gcc or clang
    #[arg(long)]
    pub compiler: Option<String>,

    /// Number of parallel jobs
    #[arg(short, long)]
    pub jobs: Option<usize>,

    /// Emit build plan as JSON (no build)
    #[arg(long)]
    pub plan: bool,

    /// Write the Makefile without compiling
    #[arg(long)]
    pub makefile_only: bool,

    /// Do not copy the built binary into the current directory
    #[arg(long)]
    pub no_copy: bool,
}

#[derive(Args)]
pub struct CheckArgs {
    /// Validate this rule and its dependencies (defaults to the whole tree)
    pub target: Option<String>,
}

#[derive(Args)]
pub struct TreeArgs {
    /// Rule to show the tree for
    pub target: String,

    /// Maximum depth to display
    #[arg(short, long)]
    pub depth: Option<usize>,

    /// Expand rules that were already shown
    #[arg(long)]
    pub duplicates: bool,
}

#[derive(Args)]
pub struct RulesArgs {
    /// Directory holding the build.py (defaults to the current directory)
    pub dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct CleanArgs {
    /// Only remove the outputs of this rule's build
    pub target: Option<String>,

    /// Build mode whose outputs are removed
    #[arg(short, long)]
    pub mode: Option<String>,

    /// Compiler family whose outputs are removed
    #[arg(long)]
    pub compiler: Option<String>,

    /// Remove the whole build directory
    #[arg(long, conflicts_with = "target")]
    pub all: bool,
}

#[derive(Args)]
pub struct EnvArgs {
    /// Root of the source tree
    pub root: PathBuf,

    /// Shell syntax: sh, bash, zsh or fish
    #[arg(long, default_value = "sh")]
    pub shell: String,

    /// Also store the root in the global config
    #[arg(long)]
    pub persist: bool,
}

#[derive(Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: Shell,
}

impl BuildArgs {
    /// Whether anything was given beyond the defaults.
    pub fn is_empty(&self) -> bool {
        self.target.is_none()
            && self.mode.is_none()
            && self.compiler.is_none()
            && self.jobs.is_none()
            && !self.plan
            && !self.makefile_only
            && !self.no_copy
    }
}
