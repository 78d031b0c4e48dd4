//! fl-build CLI - builds librule/binrule manifests

use anyhow::{bail, Result};
use clap::Parser;
use miette::{GraphicalReportHandler, GraphicalTheme};
use tracing_subscriber::EnvFilter;

use flbuild::core::ManifestError;
use flbuild::resolver::ResolveError;
use flbuild::util::diagnostic;
use flbuild::util::GlobalContext;

mod cli;
mod commands;

use cli::{Cli, Commands};

fn main() {
    let cli = Cli::parse();
    let color = !cli.no_color;

    if let Err(e) = run(cli) {
        report(&e, color);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    // Set up logging
    let filter = if cli.verbose {
        EnvFilter::new("flbuild=debug")
    } else {
        EnvFilter::new("flbuild=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    if cli.command.is_some() && !cli.build.is_empty() {
        bail!("build options cannot be combined with a subcommand; use `fl-build build ...`");
    }

    let mut ctx = GlobalContext::new(cli.root)?;
    ctx.set_color(!cli.no_color);

    match cli.command {
        None => commands::build::execute(cli.build, &ctx, cli.verbose),
        Some(Commands::Build(args)) => commands::build::execute(args, &ctx, cli.verbose),
        Some(Commands::Check(args)) => commands::check::execute(args, &ctx),
        Some(Commands::Tree(args)) => commands::tree::execute(args, &ctx),
        Some(Commands::Rules(args)) => commands::rules::execute(args, &ctx),
        Some(Commands::Clean(args)) => commands::clean::execute(args, &ctx),
        Some(Commands::Env(args)) => commands::env::execute(args, &ctx),
        Some(Commands::Completions(args)) => commands::completions::execute(args),
    }
}

/// Print `e` the richest way available: a source snippet for manifest syntax
/// errors, a structured diagnostic for resolution errors, the error chain
/// otherwise.
fn report(e: &anyhow::Error, color: bool) {
    let manifest_error = e
        .downcast_ref::<ResolveError>()
        .and_then(|r| match r {
            ResolveError::Manifest(m) => Some(m),
            _ => None,
        })
        .or_else(|| e.downcast_ref::<ManifestError>());

    if let Some(parse) = manifest_error.and_then(|m| m.parse_error()) {
        let theme = if color {
            GraphicalTheme::unicode()
        } else {
            GraphicalTheme::unicode_nocolor()
        };
        let mut out = String::new();
        if GraphicalReportHandler::new_themed(theme)
            .render_report(&mut out, parse)
            .is_ok()
        {
            eprint!("{}", out);
            return;
        }
    }

    if let Some(resolve) = e.downcast_ref::<ResolveError>() {
        diagnostic::emit(&resolve.to_diagnostic(), color);
        return;
    }

    eprintln!("error: {:#}", e);
}
