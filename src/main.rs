use anyhow::{Context, Result};
use clap::Parser;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod check;
mod cli;
mod document;
mod encryption;

use check::{check_files, Report};
use cli::RootArgs;

fn main() -> Result<ExitCode> {
    let args = RootArgs::parse();
    init_tracing(args.verbose);

    let options = args.check_options();
    let report = check_files(&args.filenames, &options)?;

    if args.json {
        print_json(&report)?;
    } else {
        print_failures(&report);
    }

    Ok(if report.valid {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

// Diagnostics go to stderr; stdout is reserved for verdicts.
fn init_tracing(verbose: bool) {
    let directive = if verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directive))
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();
}

fn print_failures(report: &Report) {
    for verdict in report.failures() {
        println!("{}", verdict.message);
    }
}

fn print_json(report: &Report) -> Result<()> {
    let text = serde_json::to_string_pretty(report).context("serialize report")?;
    println!("{text}");
    Ok(())
}
