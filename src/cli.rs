//! CLI argument parsing for the pre-commit check.
//!
//! The CLI is intentionally thin: it collects paths and flags and hands a
//! plain [`CheckOptions`] to the pipeline in `check`.
use crate::check::CheckOptions;
use clap::Parser;
use std::path::PathBuf;

/// File extensions routed to the YAML loader unless overridden.
pub const DEFAULT_YAML_EXTENSIONS: &[&str] = &["yaml", "yml"];

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "ensure-sops",
    version,
    about = "Check that files meant to hold secrets are encrypted with sops",
    after_help = "Files ending in .yaml or .yml are parsed as YAML; every other file is parsed\nas JSON. .yml counts as YAML by default; pass --yaml-extension yaml to parse\nonly .yaml files as YAML.\n\nExamples:\n  ensure-sops secrets/prod.yaml secrets/dev.json\n  ensure-sops -m secrets/bundle.yaml\n  ensure-sops --json secrets/*.yaml",
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Files to check
    #[arg(value_name = "FILE", required = true, num_args = 1..)]
    pub filenames: Vec<PathBuf>,

    /// Accept YAML streams with several documents and check each one
    #[arg(short = 'm', long)]
    pub allow_multiple_documents: bool,

    /// Extension parsed as YAML (repeatable, replaces the defaults: yaml, yml)
    #[arg(long = "yaml-extension", value_name = "EXT")]
    pub yaml_extensions: Vec<String>,

    /// Emit a machine-readable JSON report of every file
    #[arg(long)]
    pub json: bool,

    /// Emit debug diagnostics on stderr
    #[arg(long)]
    pub verbose: bool,
}

impl RootArgs {
    pub fn check_options(&self) -> CheckOptions {
        let yaml_extensions = if self.yaml_extensions.is_empty() {
            DEFAULT_YAML_EXTENSIONS
                .iter()
                .map(|ext| ext.to_string())
                .collect()
        } else {
            self.yaml_extensions
                .iter()
                .map(|ext| ext.trim_start_matches('.').to_string())
                .collect()
        };
        CheckOptions {
            multi_document: self.allow_multiple_documents,
            yaml_extensions,
        }
    }
}
