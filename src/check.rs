//! Per-file verdicts: load, validate every document, summarize.
//!
//! Soft failures (bad syntax, missing metadata, plaintext values) become a
//! [`Verdict`] and never stop the run. Read errors are returned as `Err` and
//! abort the run, since a named input that cannot be opened is not something
//! the check can judge.
use crate::document::{load_documents, LoadError};
use crate::encryption::validate_documents;
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Inputs shared by every file in a run.
#[derive(Debug, Clone)]
pub struct CheckOptions {
    pub multi_document: bool,
    /// Extensions (without the dot) routed to the YAML loader.
    pub yaml_extensions: Vec<String>,
}

/// Why a file is not properly encrypted.
#[derive(Debug, Error)]
pub enum Failure {
    #[error("Not valid JSON or YAML, is not properly encrypted")]
    Parse(String),
    #[error("sops metadata key not found in file, is not properly encrypted")]
    MissingMetadata,
    #[error("Unencrypted values found nested under keys: {}", .0.join(","))]
    UnencryptedValues(Vec<String>),
    #[error("sops encrypted_regex is not a valid regular expression ({0}), is not properly encrypted")]
    InvalidEncryptedRegex(String),
    #[error("no YAML documents found, is not properly encrypted")]
    NoDocuments,
}

impl Failure {
    pub fn kind(&self) -> FailureKind {
        match self {
            Failure::Parse(_) => FailureKind::ParseFailure,
            Failure::MissingMetadata => FailureKind::MissingMetadata,
            Failure::UnencryptedValues(_) => FailureKind::UnencryptedValues,
            Failure::InvalidEncryptedRegex(_) => FailureKind::InvalidEncryptedRegex,
            Failure::NoDocuments => FailureKind::NoDocuments,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    ParseFailure,
    MissingMetadata,
    UnencryptedValues,
    InvalidEncryptedRegex,
    NoDocuments,
}

/// Outcome for one file.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    pub path: PathBuf,
    pub valid: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<FailureKind>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub unencrypted_keys: Vec<String>,
}

impl Verdict {
    fn valid(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            valid: true,
            message: format!("{}: Valid encryption", path.display()),
            failure: None,
            unencrypted_keys: Vec::new(),
        }
    }

    fn invalid(path: &Path, failure: &Failure) -> Self {
        let unencrypted_keys = match failure {
            Failure::UnencryptedValues(keys) => keys.clone(),
            _ => Vec::new(),
        };
        Self {
            path: path.to_path_buf(),
            valid: false,
            message: format!("{}: {failure}", path.display()),
            failure: Some(failure.kind()),
            unencrypted_keys,
        }
    }
}

/// Machine-readable summary printed by `--json`.
#[derive(Debug, Serialize)]
pub struct Report {
    pub valid: bool,
    pub checked: usize,
    pub failed: usize,
    pub files: Vec<Verdict>,
}

impl Report {
    pub fn new(files: Vec<Verdict>) -> Self {
        let failed = files.iter().filter(|verdict| !verdict.valid).count();
        Self {
            valid: failed == 0,
            checked: files.len(),
            failed,
            files,
        }
    }

    pub fn failures(&self) -> impl Iterator<Item = &Verdict> {
        self.files.iter().filter(|verdict| !verdict.valid)
    }
}

/// Loads and judges a single file.
pub fn check_file(path: &Path, options: &CheckOptions) -> Result<Verdict> {
    let outcome = match load_documents(path, options.multi_document, &options.yaml_extensions) {
        Ok(documents) => validate_documents(&documents),
        Err(LoadError::Parse(reason)) => Err(Failure::Parse(reason)),
        Err(err @ LoadError::Io { .. }) => {
            return Err(err).with_context(|| format!("check {}", path.display()))
        }
    };

    let verdict = match outcome {
        Ok(()) => Verdict::valid(path),
        Err(failure) => {
            if let Failure::Parse(reason) = &failure {
                tracing::debug!(path = %path.display(), %reason, "parse failed");
            }
            Verdict::invalid(path, &failure)
        }
    };
    tracing::debug!(
        path = %path.display(),
        valid = verdict.valid,
        "file checked"
    );
    Ok(verdict)
}

/// Judges every file in input order; stops only on a read error.
pub fn check_files(paths: &[PathBuf], options: &CheckOptions) -> Result<Report> {
    let mut files = Vec::with_capacity(paths.len());
    for path in paths {
        files.push(check_file(path, options)?);
    }
    let report = Report::new(files);
    tracing::info!(
        checked = report.checked,
        failed = report.failed,
        "check complete"
    );
    Ok(report)
}
