//! Shared test infrastructure for integration tests.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

pub const CIPHERTEXT: &str = "ENC[AES256_GCM,data:9LiS,iv:B/Add+R3lTSx66Qrq8/+jFD2mok8GdD7R32uAf04+Ho=,tag:iyCZ1thFop63/2L+skFcdg==,type:str]";

/// Scratch directory of input files for one test.
pub struct Workspace {
    dir: TempDir,
}

/// Captured result of one `ensure-sops` invocation.
pub struct RunResult {
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl RunResult {
    pub fn stdout_lines(&self) -> Vec<&str> {
        self.stdout.lines().collect()
    }
}

impl Workspace {
    pub fn create() -> Self {
        Self {
            dir: tempfile::tempdir().expect("create temp dir"),
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.dir.path().join(name);
        std::fs::write(&path, contents.as_bytes()).expect("write fixture");
        path
    }

    /// Runs the binary with `args`, relative to the workspace directory.
    pub fn run(&self, args: &[&str]) -> RunResult {
        let output: Output = Command::new(env!("CARGO_BIN_EXE_ensure-sops"))
            .args(args)
            .current_dir(self.dir.path())
            .output()
            .expect("run ensure-sops");
        RunResult {
            code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        }
    }
}
