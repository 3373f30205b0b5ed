//! Thin wrapper over the external `runc` binary.
//!
//! Only `create`, `start`, and `delete` are implemented; `exec` is
//! deliberately not, matching the upstream implementation this was
//! distilled from.

use std::path::Path;
use std::process::Command;

use crate::error::{Result, RuntimeError};
use crate::pre_exec;

/// Handle to the external `runc` binary.
#[derive(Debug, Clone)]
pub struct Runc {
    binary: std::path::PathBuf,
}

impl Default for Runc {
    fn default() -> Self {
        Self::new()
    }
}

impl Runc {
    /// Use the `runc` binary found on `PATH`.
    pub fn new() -> Self {
        Self { binary: "runc".into() }
    }

    /// Use an explicit path to the `runc` binary.
    pub fn with_binary(binary: impl Into<std::path::PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    fn run(&self, op: &'static str, args: &[&str]) -> Result<()> {
        tracing::debug!(op, args = ?args, "running runc command");
        let mut cmd = Command::new(&self.binary);
        cmd.args(args);
        pre_exec::apply(&mut cmd);
        let output = cmd.output()?;
        tracing::trace!(op, status = %output.status, "runc command finished");
        if !output.status.success() {
            return Err(RuntimeError::RuncFailed {
                op,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(())
    }

    /// `runc create <id> -b <bundle>`.
    pub fn create(&self, id: &str, bundle: &Path) -> Result<()> {
        self.run("create", &["create", id, "-b", &bundle.display().to_string()])
    }

    /// `runc start <id>`.
    pub fn start(&self, id: &str) -> Result<()> {
        self.run("start", &["start", id])
    }

    /// `runc delete [--force] <id>`.
    pub fn delete(&self, id: &str, force: bool) -> Result<()> {
        if force {
            self.run("delete", &["delete", "--force", id])
        } else {
            self.run("delete", &["delete", id])
        }
    }

    /// Not implemented by the upstream runtime this crate targets.
    pub fn exec(&self, _id: &str, _argv: &[&str]) -> Result<()> {
        Err(RuntimeError::Unsupported("exec".to_string()))
    }
}
