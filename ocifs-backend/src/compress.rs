//! Compression methods beyond the native gzip tee in [`crate::hash`].
//!
//! `gzip` is handled in-process (see [`crate::hash::LayerWriter`]); the
//! other methods a dataset might be configured with are not in this crate's
//! dependency stack, so they remain external collaborators invoked as
//! subprocesses, the same way the backend shells out to `zfs`.

use std::path::Path;
use std::process::Command;

use crate::error::{BackendError, Result};

/// A non-native compression method, invoked as an external CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExternalMethod {
    /// `xz` / `xzcat`.
    Xz,
    /// `bzip2` / `bzcat`.
    Bzip2,
    /// `lzma` / `lzcat`.
    Lzma,
}

impl ExternalMethod {
    /// Parse a method name as used in configuration (`graph.zfs.compression`
    /// values that aren't `gzip`/`lz4`/`off` end up here).
    pub fn parse(name: &str) -> Result<Self> {
        match name {
            "xz" => Ok(Self::Xz),
            "bzip2" => Ok(Self::Bzip2),
            "lzma" => Ok(Self::Lzma),
            other => Err(BackendError::UnsupportedCompression(other.to_string())),
        }
    }

    fn compress_bin(self) -> &'static str {
        match self {
            Self::Xz => "xz",
            Self::Bzip2 => "bzip2",
            Self::Lzma => "lzma",
        }
    }

    fn decompress_bin(self) -> &'static str {
        match self {
            Self::Xz => "xzcat",
            Self::Bzip2 => "bzcat",
            Self::Lzma => "lzcat",
        }
    }
}

/// Compress `path` in place, leaving the original file intact (`--keep`) and
/// a `<path>.<ext>` sibling next to it.
pub fn compress_file(path: &Path, method: ExternalMethod) -> Result<()> {
    run(method.compress_bin(), &["--keep"], path, "compress_file")?;
    Ok(())
}

/// Decompress `path`, returning the decompressed bytes.
pub fn uncompress_file(path: &Path, method: ExternalMethod) -> Result<Vec<u8>> {
    let output = run(method.decompress_bin(), &[], path, "uncompress_file")?;
    Ok(output)
}

fn run(bin: &str, flags: &[&str], path: &Path, op: &'static str) -> Result<Vec<u8>> {
    tracing::debug!(op, bin, path = %path.display(), "running compression command");
    let output = Command::new(bin).args(flags).arg(path).output()?;
    if !output.status.success() {
        return Err(BackendError::CommandFailed {
            op,
            status: output.status.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }
    Ok(output.stdout)
}
