//! ZFS-backed [`StorageBackend`] implementation.
//!
//! Every operation shells out to the `zfs` binary and parses its output.
//! Argument shapes mirror a reference userland tool closely enough that the
//! commands below are, line for line, what an operator would type by hand.

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use crate::error::{BackendError, Result};

/// A typed ZFS dataset property value, as returned by `zfs get -Hp`.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// `on` / `off`.
    Bool(bool),
    /// A numeric property such as `used` or `refer`.
    Int(u64),
    /// A `mountpoint`-shaped path value.
    Path(PathBuf),
    /// Any other textual value.
    Text(String),
    /// The property is unset (`-`).
    None,
}

/// The kind of change a diff entry represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// Path was added.
    Added,
    /// Path was removed.
    Removed,
    /// Path contents or metadata changed.
    Modified,
    /// Path was renamed (`rename_target` carries the new name).
    Renamed,
}

/// A single entry from `zfs diff`.
#[derive(Debug, Clone)]
pub struct DiffEntry {
    /// What kind of change this is.
    pub kind: ChangeKind,
    /// Path relative to the dataset root.
    pub path: PathBuf,
    /// For [`ChangeKind::Renamed`], the path it was renamed to.
    pub rename_target: Option<PathBuf>,
}

/// Capability surface the graph driver needs from a copy-on-write
/// filesystem backend.
///
/// `fs_diff` returns a boxed iterator rather than an associated type so the
/// trait stays object-safe; callers that need a concrete backend can still
/// downcast via `Any` if they ever need to (none currently do).
pub trait StorageBackend: std::fmt::Debug + Send + Sync {
    /// Create an empty dataset.
    fn fs_create(&self, name: &str, mountpoint: Option<&Path>, compression: Option<&str>) -> Result<()>;

    /// Clone a dataset from a read-only snapshot (`source_snapshot` is
    /// `dataset@tag`).
    fn fs_clone(&self, name: &str, source_snapshot: &str, mountpoint: Option<&Path>) -> Result<()>;

    /// Destroy a dataset, optionally recursively (including its snapshots).
    fn fs_destroy(&self, name: &str, recursive: bool) -> Result<()>;

    /// Snapshot `dataset` under `tag` (produces `dataset@tag`).
    fn fs_snapshot(&self, dataset: &str, tag: &str) -> Result<()>;

    /// Set a property on a dataset.
    fn fs_set(&self, dataset: &str, prop: &str, value: &str) -> Result<()>;

    /// Read a property from a dataset.
    fn fs_get(&self, dataset: &str, prop: &str) -> Result<PropertyValue>;

    /// Rename a dataset.
    fn fs_rename(&self, old: &str, new: &str) -> Result<()>;

    /// Enumerate the changes between `origin_snapshot` (or the empty
    /// filesystem, if `None`) and `final_snapshot`.
    fn fs_diff(
        &self,
        final_snapshot: &str,
        origin_snapshot: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = Result<DiffEntry>>>>;
}

/// [`StorageBackend`] implemented by shelling out to the system `zfs`
/// binary.
#[derive(Debug, Clone)]
pub struct ZfsBackend {
    /// Path to the `zfs` binary (normally just `"zfs"`, resolved via `PATH`).
    binary: PathBuf,
}

impl Default for ZfsBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ZfsBackend {
    /// Use the `zfs` binary found on `PATH`.
    pub fn new() -> Self {
        Self { binary: PathBuf::from("zfs") }
    }

    /// Use an explicit path to the `zfs` binary (for test doubles or
    /// non-standard installs).
    pub fn with_binary(binary: impl Into<PathBuf>) -> Self {
        Self { binary: binary.into() }
    }

    fn run(&self, op: &'static str, args: &[&str]) -> Result<Output> {
        tracing::debug!(op, args = ?args, "running zfs command");
        let output = Command::new(&self.binary).args(args).output()?;
        tracing::trace!(op, status = %output.status, "zfs command finished");
        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                op,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

impl StorageBackend for ZfsBackend {
    fn fs_create(&self, name: &str, mountpoint: Option<&Path>, compression: Option<&str>) -> Result<()> {
        let mut args = vec!["create"];
        let mountpoint_opt;
        if let Some(mp) = mountpoint {
            mountpoint_opt = format!("mountpoint={}", mp.display());
            args.push("-o");
            args.push(&mountpoint_opt);
        }
        let compression_opt;
        if let Some(c) = compression {
            compression_opt = format!("compression={c}");
            args.push("-o");
            args.push(&compression_opt);
        }
        args.push(name);
        self.run("fs_create", &args)?;
        Ok(())
    }

    fn fs_clone(&self, name: &str, source_snapshot: &str, mountpoint: Option<&Path>) -> Result<()> {
        let mut args = vec!["clone"];
        let mountpoint_opt;
        if let Some(mp) = mountpoint {
            mountpoint_opt = format!("mountpoint={}", mp.display());
            args.push("-o");
            args.push(&mountpoint_opt);
        }
        args.push(source_snapshot);
        args.push(name);
        self.run("fs_clone", &args)?;
        Ok(())
    }

    fn fs_destroy(&self, name: &str, recursive: bool) -> Result<()> {
        let mut args = vec!["destroy"];
        if recursive {
            args.push("-r");
        }
        args.push(name);
        self.run("fs_destroy", &args)?;
        Ok(())
    }

    fn fs_snapshot(&self, dataset: &str, tag: &str) -> Result<()> {
        let snapshot = format!("{dataset}@{tag}");
        self.run("fs_snapshot", &["snapshot", &snapshot])?;
        Ok(())
    }

    fn fs_set(&self, dataset: &str, prop: &str, value: &str) -> Result<()> {
        let assignment = format!("{prop}={value}");
        self.run("fs_set", &["set", &assignment, dataset])?;
        Ok(())
    }

    fn fs_get(&self, dataset: &str, prop: &str) -> Result<PropertyValue> {
        let output = self.run("fs_get", &["get", "-Hp", prop, dataset])?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let line = stdout.lines().next().ok_or_else(|| BackendError::InvalidProperty {
            prop: prop.to_string(),
            value: String::new(),
        })?;
        // NAME  PROPERTY  VALUE  SOURCE
        let raw = line.split('\t').nth(2).ok_or_else(|| BackendError::InvalidProperty {
            prop: prop.to_string(),
            value: line.to_string(),
        })?;
        Ok(parse_property(prop, raw))
    }

    fn fs_rename(&self, old: &str, new: &str) -> Result<()> {
        self.run("fs_rename", &["rename", old, new])?;
        Ok(())
    }

    fn fs_diff(
        &self,
        final_snapshot: &str,
        origin_snapshot: Option<&str>,
    ) -> Result<Box<dyn Iterator<Item = Result<DiffEntry>>>> {
        let mut args = vec!["diff", "-H", "-F"];
        match origin_snapshot {
            Some(origin) => args.extend([origin, final_snapshot]),
            None => {
                args.push("-E");
                args.push(final_snapshot);
            }
        }
        tracing::debug!(op = "fs_diff", args = ?args, "running zfs command");
        let mut child = Command::new(&self.binary)
            .args(&args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;
        let stdout = child.stdout.take().expect("piped stdout");
        let reader = BufReader::new(stdout);
        Ok(Box::new(DiffIter { lines: reader.lines(), child: Some(child) }))
    }
}

/// Lazily parses `zfs diff` output, one line at a time, so a large changeset
/// is never buffered in full.
struct DiffIter {
    lines: std::io::Lines<BufReader<std::process::ChildStdout>>,
    child: Option<std::process::Child>,
}

impl Iterator for DiffIter {
    type Item = Result<DiffEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.lines.next() {
            Some(Ok(line)) => Some(parse_diff_line(&line)),
            Some(Err(e)) => Some(Err(BackendError::Io(e))),
            None => {
                if let Some(mut child) = self.child.take() {
                    let _ = child.wait();
                }
                None
            }
        }
    }
}

fn parse_diff_line(line: &str) -> Result<DiffEntry> {
    let mut fields = line.split('\t');
    let marker = fields.next().unwrap_or_default();
    let kind = match marker {
        "+" => ChangeKind::Added,
        "-" => ChangeKind::Removed,
        "M" => ChangeKind::Modified,
        "R" => ChangeKind::Renamed,
        other => {
            return Err(BackendError::InvalidProperty {
                prop: "zfs diff marker".to_string(),
                value: other.to_string(),
            });
        }
    };
    // with -F the second field is a file-type character we don't use here
    let _file_type = fields.next();
    let path = PathBuf::from(fields.next().unwrap_or_default());
    let rename_target = fields.next().map(PathBuf::from);
    Ok(DiffEntry { kind, path, rename_target })
}

fn parse_property(prop: &str, raw: &str) -> PropertyValue {
    match raw {
        "-" => PropertyValue::None,
        "on" => PropertyValue::Bool(true),
        "off" => PropertyValue::Bool(false),
        _ if prop == "mountpoint" => PropertyValue::Path(PathBuf::from(raw)),
        _ => match raw.parse::<u64>() {
            Ok(n) => PropertyValue::Int(n),
            Err(_) => PropertyValue::Text(raw.to_string()),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_added_entry() {
        let entry = parse_diff_line("+\tF\t/a").unwrap();
        assert_eq!(entry.kind, ChangeKind::Added);
        assert_eq!(entry.path, PathBuf::from("/a"));
        assert!(entry.rename_target.is_none());
    }

    #[test]
    fn parses_rename_entry() {
        let entry = parse_diff_line("R\tF\t/a\t/b").unwrap();
        assert_eq!(entry.kind, ChangeKind::Renamed);
        assert_eq!(entry.path, PathBuf::from("/a"));
        assert_eq!(entry.rename_target, Some(PathBuf::from("/b")));
    }

    #[test]
    fn rejects_unknown_marker() {
        assert!(parse_diff_line("?\tF\t/a").is_err());
    }

    #[test]
    fn property_parsing() {
        assert_eq!(parse_property("readonly", "on"), PropertyValue::Bool(true));
        assert_eq!(parse_property("readonly", "off"), PropertyValue::Bool(false));
        assert_eq!(parse_property("used", "1024"), PropertyValue::Int(1024));
        assert_eq!(parse_property("mountpoint", "-"), PropertyValue::None);
        assert_eq!(parse_property("mountpoint", "/var/lib/oci/x"), PropertyValue::Path(PathBuf::from("/var/lib/oci/x")));
    }
}
