//! Whiteout-encoded changeset tars.
//!
//! A changeset expresses the difference between a filesystem's current
//! state and its parent layer (or the empty filesystem, for a root layer)
//! as a tar stream: additions and modifications are ordinary entries,
//! removals become zero-byte `.wh.<name>` marker entries, and a directory
//! that entirely replaces its parent's version is preceded by a
//! `.wh..wh..opq` marker.

use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use ocifs_backend::{ChangeKind, DiffEntry};

use crate::error::{GraphError, Result};

const WHITEOUT_PREFIX: &str = ".wh.";
const OPAQUE_MARKER: &str = ".wh..wh..opq";

/// Encode the changes described by `diff` (as produced by
/// [`ocifs_backend::StorageBackend::fs_diff`]) into `tar_out`, reading
/// added/modified file content from `fs_root`.
pub fn write_changeset<W: Write>(
    tar_out: &mut tar::Builder<W>,
    fs_root: &Path,
    diff: impl Iterator<Item = ocifs_backend::Result<DiffEntry>>,
) -> Result<()> {
    for entry in diff {
        let entry = entry?;
        if is_root(&entry.path) {
            continue;
        }
        match entry.kind {
            ChangeKind::Added | ChangeKind::Modified => append_real_entry(tar_out, fs_root, &entry.path)?,
            ChangeKind::Removed => append_whiteout(tar_out, &entry.path)?,
            ChangeKind::Renamed => {
                append_whiteout(tar_out, &entry.path)?;
                let target = entry.rename_target.ok_or_else(|| {
                    GraphError::InvalidArgument(format!("rename entry for {:?} missing target", entry.path))
                })?;
                if !is_root(&target) {
                    append_real_entry(tar_out, fs_root, &target)?;
                }
            }
        }
    }
    Ok(())
}

fn is_root(path: &Path) -> bool {
    matches!(path.to_str(), Some("/") | Some(""))
}

fn append_real_entry<W: Write>(tar_out: &mut tar::Builder<W>, fs_root: &Path, rel: &Path) -> Result<()> {
    let archive_path = relative_archive_path(rel);
    let absolute = fs_root.join(&archive_path);
    let metadata = std::fs::symlink_metadata(&absolute)?;
    if metadata.is_dir() {
        tar_out.append_dir(&archive_path, &absolute)?;
    } else {
        let mut file = std::fs::File::open(&absolute)?;
        tar_out.append_file(&archive_path, &mut file)?;
    }
    Ok(())
}

fn append_whiteout<W: Write>(tar_out: &mut tar::Builder<W>, rel: &Path) -> Result<()> {
    let dir = rel.parent().unwrap_or_else(|| Path::new(""));
    let base = rel.file_name().ok_or_else(|| GraphError::InvalidArgument(format!("no filename in {rel:?}")))?;
    let whiteout_path = relative_archive_path(dir).join(format!("{WHITEOUT_PREFIX}{}", base.to_string_lossy()));

    let mut header = tar::Header::new_gnu();
    header.set_size(0);
    header.set_mode(0o644);
    header.set_entry_type(tar::EntryType::Regular);
    header.set_cksum();
    tar_out.append_data(&mut header, &whiteout_path, std::io::empty())?;
    Ok(())
}

/// Strip a leading `/` so tar entries are relative, matching the convention
/// every real tar tool uses for archive member names.
fn relative_archive_path(path: &Path) -> PathBuf {
    path.strip_prefix("/").map(Path::to_path_buf).unwrap_or_else(|_| path.to_path_buf())
}

/// Apply a changeset tar onto `target_dir`, honoring opaque-directory and
/// per-entry whiteout markers.
pub fn apply_changeset<R: Read>(archive: &mut tar::Archive<R>, target_dir: &Path) -> Result<()> {
    for entry in archive.entries()? {
        let mut entry = entry?;
        let path = entry.path()?.to_path_buf();
        let file_name = path.file_name().map(|n| n.to_string_lossy().into_owned()).unwrap_or_default();

        if file_name == OPAQUE_MARKER {
            let opaque_dir = target_dir.join(path.parent().unwrap_or_else(|| Path::new("")));
            if opaque_dir.exists() {
                std::fs::remove_dir_all(&opaque_dir)?;
            }
            std::fs::create_dir_all(&opaque_dir)?;
            continue;
        }

        if let Some(removed) = file_name.strip_prefix(WHITEOUT_PREFIX) {
            let removed_path = target_dir.join(path.parent().unwrap_or_else(|| Path::new(""))).join(removed);
            if removed_path.is_dir() {
                std::fs::remove_dir_all(&removed_path)?;
            } else if removed_path.exists() {
                std::fs::remove_file(&removed_path)?;
            }
            continue;
        }

        entry.unpack_in(target_dir)?;
    }
    Ok(())
}
