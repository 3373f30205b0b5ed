//! `distribution.json` and blob-store persistence.

use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ImageRecord {
    pub(crate) id: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub(crate) tags: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawRoot {
    images: Vec<ImageRecord>,
}

/// Load `distribution.json`. Returns an empty list if the file does not
/// exist yet.
pub(crate) fn load(path: &Path) -> Result<Vec<ImageRecord>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read(path)?;
    let raw: RawRoot = serde_json::from_slice(&data)?;
    Ok(raw.images)
}

/// Atomically rewrite `distribution.json`.
pub(crate) fn save(path: &Path, images: Vec<ImageRecord>) -> Result<()> {
    let raw = RawRoot { images };
    let json = serde_json::to_vec(&raw)?;
    atomic_write(path, &json)?;
    Ok(())
}

fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let tmp_path = path.with_extension("tmp");
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut tmp = std::fs::File::create(&tmp_path)?;
    tmp.write_all(data)?;
    tmp.sync_all()?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Write a content-addressed blob `<dir>/<id>`, creating `dir` if needed.
pub(crate) fn write_blob(dir: &Path, id: &str, bytes: &[u8]) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    atomic_write(&dir.join(id), bytes)
}

/// Read a content-addressed blob `<dir>/<id>`.
pub(crate) fn read_blob(dir: &Path, id: &str) -> Result<Vec<u8>> {
    Ok(std::fs::read(dir.join(id))?)
}

/// Remove a content-addressed blob, ignoring a missing file.
pub(crate) fn remove_blob(dir: &Path, id: &str) -> Result<()> {
    let path = dir.join(id);
    if path.exists() {
        std::fs::remove_file(path)?;
    }
    Ok(())
}
