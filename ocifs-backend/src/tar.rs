//! Plain tar packing/unpacking.
//!
//! These helpers operate on whole directories with no knowledge of
//! whiteouts or opaque-directory markers; the graph driver interprets those
//! on top (see the `changeset` module in `ocifs-graph`).

use std::io::{Read, Write};
use std::path::Path;

use crate::error::Result;

/// Append every regular file and directory under `dir` to `builder`, with
/// archive paths relative to `dir`.
pub fn pack_dir<W: Write>(builder: &mut tar::Builder<W>, dir: &Path) -> Result<()> {
    builder.append_dir_all(".", dir)?;
    Ok(())
}

/// Extract a tar stream into `dir`, creating it if necessary.
pub fn unpack_into<R: Read>(archive: &mut tar::Archive<R>, dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    archive.unpack(dir)?;
    Ok(())
}
