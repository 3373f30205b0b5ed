//! `driver.json` persistence.
//!
//! The graph is stored as a tree rooted at filesystems with no parent
//! layer: each filesystem optionally owns one committed layer, and that
//! layer optionally owns the filesystems cloned from it. Loading walks the
//! tree once, rebuilding the flat id-indexed maps the driver keeps at
//! runtime.

use std::collections::HashMap;
use std::io::Write as _;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{Descriptor, Filesystem, Layer};

#[derive(Debug, Serialize, Deserialize)]
struct RawRoot {
    #[serde(rename = "type")]
    kind: String,
    filesystems: Vec<RawFilesystem>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawFilesystem {
    id: String,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    container_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    layer: Option<Box<RawLayer>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawLayer {
    descriptor: Descriptor,
    diff_id: String,
    size: u64,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    images: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    filesystems: Vec<RawFilesystem>,
}

/// Result of a successful [`load`].
pub struct LoadedGraph {
    /// The `type` field recorded in `driver.json`, e.g. `"zfs"`.
    pub driver_type: String,
    /// All filesystems, indexed by id.
    pub filesystems: HashMap<String, Filesystem>,
    /// All layers, indexed by id.
    pub layers: HashMap<String, Layer>,
}

/// Load `driver.json` from `path`. Returns `None` if the file does not
/// exist yet (a fresh, empty graph).
pub fn load(path: &Path) -> Result<Option<LoadedGraph>> {
    if !path.exists() {
        return Ok(None);
    }
    let data = std::fs::read(path)?;
    let raw: RawRoot = serde_json::from_slice(&data)?;

    let mut filesystems = HashMap::new();
    let mut layers = HashMap::new();
    for root in raw.filesystems {
        flatten(root, None, &mut filesystems, &mut layers);
    }

    Ok(Some(LoadedGraph { driver_type: raw.kind, filesystems, layers }))
}

fn flatten(
    raw_fs: RawFilesystem,
    parent_layer_id: Option<String>,
    filesystems: &mut HashMap<String, Filesystem>,
    layers: &mut HashMap<String, Layer>,
) {
    let fs_id = raw_fs.id.clone();
    let child_layer_id = raw_fs.layer.as_ref().map(|l| strip_prefix(&l.descriptor.digest).to_string());

    filesystems.insert(
        fs_id.clone(),
        Filesystem {
            id: fs_id.clone(),
            parent_layer_id,
            child_layer_id: child_layer_id.clone(),
            container_id: raw_fs.container_id,
        },
    );

    if let Some(raw_layer) = raw_fs.layer {
        let layer_id = child_layer_id.expect("set above whenever layer is Some");
        let layer = Layer {
            id: layer_id.clone(),
            diff_id: raw_layer.diff_id,
            size: raw_layer.size,
            descriptor: raw_layer.descriptor,
            filesystem_id: fs_id,
            images: raw_layer.images.into_iter().collect(),
        };
        layers.insert(layer_id.clone(), layer);
        for child in raw_layer.filesystems {
            flatten(child, Some(layer_id.clone()), filesystems, layers);
        }
    }
}

/// Atomically rewrite `driver.json` from the current in-memory graph.
pub fn save(
    path: &Path,
    driver_type: &str,
    filesystems: &HashMap<String, Filesystem>,
    layers: &HashMap<String, Layer>,
) -> Result<()> {
    let roots: Vec<RawFilesystem> =
        filesystems.values().filter(|fs| fs.parent_layer_id.is_none()).map(|fs| build_raw(fs, filesystems, layers)).collect();
    let raw = RawRoot { kind: driver_type.to_string(), filesystems: roots };
    let json = serde_json::to_vec(&raw)?;
    atomic_write(path, &json)?;
    Ok(())
}

fn build_raw(fs: &Filesystem, filesystems: &HashMap<String, Filesystem>, layers: &HashMap<String, Layer>) -> RawFilesystem {
    let layer = fs.child_layer_id.as_ref().map(|layer_id| {
        let layer = layers.get(layer_id).expect("graph invariant: child_layer_id always resolves");
        let children: Vec<RawFilesystem> = filesystems
            .values()
            .filter(|child| child.parent_layer_id.as_deref() == Some(layer_id.as_str()))
            .map(|child| build_raw(child, filesystems, layers))
            .collect();
        Box::new(RawLayer {
            descriptor: layer.descriptor.clone(),
            diff_id: layer.diff_id.clone(),
            size: layer.size,
            images: layer.images.iter().cloned().collect(),
            filesystems: children,
        })
    });
    RawFilesystem { id: fs.id.clone(), container_id: fs.container_id.clone(), layer }
}

fn strip_prefix(digest: &str) -> &str {
    digest.strip_prefix("sha256:").unwrap_or(digest)
}

/// Write `data` to a `.tmp` sibling of `path`, fsync it, then rename over
/// `path` — so a concurrent reader (or a crash) never observes a partially
/// written document.
pub(crate) fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
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
