//! `runtime.json` and per-container bookkeeping persistence.

use std::io::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::Container;

#[derive(Debug, Serialize, Deserialize)]
struct RawRoot {
    containers: Vec<RawContainerSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
struct RawContainerSummary {
    id: String,
    name: String,
    create_time: DateTime<Utc>,
}

/// Full per-container bookkeeping record, written as `container.json`
/// inside the container's bundle directory.
#[derive(Debug, Serialize, Deserialize)]
pub(crate) struct ContainerRecord {
    pub(crate) id: String,
    pub(crate) runc_id: String,
    pub(crate) name: String,
    pub(crate) create_time: DateTime<Utc>,
    pub(crate) image_id: String,
    pub(crate) filesystem_id: String,
}

impl From<&Container> for ContainerRecord {
    fn from(c: &Container) -> Self {
        Self {
            id: c.id.clone(),
            runc_id: c.runc_id().to_string(),
            name: c.name.clone(),
            create_time: c.create_time,
            image_id: c.image_id.clone(),
            filesystem_id: c.filesystem_id.clone(),
        }
    }
}

impl From<ContainerRecord> for Container {
    fn from(r: ContainerRecord) -> Self {
        Self { id: r.id, name: r.name, create_time: r.create_time, image_id: r.image_id, filesystem_id: r.filesystem_id }
    }
}

/// Load `runtime.json`'s container ids, returning an empty list if it does
/// not exist yet. Full records live in each container's own `container.json`.
pub(crate) fn load_index(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let data = std::fs::read(path)?;
    let raw: RawRoot = serde_json::from_slice(&data)?;
    Ok(raw.containers.into_iter().map(|c| c.id).collect())
}

/// Load a container's `container.json` bookkeeping file.
pub(crate) fn load_container_record(dir: &Path) -> Result<ContainerRecord> {
    let data = std::fs::read(dir.join("container.json"))?;
    Ok(serde_json::from_slice(&data)?)
}

/// Atomically rewrite `runtime.json`.
pub(crate) fn save_index(path: &Path, containers: &[Container]) -> Result<()> {
    let raw = RawRoot {
        containers: containers.iter().map(|c| RawContainerSummary { id: c.id.clone(), name: c.name.clone(), create_time: c.create_time }).collect(),
    };
    let json = serde_json::to_vec(&raw)?;
    atomic_write(path, &json)
}

/// Write a container's `container.json` bookkeeping file.
pub(crate) fn save_container_record(dir: &Path, container: &Container) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let record = ContainerRecord::from(container);
    let json = serde_json::to_vec(&record)?;
    atomic_write(&dir.join("container.json"), &json)
}

/// Write a container's `config.json` runtime-spec bundle document.
pub(crate) fn save_bundle_config(dir: &Path, config: &serde_json::Value) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_vec(config)?;
    atomic_write(&dir.join("config.json"), &json)
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
