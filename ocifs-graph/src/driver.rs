//! The graph driver: a persistent DAG of [`Filesystem`]s and [`Layer`]s.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use ocifs_backend::{PropertyValue, StorageBackend};

use crate::error::{GraphError, Result};
use crate::id::random_id;
use crate::model::{Descriptor, Filesystem, Layer, LAYER_MEDIA_TYPE};
use crate::{changeset, persist};

/// Owns the filesystem/layer graph for one backend root directory.
///
/// `B` is the storage backend implementation (normally [`ocifs_backend::ZfsBackend`]);
/// tests substitute a fake implementation of [`StorageBackend`] so the graph
/// logic can be exercised without a real ZFS pool.
#[derive(Debug)]
pub struct GraphDriver<B: StorageBackend> {
    backend: B,
    driver_type: String,
    /// `<global.path>/driver.json`.
    driver_json: PathBuf,
    /// `<global.path>/filesystems` — default mountpoints.
    filesystems_root: PathBuf,
    /// `<global.path>/layers` — compressed blob store.
    layers_dir: PathBuf,
    /// Root ZFS dataset layers/filesystems are created under.
    base_dataset: String,
    /// Default dataset compression property for new filesystems.
    compression: String,
    filesystems: HashMap<String, Filesystem>,
    layers: HashMap<String, Layer>,
}

impl<B: StorageBackend> GraphDriver<B> {
    /// Open (or initialize) the graph rooted at `root`, backed by `backend`.
    ///
    /// Fails with [`GraphError::UnsupportedDriver`] if a persisted
    /// `driver.json` names a different backend type than `driver_type`.
    pub fn open(
        root: &Path,
        driver_type: impl Into<String>,
        base_dataset: impl Into<String>,
        compression: impl Into<String>,
        backend: B,
    ) -> Result<Self> {
        let driver_type = driver_type.into();
        let driver_json = root.join("driver.json");
        let loaded = persist::load(&driver_json)?;

        let (filesystems, layers) = match loaded {
            Some(graph) if graph.driver_type == driver_type => (graph.filesystems, graph.layers),
            Some(graph) => return Err(GraphError::UnsupportedDriver(graph.driver_type)),
            None => (HashMap::new(), HashMap::new()),
        };

        Ok(Self {
            backend,
            driver_type,
            driver_json,
            filesystems_root: root.join("filesystems"),
            layers_dir: root.join("layers"),
            base_dataset: base_dataset.into(),
            compression: compression.into(),
            filesystems,
            layers,
        })
    }

    fn dataset_name(&self, id: &str) -> String {
        format!("{}/{}", self.base_dataset, id)
    }

    /// Default mountpoint for a filesystem that isn't currently mounted by a
    /// container.
    #[must_use]
    pub fn default_mount_path(&self, fs_id: &str) -> PathBuf {
        self.filesystems_root.join(fs_id)
    }

    fn save(&self) -> Result<()> {
        persist::save(&self.driver_json, &self.driver_type, &self.filesystems, &self.layers)
    }

    /// Create a new working filesystem, empty or cloned from `parent_layer_id`.
    pub fn create_filesystem(&mut self, parent_layer_id: Option<&str>) -> Result<Filesystem> {
        let id = random_id();
        let dataset = self.dataset_name(&id);
        let mountpoint = self.default_mount_path(&id);

        match parent_layer_id {
            Some(layer_id) => {
                let layer = self.layers.get(layer_id).ok_or_else(|| GraphError::LayerUnknown(layer_id.to_string()))?;
                let snapshot = format!("{}@diff", self.dataset_name(&layer.filesystem_id));
                tracing::debug!(fs = %id, layer = layer_id, "cloning filesystem from layer");
                self.backend.fs_clone(&dataset, &snapshot, Some(&mountpoint))?;
            }
            None => {
                tracing::debug!(fs = %id, "creating empty filesystem");
                self.backend.fs_create(&dataset, Some(&mountpoint), Some(&self.compression))?;
            }
        }

        let fs = Filesystem { id: id.clone(), parent_layer_id: parent_layer_id.map(String::from), child_layer_id: None, container_id: None };
        self.filesystems.insert(id.clone(), fs.clone());
        self.save()?;
        Ok(fs)
    }

    /// Mount `fs_id` at `path` on behalf of `container_id`.
    pub fn mount_filesystem(&mut self, fs_id: &str, container_id: &str, path: &Path) -> Result<()> {
        let already_mounted = self.filesystems.get(fs_id).ok_or_else(|| GraphError::FilesystemUnknown(fs_id.to_string()))?.is_mounted();
        if already_mounted {
            return Err(GraphError::FilesystemInUse(fs_id.to_string()));
        }

        let dataset = self.dataset_name(fs_id);
        let default_path = self.default_mount_path(fs_id);
        self.backend.fs_set(&dataset, "mountpoint", &path.display().to_string())?;
        if path != default_path {
            let _ = std::fs::remove_dir(&default_path);
        }

        let fs = self.filesystems.get_mut(fs_id).expect("checked above");
        fs.container_id = Some(container_id.to_string());
        tracing::debug!(fs = fs_id, container = container_id, path = %path.display(), "mounted filesystem");
        self.save()
    }

    /// Unmount whichever filesystem is mounted by `container_id`, restoring
    /// its default mountpoint, optionally removing it afterward.
    pub fn unmount_filesystem(&mut self, container_id: &str, remove: bool) -> Result<()> {
        let fs_id = self
            .filesystems
            .values()
            .find(|f| f.container_id.as_deref() == Some(container_id))
            .map(|f| f.id.clone())
            .ok_or_else(|| GraphError::FilesystemUnknown(format!("mounted by container {container_id}")))?;

        let dataset = self.dataset_name(&fs_id);
        let default_path = self.default_mount_path(&fs_id);
        self.backend.fs_set(&dataset, "mountpoint", &default_path.display().to_string())?;
        self.filesystems.get_mut(&fs_id).expect("looked up above").container_id = None;
        self.save()?;

        if remove {
            self.remove_filesystem(&fs_id)?;
        }
        Ok(())
    }

    /// Destroy a filesystem. Fails with [`GraphError::FilesystemInUse`] if it
    /// is mounted or has a committed child layer.
    pub fn remove_filesystem(&mut self, fs_id: &str) -> Result<()> {
        let fs = self.filesystems.get(fs_id).ok_or_else(|| GraphError::FilesystemUnknown(fs_id.to_string()))?.clone();
        if fs.is_mounted() || fs.child_layer_id.is_some() {
            return Err(GraphError::FilesystemInUse(fs_id.to_string()));
        }

        let dataset = self.dataset_name(fs_id);
        self.backend.fs_destroy(&dataset, true)?;
        let _ = std::fs::remove_dir(self.default_mount_path(fs_id));
        self.filesystems.remove(fs_id);
        tracing::debug!(fs = fs_id, "removed filesystem");
        self.save()
    }

    /// Commit `fs_id`: snapshot it, derive its changeset against its parent
    /// layer (if any), hash and store the compressed blob, and register the
    /// resulting [`Layer`].
    pub fn create_layer(&mut self, fs_id: &str) -> Result<Layer> {
        let fs = self.filesystems.get(fs_id).ok_or_else(|| GraphError::FilesystemUnknown(fs_id.to_string()))?.clone();
        if fs.child_layer_id.is_some() {
            return Err(GraphError::InvalidArgument(format!("filesystem {fs_id} already has a committed layer")));
        }

        let dataset = self.dataset_name(fs_id);
        self.backend.fs_snapshot(&dataset, "diff")?;
        let final_snapshot = format!("{dataset}@diff");

        let origin_snapshot = match &fs.parent_layer_id {
            Some(parent_layer_id) => {
                let parent_layer = self.layers.get(parent_layer_id).ok_or_else(|| GraphError::LayerUnknown(parent_layer_id.clone()))?;
                Some(format!("{}@diff", self.dataset_name(&parent_layer.filesystem_id)))
            }
            None => None,
        };

        let diff = self.backend.fs_diff(&final_snapshot, origin_snapshot.as_deref())?;

        std::fs::create_dir_all(&self.layers_dir)?;
        let tmp = tempfile::NamedTempFile::new_in(&self.layers_dir)?;
        let digest = {
            let mut layer_writer = ocifs_backend::LayerWriter::new(tmp.as_file());
            {
                let mut builder = tar::Builder::new(&mut layer_writer);
                changeset::write_changeset(&mut builder, &self.default_mount_path(fs_id), diff)?;
                builder.finish()?;
            }
            layer_writer.finish()?
        };
        // `tmp` is removed on drop unless persisted, so every early return
        // above (backend failure, write failure) cleans it up automatically.

        let blob_path = self.layers_dir.join(&digest.layer_id);
        if !blob_path.exists() {
            tmp.persist(&blob_path).map_err(|e| e.error)?;
        }

        self.backend.fs_set(&dataset, "readonly", "on")?;
        let new_dataset = self.dataset_name(&digest.diff_id);
        self.backend.fs_rename(&dataset, &new_dataset)?;

        let descriptor = Descriptor { digest: format!("sha256:{}", digest.layer_id), size: digest.compressed_size, media_type: LAYER_MEDIA_TYPE.to_string() };
        let layer = Layer {
            id: digest.layer_id.clone(),
            diff_id: digest.diff_id.clone(),
            size: digest.compressed_size,
            descriptor,
            filesystem_id: digest.diff_id.clone(),
            images: std::collections::BTreeSet::new(),
        };

        self.filesystems.remove(fs_id);
        let mut rebound = fs;
        rebound.id = digest.diff_id.clone();
        rebound.child_layer_id = Some(layer.id.clone());
        self.filesystems.insert(rebound.id.clone(), rebound);

        self.layers.insert(layer.id.clone(), layer.clone());
        tracing::debug!(layer = %layer.id, diff_id = %layer.diff_id, size = layer.size, "committed layer");
        self.save()?;
        Ok(layer)
    }

    /// Destroy a layer. Fails with [`GraphError::LayerInUse`] if any image
    /// still references it or any filesystem still has it as a parent.
    pub fn remove_layer(&mut self, layer_id: &str) -> Result<()> {
        let layer = self.layers.get(layer_id).ok_or_else(|| GraphError::LayerUnknown(layer_id.to_string()))?.clone();
        let has_child_fs = self.filesystems.values().any(|f| f.parent_layer_id.as_deref() == Some(layer_id));
        if !layer.is_unreferenced() || has_child_fs {
            return Err(GraphError::LayerInUse(layer_id.to_string()));
        }

        let dataset = self.dataset_name(&layer.filesystem_id);
        self.backend.fs_destroy(&dataset, true)?;
        let blob_path = self.layers_dir.join(&layer.id);
        if blob_path.exists() {
            std::fs::remove_file(&blob_path)?;
        }
        let _ = std::fs::remove_dir(self.default_mount_path(&layer.filesystem_id));

        self.layers.remove(layer_id);
        self.filesystems.remove(&layer.filesystem_id);
        tracing::debug!(layer = layer_id, "removed layer");
        self.save()
    }

    /// Add `image_id` to the set of images referencing `layer_id`.
    pub fn add_image_reference(&mut self, layer_id: &str, image_id: &str) -> Result<()> {
        let layer = self.layers.get_mut(layer_id).ok_or_else(|| GraphError::LayerUnknown(layer_id.to_string()))?;
        if !layer.images.insert(image_id.to_string()) {
            return Err(GraphError::InvalidArgument(format!("image {image_id} already references layer {layer_id}")));
        }
        self.save()
    }

    /// Remove `image_id` from the set of images referencing `layer_id`.
    pub fn remove_image_reference(&mut self, layer_id: &str, image_id: &str) -> Result<()> {
        let layer = self.layers.get_mut(layer_id).ok_or_else(|| GraphError::LayerUnknown(layer_id.to_string()))?;
        if !layer.images.remove(image_id) {
            return Err(GraphError::InvalidArgument(format!("image {image_id} does not reference layer {layer_id}")));
        }
        self.save()
    }

    /// Look up a filesystem by id.
    #[must_use]
    pub fn get_filesystem(&self, id: &str) -> Option<&Filesystem> {
        self.filesystems.get(id)
    }

    /// Find the filesystem currently mounted by `container_id`, if any.
    #[must_use]
    pub fn get_filesystem_by_container_id(&self, container_id: &str) -> Option<&Filesystem> {
        self.filesystems.values().find(|f| f.container_id.as_deref() == Some(container_id))
    }

    /// Look up a layer by id (the compressed-blob digest).
    #[must_use]
    pub fn get_layer(&self, id: &str) -> Option<&Layer> {
        self.layers.get(id)
    }

    /// Look up a layer by its `DiffID`.
    #[must_use]
    pub fn get_layer_by_diff_id(&self, diff_id: &str) -> Option<&Layer> {
        self.layers.values().find(|l| l.diff_id == diff_id)
    }

    /// The layer committed from `fs_id`, if it has one.
    #[must_use]
    pub fn get_child_layer(&self, fs_id: &str) -> Option<&Layer> {
        self.filesystems.get(fs_id).and_then(|f| f.child_layer_id.as_deref()).and_then(|lid| self.layers.get(lid))
    }

    /// All filesystems cloned from `layer_id`.
    #[must_use]
    pub fn get_child_filesystems(&self, layer_id: &str) -> Vec<&Filesystem> {
        self.filesystems.values().filter(|f| f.parent_layer_id.as_deref() == Some(layer_id)).collect()
    }

    /// Best-effort observational metric (§4.2): the sum of the `used`
    /// dataset property across `layer_id` and every layer it stacks on top
    /// of. Unlike [`Layer::size`] (the exact compressed blob size), this
    /// reflects on-disk COW usage, which can differ under snapshotting and
    /// compression.
    pub fn virtual_size(&self, layer_id: &str) -> Result<u64> {
        let mut total = 0u64;
        let mut current = Some(layer_id.to_string());
        while let Some(id) = current {
            let layer = self.layers.get(&id).ok_or_else(|| GraphError::LayerUnknown(id.clone()))?;
            let dataset = self.dataset_name(&layer.filesystem_id);
            if let PropertyValue::Int(used) = self.backend.fs_get(&dataset, "used")? {
                total += used;
            }
            current = self
                .filesystems
                .get(&layer.filesystem_id)
                .and_then(|fs| fs.parent_layer_id.clone());
        }
        Ok(total)
    }

    /// Best-effort observational metric (§4.2): a disk-usage walk of
    /// `fs_id`'s mountpoint, in bytes.
    pub fn disk_size(&self, fs_id: &str) -> Result<u64> {
        let fs = self.filesystems.get(fs_id).ok_or_else(|| GraphError::FilesystemUnknown(fs_id.to_string()))?;
        let path = if fs.is_mounted() {
            self.backend
                .fs_get(&self.dataset_name(fs_id), "mountpoint")
                .ok()
                .and_then(|v| if let PropertyValue::Path(p) = v { Some(p) } else { None })
                .unwrap_or_else(|| self.default_mount_path(fs_id))
        } else {
            self.default_mount_path(fs_id)
        };
        Ok(walk_size(&path))
    }
}

fn walk_size(path: &Path) -> u64 {
    let Ok(metadata) = std::fs::symlink_metadata(path) else {
        return 0;
    };
    if metadata.is_dir() {
        let Ok(entries) = std::fs::read_dir(path) else {
            return 0;
        };
        entries.flatten().map(|entry| walk_size(&entry.path())).sum()
    } else {
        metadata.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocifs_backend::{BackendError, ChangeKind, DiffEntry, PropertyValue};
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    /// Minimal in-memory [`StorageBackend`] double: datasets are directories
    /// on disk under a temp root, snapshots are recorded as a name only (no
    /// copy-on-write semantics needed for these tests).
    #[derive(Debug)]
    struct FakeBackend {
        root: PathBuf,
        snapshots: RefCell<StdHashMap<String, Vec<String>>>,
    }

    impl FakeBackend {
        fn new(root: PathBuf) -> Self {
            Self { root, snapshots: RefCell::new(StdHashMap::new()) }
        }

        fn path_for(&self, dataset: &str) -> PathBuf {
            self.root.join(dataset.replace('/', "_"))
        }
    }

    impl StorageBackend for FakeBackend {
        fn fs_create(&self, name: &str, mountpoint: Option<&Path>, _compression: Option<&str>) -> ocifs_backend::Result<()> {
            let path = self.path_for(name);
            std::fs::create_dir_all(&path).map_err(BackendError::Io)?;
            if let Some(mp) = mountpoint {
                std::fs::create_dir_all(mp).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_clone(&self, name: &str, source_snapshot: &str, mountpoint: Option<&Path>) -> ocifs_backend::Result<()> {
            let (dataset, _tag) = source_snapshot.split_once('@').expect("snapshot name");
            let src = self.path_for(dataset);
            let dst = self.path_for(name);
            copy_dir(&src, &dst).map_err(BackendError::Io)?;
            if let Some(mp) = mountpoint {
                std::fs::create_dir_all(mp).map_err(BackendError::Io)?;
                copy_dir(&src, mp).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_destroy(&self, name: &str, _recursive: bool) -> ocifs_backend::Result<()> {
            let path = self.path_for(name);
            if path.exists() {
                std::fs::remove_dir_all(path).map_err(BackendError::Io)?;
            }
            self.snapshots.borrow_mut().remove(name);
            Ok(())
        }

        fn fs_snapshot(&self, dataset: &str, tag: &str) -> ocifs_backend::Result<()> {
            self.snapshots.borrow_mut().entry(dataset.to_string()).or_default().push(tag.to_string());
            Ok(())
        }

        fn fs_set(&self, _dataset: &str, _prop: &str, _value: &str) -> ocifs_backend::Result<()> {
            Ok(())
        }

        fn fs_get(&self, dataset: &str, prop: &str) -> ocifs_backend::Result<PropertyValue> {
            match prop {
                "used" => {
                    let path = self.path_for(dataset);
                    Ok(PropertyValue::Int(dir_size(&path)))
                }
                _ => Ok(PropertyValue::None),
            }
        }

        fn fs_rename(&self, old: &str, new: &str) -> ocifs_backend::Result<()> {
            let src = self.path_for(old);
            let dst = self.path_for(new);
            if src.exists() {
                std::fs::rename(src, dst).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_diff(&self, final_snapshot: &str, origin_snapshot: Option<&str>) -> ocifs_backend::Result<Box<dyn Iterator<Item = ocifs_backend::Result<DiffEntry>>>> {
            let (dataset, _) = final_snapshot.split_once('@').expect("snapshot name");
            let current = self.path_for(dataset);
            let before = origin_snapshot.map(|s| {
                let (d, _) = s.split_once('@').expect("snapshot name");
                self.path_for(d)
            });

            let mut entries = Vec::new();
            if current.exists() {
                for entry in std::fs::read_dir(&current).map_err(BackendError::Io)? {
                    let entry = entry.map_err(BackendError::Io)?;
                    let name = entry.file_name();
                    let existed_before = before.as_ref().is_some_and(|b| b.join(&name).exists());
                    if !existed_before {
                        entries.push(Ok(DiffEntry { kind: ChangeKind::Added, path: PathBuf::from("/").join(&name), rename_target: None }));
                    }
                }
            }
            Ok(Box::new(entries.into_iter()))
        }
    }

    fn dir_size(path: &Path) -> u64 {
        let Ok(entries) = std::fs::read_dir(path) else {
            return 0;
        };
        entries
            .flatten()
            .map(|entry| {
                let meta = entry.metadata().ok();
                if meta.as_ref().is_some_and(std::fs::Metadata::is_dir) {
                    dir_size(&entry.path())
                } else {
                    meta.map(|m| m.len()).unwrap_or(0)
                }
            })
            .sum()
    }

    fn copy_dir(src: &Path, dst: &Path) -> std::io::Result<()> {
        std::fs::create_dir_all(dst)?;
        if !src.exists() {
            return Ok(());
        }
        for entry in std::fs::read_dir(src)? {
            let entry = entry?;
            let target = dst.join(entry.file_name());
            if entry.file_type()?.is_dir() {
                copy_dir(&entry.path(), &target)?;
            } else {
                std::fs::copy(entry.path(), &target)?;
            }
        }
        Ok(())
    }

    #[test]
    fn create_commit_and_clone_layer() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let mut driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();

        let fs0 = driver.create_filesystem(None).unwrap();
        std::fs::write(driver.default_mount_path(&fs0.id).join("a"), b"hello\n").unwrap();
        let layer0 = driver.create_layer(&fs0.id).unwrap();

        assert_eq!(driver.get_layer(&layer0.id).unwrap().diff_id, layer0.diff_id);
        assert!(driver.get_filesystem(&layer0.diff_id).is_some());

        let fs1 = driver.create_filesystem(Some(&layer0.id)).unwrap();
        assert_eq!(fs1.parent_layer_id.as_deref(), Some(layer0.id.as_str()));
        assert!(driver.default_mount_path(&fs1.id).join("a").exists());
    }

    #[test]
    fn removal_protection_on_referenced_layer() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let mut driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();

        let fs0 = driver.create_filesystem(None).unwrap();
        let layer0 = driver.create_layer(&fs0.id).unwrap();
        driver.add_image_reference(&layer0.id, "img1").unwrap();

        assert!(matches!(driver.remove_layer(&layer0.id), Err(GraphError::LayerInUse(_))));

        driver.remove_image_reference(&layer0.id, "img1").unwrap();
        assert!(driver.remove_layer(&layer0.id).is_ok());
        assert!(driver.get_layer(&layer0.id).is_none());
    }

    #[test]
    fn mount_exclusivity() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let mut driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();

        let fs0 = driver.create_filesystem(None).unwrap();
        let path = root.path().join("containers/c1/rootfs");
        driver.mount_filesystem(&fs0.id, "c1", &path).unwrap();
        assert!(matches!(driver.mount_filesystem(&fs0.id, "c2", &path), Err(GraphError::FilesystemInUse(_))));

        driver.unmount_filesystem("c1", false).unwrap();
        assert!(driver.get_filesystem(&fs0.id).unwrap().container_id.is_none());
    }

    #[test]
    fn virtual_size_sums_used_across_the_layer_chain() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let mut driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();

        let fs0 = driver.create_filesystem(None).unwrap();
        std::fs::write(driver.default_mount_path(&fs0.id).join("a"), b"hello\n").unwrap();
        let layer0 = driver.create_layer(&fs0.id).unwrap();
        let base = driver.virtual_size(&layer0.id).unwrap();
        assert!(base > 0);

        let fs1 = driver.create_filesystem(Some(&layer0.id)).unwrap();
        std::fs::write(driver.default_mount_path(&fs1.id).join("b"), b"world\n").unwrap();
        let layer1 = driver.create_layer(&fs1.id).unwrap();

        let stacked = driver.virtual_size(&layer1.id).unwrap();
        assert!(stacked > base);
    }

    #[test]
    fn virtual_size_rejects_unknown_layer() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();
        assert!(matches!(driver.virtual_size("nope"), Err(GraphError::LayerUnknown(_))));
    }

    #[test]
    fn disk_size_reflects_mountpoint_contents() {
        let root = tempfile::tempdir().unwrap();
        let backend = FakeBackend::new(root.path().join("zpool"));
        let mut driver = GraphDriver::open(root.path(), "zfs", "tank/oci", "lz4", backend).unwrap();

        let fs0 = driver.create_filesystem(None).unwrap();
        assert_eq!(driver.disk_size(&fs0.id).unwrap(), 0);

        std::fs::write(driver.default_mount_path(&fs0.id).join("a"), b"hello\n").unwrap();
        assert_eq!(driver.disk_size(&fs0.id).unwrap(), 6);
    }
}
