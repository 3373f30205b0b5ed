//! The runtime component: a persistent registry of [`Container`]s, backed
//! by the graph driver for their writable filesystem and by an external
//! `runc`-compatible binary for process lifecycle.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use chrono::Utc;
use ocifs_backend::StorageBackend;
use ocifs_distribution::Image;
use ocifs_graph::GraphDriver;

use crate::bundle::{self, HostKind, ProcessOverride};
use crate::error::{Result, RuntimeError};
use crate::model::Container;
use crate::runc::Runc;
use crate::state::{self, State};
use crate::{host, persist};

/// Owns the container registry rooted at one backend root directory.
///
/// `containers_root` holds each container's bundle (`containers/<id>/`);
/// `state_dir` is where the external runtime records live process state
/// (`global.run_path`, §6) — a directory this crate only ever reads from.
#[derive(Debug)]
pub struct Runtime {
    runtime_json: PathBuf,
    containers_root: PathBuf,
    state_dir: PathBuf,
    runc: Runc,
    containers: HashMap<String, Container>,
}

impl Runtime {
    /// Open (or initialize) the container registry rooted at `root`, with
    /// `state_dir` (`global.run_path`) as the external runtime's state
    /// directory.
    pub fn open(root: &Path, state_dir: &Path, runc: Runc) -> Result<Self> {
        let runtime_json = root.join("runtime.json");
        let containers_root = root.join("containers");
        let ids = persist::load_index(&runtime_json)?;

        let mut containers = HashMap::new();
        for id in ids {
            let record = persist::load_container_record(&containers_root.join(&id))?;
            containers.insert(id, record.into());
        }

        Ok(Self { runtime_json, containers_root, state_dir: state_dir.to_path_buf(), runc, containers })
    }

    fn save(&self) -> Result<()> {
        let mut values: Vec<_> = self.containers.values().cloned().collect();
        values.sort_by(|a, b| a.create_time.cmp(&b.create_time));
        persist::save_index(&self.runtime_json, &values)
    }

    fn bundle_dir(&self, container_id: &str) -> PathBuf {
        bundle::bundle_path(&self.containers_root, container_id)
    }

    /// Provision a new container from `image`: validate os/arch
    /// compatibility, clone a writable filesystem from the image's top
    /// layer, write the bundle, and invoke `runc create`.
    pub fn create_container<B: StorageBackend>(
        &mut self,
        graph: &mut GraphDriver<B>,
        image: &Image,
        name: Option<String>,
        command: Option<Vec<String>>,
        workdir: Option<String>,
    ) -> Result<Container> {
        let (host_arch, host_os) = host::detect();
        if image.config.architecture() != &host_arch || image.config.os() != &host_os {
            return Err(RuntimeError::IncompatibleImage(format!(
                "image is {:?}/{:?}, host is {host_os:?}/{host_arch:?}",
                image.config.os(),
                image.config.architecture(),
            )));
        }

        let top_layer = image.top_layer().ok_or_else(|| RuntimeError::IncompatibleImage("image has no layers".to_string()))?;

        let name = match name {
            Some(n) if self.containers.values().any(|c| c.name == n) => {
                return Err(RuntimeError::Unsupported(format!("container name already in use: {n}")));
            }
            Some(n) => n,
            None => self.generate_name(),
        };

        let id = self.fresh_container_id()?;
        let runc_id = ocifs_graph::short_id(&id).to_string();

        let fs = graph.create_filesystem(Some(&top_layer.id))?;

        let host = HostKind::detect();
        let bundle_dir = self.bundle_dir(&id);
        let rootfs_path = bundle_dir.join(host.rootfs_relative_path());

        graph.mount_filesystem(&fs.id, &id, &rootfs_path)?;

        let overrides = ProcessOverride { command, working_dir: workdir };
        let config = bundle::build_config(image, &overrides, &runc_id, host);

        persist::save_bundle_config(&bundle_dir, &config)?;

        let container = Container { id: id.clone(), name, create_time: Utc::now(), image_id: image.id.clone(), filesystem_id: fs.id };
        persist::save_container_record(&bundle_dir, &container)?;

        if let Err(err) = self.runc.create(&runc_id, &bundle_dir) {
            // roll back the filesystem so a failed create doesn't leak a
            // mounted, orphaned clone.
            let _ = graph.unmount_filesystem(&id, true);
            return Err(err);
        }

        tracing::debug!(container = %id, image = %image.id, "created container");
        self.containers.insert(id.clone(), container.clone());
        self.save()?;
        Ok(container)
    }

    /// Generate a random container id whose short id collides with neither
    /// a registered container nor a state file the external runtime is
    /// still tracking.
    fn fresh_container_id(&self) -> Result<String> {
        for _ in 0..64 {
            let id = ocifs_graph::random_id();
            let runc_id = ocifs_graph::short_id(&id);
            let in_use = self.containers.contains_key(&id)
                || self.state_dir.join(format!("{runc_id}.state")).exists();
            if !in_use {
                return Ok(id);
            }
        }
        Err(RuntimeError::Unsupported("could not allocate a free container id".to_string()))
    }

    fn generate_name(&self) -> String {
        loop {
            let candidate = format!("ocifs-{}", ocifs_graph::short_id(&ocifs_graph::random_id()));
            if !self.containers.values().any(|c| c.name == candidate) {
                return candidate;
            }
        }
    }

    fn resolve_reference(&self, reference: &str) -> Result<String> {
        if self.containers.contains_key(reference) {
            return Ok(reference.to_string());
        }
        if let Some(id) = self.containers.keys().find(|id| ocifs_graph::short_id(id) == reference) {
            return Ok(id.clone());
        }
        if let Some((id, _)) = self.containers.iter().find(|(_, c)| c.name == reference) {
            return Ok(id.clone());
        }
        Err(RuntimeError::ContainerUnknown(reference.to_string()))
    }

    /// Query the current OCI runtime state of a container.
    pub fn status(&self, reference: &str) -> Result<State> {
        let id = self.resolve_reference(reference)?;
        let container = &self.containers[&id];
        state::query(&self.state_dir, container.runc_id(), &self.bundle_dir(&id))
    }

    /// `runc start` a container whose state is `created` or `stopped`; a
    /// container already running surfaces the external runtime's own
    /// rejection.
    pub fn start(&mut self, reference: &str) -> Result<()> {
        let id = self.resolve_reference(reference)?;
        let runc_id = self.containers[&id].runc_id().to_string();
        let state = self.status(&id)?;
        if state.is_startable() {
            self.runc.start(&runc_id)?;
        }
        Ok(())
    }

    /// Tear down a container: force-delete it from the external runtime
    /// unless it has already exited, unmount (and optionally destroy) its
    /// filesystem, and remove its bundle directory and registry entry.
    pub fn remove_container<B: StorageBackend>(&mut self, graph: &mut GraphDriver<B>, reference: &str, remove_fs: bool) -> Result<()> {
        let id = self.resolve_reference(reference)?;
        let container = self.containers[&id].clone();
        let runc_id = container.runc_id().to_string();

        let state = self.status(&id)?;
        if !state.is_exited() {
            // best-effort: the external runtime's own delete may fail (the
            // process already reaped, a stale state file) without blocking
            // registry cleanup.
            if let Err(err) = self.runc.delete(&runc_id, true) {
                tracing::warn!(container = %id, error = %err, "runc delete failed, continuing with registry cleanup");
            }
        }

        graph.unmount_filesystem(&id, remove_fs)?;

        let bundle_dir = self.bundle_dir(&id);
        if bundle_dir.exists() {
            std::fs::remove_dir_all(&bundle_dir)?;
        }

        self.containers.remove(&id);
        tracing::debug!(container = %id, "removed container");
        self.save()
    }

    /// Look up a container by id, short id, or name.
    pub fn get_container(&self, reference: &str) -> Result<&Container> {
        let id = self.resolve_reference(reference)?;
        Ok(&self.containers[&id])
    }

    /// List every registered container.
    pub fn list_containers(&self) -> impl Iterator<Item = &Container> {
        self.containers.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocifs_backend::{BackendError, DiffEntry, PropertyValue};
    use oci_spec::image::{Arch, DescriptorBuilder, ImageConfigurationBuilder, ImageManifestBuilder, MediaType, Os, RootFsBuilder};
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;

    /// Same minimal in-memory backend double used in `ocifs-graph`'s own
    /// tests: datasets are plain directories, snapshots are names only.
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
            std::fs::create_dir_all(self.path_for(name)).map_err(BackendError::Io)?;
            if let Some(mp) = mountpoint {
                std::fs::create_dir_all(mp).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_clone(&self, name: &str, source_snapshot: &str, mountpoint: Option<&Path>) -> ocifs_backend::Result<()> {
            let (dataset, _tag) = source_snapshot.split_once('@').expect("snapshot name");
            let src = self.path_for(dataset);
            std::fs::create_dir_all(self.path_for(name)).map_err(BackendError::Io)?;
            if let Some(mp) = mountpoint {
                std::fs::create_dir_all(mp).map_err(BackendError::Io)?;
                if src.exists() {
                    for entry in std::fs::read_dir(&src).map_err(BackendError::Io)? {
                        let entry = entry.map_err(BackendError::Io)?;
                        std::fs::copy(entry.path(), mp.join(entry.file_name())).map_err(BackendError::Io)?;
                    }
                }
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

        fn fs_get(&self, _dataset: &str, _prop: &str) -> ocifs_backend::Result<PropertyValue> {
            Ok(PropertyValue::None)
        }

        fn fs_rename(&self, old: &str, new: &str) -> ocifs_backend::Result<()> {
            let src = self.path_for(old);
            let dst = self.path_for(new);
            if src.exists() {
                std::fs::rename(src, dst).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_diff(&self, _final_snapshot: &str, _origin_snapshot: Option<&str>) -> ocifs_backend::Result<Box<dyn Iterator<Item = ocifs_backend::Result<DiffEntry>>>> {
            let entries: Vec<ocifs_backend::Result<DiffEntry>> = Vec::new();
            Ok(Box::new(entries.into_iter()))
        }
    }

    fn fake_image(arch: Arch, os: Os) -> Image {
        let rootfs = RootFsBuilder::default().typ("layers".to_string()).diff_ids(vec!["sha256:deadbeef".to_string()]).build().unwrap();
        let config = ImageConfigurationBuilder::default()
            .created("2024-01-01T00:00:00Z")
            .architecture(arch)
            .os(os)
            .rootfs(rootfs)
            .history(Vec::new())
            .build()
            .unwrap();

        let manifest = ImageManifestBuilder::default()
            .schema_version(2u32)
            .config(DescriptorBuilder::default().media_type(MediaType::ImageConfig).digest("sha256:aaaa".to_string()).size(2i64).build().unwrap())
            .layers(Vec::<oci_spec::image::Descriptor>::new())
            .build()
            .unwrap();

        Image { id: "img".to_string(), manifest, config, layers: Vec::new(), tags: Vec::new() }
    }

    fn host_compatible_image() -> Image {
        let (arch, os) = host::detect();
        fake_image(arch, os)
    }

    fn make_driver(root: &Path) -> GraphDriver<FakeBackend> {
        let backend = FakeBackend::new(root.join("zpool"));
        GraphDriver::open(root, "zfs", "tank/oci", "lz4", backend).unwrap()
    }

    #[test]
    fn rejects_incompatible_image_without_mutating_the_graph() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut runtime = Runtime::open(root.path(), &root.path().join("run"), Runc::with_binary("/nonexistent/runc")).unwrap();

        // Pick the architecture the host detector never returns (see
        // `host::detect_arch`'s default-to-`Amd64` fallback) paired with a
        // real but mismatched os, so compatibility is rejected regardless
        // of which host actually runs this test.
        let (host_arch, _) = host::detect();
        let mismatched_arch = if host_arch == Arch::Amd64 { Arch::ARM64 } else { Arch::Amd64 };
        let mismatched = fake_image(mismatched_arch, Os::Solaris);
        let result = runtime.create_container(&mut graph, &mismatched, Some("c1".to_string()), None, None);
        assert!(matches!(result, Err(RuntimeError::IncompatibleImage(_))));
        assert!(runtime.containers.is_empty());
    }

    #[test]
    fn rejects_duplicate_container_name() {
        let root = tempfile::tempdir().unwrap();
        let mut runtime = Runtime::open(root.path(), &root.path().join("run"), Runc::new()).unwrap();
        runtime.containers.insert(
            "a".repeat(64),
            Container { id: "a".repeat(64), name: "taken".to_string(), create_time: Utc::now(), image_id: "img".into(), filesystem_id: "fs".into() },
        );

        let image = host_compatible_image();
        let mut graph = make_driver(root.path());
        let result = runtime.create_container(&mut graph, &image, Some("taken".to_string()), None, None);
        assert!(matches!(result, Err(RuntimeError::Unsupported(_))));
    }

    #[test]
    fn resolve_by_id_short_id_and_name() {
        let root = tempfile::tempdir().unwrap();
        let mut runtime = Runtime::open(root.path(), &root.path().join("run"), Runc::new()).unwrap();
        let id = "b".repeat(64);
        runtime.containers.insert(
            id.clone(),
            Container { id: id.clone(), name: "web".to_string(), create_time: Utc::now(), image_id: "img".into(), filesystem_id: "fs".into() },
        );

        assert_eq!(runtime.resolve_reference(&id).unwrap(), id);
        assert_eq!(runtime.resolve_reference(ocifs_graph::short_id(&id)).unwrap(), id);
        assert_eq!(runtime.resolve_reference("web").unwrap(), id);
        assert!(runtime.resolve_reference("nope").is_err());
    }
}
