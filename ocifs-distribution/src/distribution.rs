//! The distribution component: a content-addressed image registry.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use oci_spec::image::{
    Arch, ConfigBuilder, DescriptorBuilder, HistoryBuilder, ImageConfiguration, ImageConfigurationBuilder, ImageManifest, ImageManifestBuilder,
    MediaType, Os, RootFsBuilder,
};
use ocifs_backend::StorageBackend;
use ocifs_graph::{Descriptor as GraphDescriptor, GraphDriver, Layer};

use crate::error::{DistributionError, Result};
use crate::model::{Image, ImageConfigSkeleton};
use crate::persist::{self, ImageRecord};

/// Owns the manifest/config blob store and the tag index. Layer lifetime
/// (reference counting, storage) is delegated to the [`GraphDriver`] passed
/// into each mutating call.
#[derive(Debug)]
pub struct Distribution {
    manifests_dir: PathBuf,
    configs_dir: PathBuf,
    distribution_json: PathBuf,
    /// image id -> tags
    images: HashMap<String, Vec<String>>,
}

impl Distribution {
    /// Open (or initialize) the image registry rooted at `root`.
    pub fn open(root: &Path) -> Result<Self> {
        let distribution_json = root.join("distribution.json");
        let records = persist::load(&distribution_json)?;
        let images = records.into_iter().map(|r| (r.id, r.tags)).collect();
        Ok(Self { manifests_dir: root.join("manifests"), configs_dir: root.join("configs"), distribution_json, images })
    }

    fn save(&self) -> Result<()> {
        let records: Vec<ImageRecord> = self.images.iter().map(|(id, tags)| ImageRecord { id: id.clone(), tags: tags.clone() }).collect();
        persist::save(&self.distribution_json, records)
    }

    /// Build and register a new image from a config skeleton and the
    /// (already committed) layers that make it up, bottom-first.
    ///
    /// Registers an image reference on each layer via `graph`, so the
    /// layers cannot be removed out from under a live image.
    pub fn create_image<B: StorageBackend>(&mut self, graph: &mut GraphDriver<B>, skeleton: ImageConfigSkeleton, layers: &[Layer]) -> Result<Image> {
        if layers.is_empty() {
            return Err(DistributionError::InvalidArgument("image must have at least one layer".to_string()));
        }

        let created = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true);

        let diff_ids: Vec<String> = layers.iter().map(|l| format!("sha256:{}", l.diff_id)).collect();
        let rootfs = RootFsBuilder::default().typ("layers".to_string()).diff_ids(diff_ids).build()?;

        let mut history: Vec<_> = layers
            .iter()
            .map(|l| {
                HistoryBuilder::default()
                    .created(created.clone())
                    .created_by(format!("/bin/sh -c #(nop) ADD file:{} in / ", l.diff_id))
                    .build()
                    .expect("created and created_by are always set above")
            })
            .collect();
        if let Some(cmd) = &skeleton.cmd {
            history.push(
                HistoryBuilder::default()
                    .created(created.clone())
                    .created_by(format!("/bin/sh -c #(nop)  CMD {cmd:?}"))
                    .empty_layer(true)
                    .build()
                    .expect("created and created_by are always set above"),
            );
        }

        let mut config_builder = ConfigBuilder::default();
        if let Some(entrypoint) = skeleton.entrypoint.clone() {
            config_builder.entrypoint(entrypoint);
        }
        if let Some(cmd) = skeleton.cmd.clone() {
            config_builder.cmd(cmd);
        }
        if !skeleton.env.is_empty() {
            config_builder.env(skeleton.env.clone());
        }
        if let Some(working_dir) = skeleton.working_dir.clone() {
            config_builder.working_dir(working_dir);
        }
        if let Some(user) = skeleton.user.clone() {
            config_builder.user(user);
        }
        if !skeleton.exposed_ports.is_empty() {
            config_builder.exposed_ports(skeleton.exposed_ports.clone());
        }
        if !skeleton.labels.is_empty() {
            config_builder.labels(skeleton.labels.clone());
        }
        let inner_config = config_builder.build()?;

        let config: ImageConfiguration = ImageConfigurationBuilder::default()
            .created(created)
            .architecture(parse_arch(&skeleton.architecture))
            .os(parse_os(&skeleton.os))
            .config(inner_config)
            .rootfs(rootfs)
            .history(history)
            .build()?;

        let config_bytes = serde_json::to_vec(&config)?;
        let config_id = ocifs_backend::sha256_hex(&config_bytes);
        persist::write_blob(&self.configs_dir, &config_id, &config_bytes)?;
        let config_descriptor = DescriptorBuilder::default()
            .media_type(MediaType::ImageConfig)
            .digest(format!("sha256:{config_id}"))
            .size(i64::try_from(config_bytes.len()).unwrap_or(i64::MAX))
            .build()?;

        let manifest_layers: Vec<_> = layers.iter().map(|l| to_oci_descriptor(&l.descriptor)).collect::<Result<_>>()?;
        let manifest: ImageManifest =
            ImageManifestBuilder::default().schema_version(2u32).config(config_descriptor).layers(manifest_layers).build()?;

        let manifest_bytes = serde_json::to_vec(&manifest)?;
        let image_id = ocifs_backend::sha256_hex(&manifest_bytes);
        if self.images.contains_key(&image_id) {
            return Err(DistributionError::ImageExists(image_id));
        }
        persist::write_blob(&self.manifests_dir, &image_id, &manifest_bytes)?;

        for layer in layers {
            graph.add_image_reference(&layer.id, &image_id)?;
        }

        self.images.insert(image_id.clone(), Vec::new());
        self.save()?;

        tracing::debug!(image = %image_id, layers = layers.len(), "created image");
        Ok(Image { id: image_id, manifest, config, layers: layers.to_vec(), tags: Vec::new() })
    }

    /// Resolve `reference` (exact id, short id, or `name:tag`) and load the
    /// full image, including its layers from `graph`.
    pub fn get_image<B: StorageBackend>(&self, graph: &GraphDriver<B>, reference: &str) -> Result<Image> {
        let id = self.resolve_reference(reference)?;
        self.load_image(graph, &id)
    }

    fn resolve_reference(&self, reference: &str) -> Result<String> {
        if self.images.contains_key(reference) {
            return Ok(reference.to_string());
        }
        if let Some(id) = self.images.keys().find(|id| ocifs_graph::short_id(id) == reference) {
            return Ok(id.clone());
        }
        let normalized = normalize_tag(reference)?;
        if let Some((id, _)) = self.images.iter().find(|(_, tags)| tags.iter().any(|t| *t == normalized)) {
            return Ok(id.clone());
        }
        Err(DistributionError::ImageUnknown(reference.to_string()))
    }

    fn load_image<B: StorageBackend>(&self, graph: &GraphDriver<B>, id: &str) -> Result<Image> {
        let tags = self.images.get(id).ok_or_else(|| DistributionError::ImageUnknown(id.to_string()))?.clone();

        let manifest_bytes = persist::read_blob(&self.manifests_dir, id)?;
        let manifest: ImageManifest = serde_json::from_slice(&manifest_bytes)?;

        let config_id = strip_sha256_prefix(manifest.config().digest());
        let config_bytes = persist::read_blob(&self.configs_dir, config_id)?;
        let config: ImageConfiguration = serde_json::from_slice(&config_bytes)?;

        let mut layers = Vec::with_capacity(manifest.layers().len());
        for descriptor in manifest.layers() {
            let layer_id = strip_sha256_prefix(descriptor.digest());
            let layer = graph
                .get_layer(layer_id)
                .ok_or_else(|| DistributionError::InvalidArgument(format!("layer {layer_id} missing from graph")))?;
            layers.push(layer.clone());
        }

        Ok(Image { id: id.to_string(), manifest, config, layers, tags })
    }

    /// Remove an image: releases its image-reference on every layer
    /// (attempting, and swallowing, removal of now-unreferenced layers),
    /// then deletes its manifest/config blobs and tag entries.
    ///
    /// Fails with [`DistributionError::ImageInUse`] (unless `force`) if any
    /// filesystem cloned from the image's top layer is currently mounted by
    /// a container — a container's filesystem always has the image's top
    /// layer as its parent, so this check needs no visibility into the
    /// runtime component itself, only the graph both share.
    pub fn remove_image<B: StorageBackend>(&mut self, graph: &mut GraphDriver<B>, reference: &str, force: bool) -> Result<()> {
        let id = self.resolve_reference(reference)?;
        let image = self.load_image(graph, &id)?;

        if !force {
            if let Some(top_layer) = image.top_layer() {
                if graph.get_child_filesystems(&top_layer.id).iter().any(|fs| fs.is_mounted()) {
                    return Err(DistributionError::ImageInUse(id));
                }
            }
        }

        for layer in image.layers.iter().rev() {
            graph.remove_image_reference(&layer.id, &id)?;
            match graph.remove_layer(&layer.id) {
                Ok(()) => {}
                Err(ocifs_graph::GraphError::LayerInUse(_)) => {}
                Err(other) => return Err(other.into()),
            }
        }

        persist::remove_blob(&self.manifests_dir, &id)?;
        let config_id = strip_sha256_prefix(image.manifest.config().digest()).to_string();
        persist::remove_blob(&self.configs_dir, &config_id)?;

        self.images.remove(&id);
        tracing::debug!(image = %id, "removed image");
        self.save()
    }

    /// Point `tag` at `reference`, stealing it from whichever image
    /// currently holds it.
    pub fn add_tag(&mut self, reference: &str, tag: &str) -> Result<()> {
        let id = self.resolve_reference(reference)?;
        let normalized = normalize_tag(tag)?;
        for tags in self.images.values_mut() {
            tags.retain(|t| *t != normalized);
        }
        self.images.get_mut(&id).expect("resolved above").push(normalized);
        self.save()
    }

    /// Remove `tag` from whichever image holds it.
    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        let normalized = normalize_tag(tag)?;
        for tags in self.images.values_mut() {
            if let Some(pos) = tags.iter().position(|t| *t == normalized) {
                tags.remove(pos);
                return self.save();
            }
        }
        Err(DistributionError::InvalidArgument(format!("tag not found: {normalized}")))
    }

    /// List every registered image id and its tags.
    pub fn list_images(&self) -> impl Iterator<Item = (&String, &Vec<String>)> {
        self.images.iter()
    }
}

fn normalize_tag(reference: &str) -> Result<String> {
    let parts: Vec<&str> = reference.split(':').collect();
    match parts.as_slice() {
        [_] => Ok(format!("{reference}:latest")),
        [_, _] => Ok(reference.to_string()),
        _ => Err(DistributionError::InvalidArgument(format!("invalid image reference: {reference}"))),
    }
}

fn strip_sha256_prefix(digest: &str) -> &str {
    digest.strip_prefix("sha256:").unwrap_or(digest)
}

fn to_oci_descriptor(descriptor: &GraphDescriptor) -> Result<oci_spec::image::Descriptor> {
    Ok(DescriptorBuilder::default()
        .media_type(media_type_from_str(&descriptor.media_type))
        .digest(descriptor.digest.clone())
        .size(i64::try_from(descriptor.size).unwrap_or(i64::MAX))
        .build()?)
}

fn media_type_from_str(s: &str) -> MediaType {
    match s {
        ocifs_graph::LAYER_MEDIA_TYPE => MediaType::ImageLayerGzip,
        "application/vnd.oci.image.config.v1+json" => MediaType::ImageConfig,
        other => MediaType::Other(other.to_string()),
    }
}

fn parse_arch(s: &str) -> Arch {
    match s {
        "arm64" => Arch::ARM64,
        _ => Arch::Amd64,
    }
}

fn parse_os(_s: &str) -> Os {
    // Every backend this crate targets (ZFS datasets, `runc` bundles) runs
    // Linux containers; the skeleton field is kept for forward-compat with
    // a second OS, not because one exists today.
    Os::Linux
}

#[cfg(test)]
mod tests {
    use super::*;
    use ocifs_backend::{BackendError, ChangeKind, DiffEntry, PropertyValue};
    use std::cell::RefCell;
    use std::collections::HashMap as StdHashMap;
    use std::path::PathBuf;

    #[test]
    fn tag_normalization() {
        assert_eq!(normalize_tag("alpine").unwrap(), "alpine:latest");
        assert_eq!(normalize_tag("alpine:3.19").unwrap(), "alpine:3.19");
        assert!(normalize_tag("a:b:c").is_err());
    }

    /// Same minimal in-memory backend double used by `ocifs-graph`'s and
    /// `ocifs-runtime`'s own tests.
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
        fn fs_create(&self, name: &str, mountpoint: Option<&std::path::Path>, _compression: Option<&str>) -> ocifs_backend::Result<()> {
            std::fs::create_dir_all(self.path_for(name)).map_err(BackendError::Io)?;
            if let Some(mp) = mountpoint {
                std::fs::create_dir_all(mp).map_err(BackendError::Io)?;
            }
            Ok(())
        }

        fn fs_clone(&self, name: &str, source_snapshot: &str, mountpoint: Option<&std::path::Path>) -> ocifs_backend::Result<()> {
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

        fn fs_diff(
            &self,
            final_snapshot: &str,
            origin_snapshot: Option<&str>,
        ) -> ocifs_backend::Result<Box<dyn Iterator<Item = ocifs_backend::Result<DiffEntry>>>> {
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
                        entries.push(Ok(DiffEntry { kind: ChangeKind::Added, path: std::path::PathBuf::from("/").join(&name), rename_target: None }));
                    }
                }
            }
            Ok(Box::new(entries.into_iter()))
        }
    }

    fn make_driver(root: &std::path::Path) -> GraphDriver<FakeBackend> {
        let backend = FakeBackend::new(root.join("zpool"));
        GraphDriver::open(root, "zfs", "tank/oci", "lz4", backend).unwrap()
    }

    fn skeleton() -> ImageConfigSkeleton {
        ImageConfigSkeleton { architecture: "amd64".to_string(), os: "linux".to_string(), cmd: Some(vec!["/bin/sh".to_string()]), ..Default::default() }
    }

    #[test]
    fn create_image_registers_layer_references() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut distribution = Distribution::open(root.path()).unwrap();

        let fs0 = graph.create_filesystem(None).unwrap();
        let layer0 = graph.create_layer(&fs0.id).unwrap();

        let image = distribution.create_image(&mut graph, skeleton(), &[layer0.clone()]).unwrap();
        assert_eq!(image.layers.len(), 1);
        assert!(graph.get_layer(&layer0.id).unwrap().images.contains(&image.id));

        let reloaded = distribution.get_image(&graph, &image.id).unwrap();
        assert_eq!(reloaded.id, image.id);
    }

    #[test]
    fn create_image_rejects_empty_layer_list() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut distribution = Distribution::open(root.path()).unwrap();
        let result = distribution.create_image(&mut graph, skeleton(), &[]);
        assert!(matches!(result, Err(DistributionError::InvalidArgument(_))));
    }

    #[test]
    fn remove_image_fails_while_a_container_filesystem_clones_its_top_layer() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut distribution = Distribution::open(root.path()).unwrap();

        let fs0 = graph.create_filesystem(None).unwrap();
        let layer0 = graph.create_layer(&fs0.id).unwrap();
        let image = distribution.create_image(&mut graph, skeleton(), &[layer0.clone()]).unwrap();

        let container_fs = graph.create_filesystem(Some(&layer0.id)).unwrap();
        let mount_path = root.path().join("containers/c1/rootfs");
        graph.mount_filesystem(&container_fs.id, "c1", &mount_path).unwrap();

        assert!(matches!(distribution.remove_image(&mut graph, &image.id, false), Err(DistributionError::ImageInUse(_))));

        // drop the child filesystem entirely, not just unmount it, so the
        // layer has no remaining parent reference either
        graph.unmount_filesystem("c1", true).unwrap();
        assert!(distribution.remove_image(&mut graph, &image.id, false).is_ok());
        assert!(graph.get_layer(&layer0.id).is_none());
    }

    #[test]
    fn remove_image_force_bypasses_the_in_use_check() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut distribution = Distribution::open(root.path()).unwrap();

        let fs0 = graph.create_filesystem(None).unwrap();
        let layer0 = graph.create_layer(&fs0.id).unwrap();
        let image = distribution.create_image(&mut graph, skeleton(), &[layer0.clone()]).unwrap();

        let container_fs = graph.create_filesystem(Some(&layer0.id)).unwrap();
        let mount_path = root.path().join("containers/c1/rootfs");
        graph.mount_filesystem(&container_fs.id, "c1", &mount_path).unwrap();

        assert!(distribution.remove_image(&mut graph, &image.id, true).is_ok());
    }

    #[test]
    fn tag_reassignment_moves_between_images() {
        let root = tempfile::tempdir().unwrap();
        let mut graph = make_driver(root.path());
        let mut distribution = Distribution::open(root.path()).unwrap();

        let fs0 = graph.create_filesystem(None).unwrap();
        let layer0 = graph.create_layer(&fs0.id).unwrap();
        let image1 = distribution.create_image(&mut graph, skeleton(), &[layer0.clone()]).unwrap();

        let fs1 = graph.create_filesystem(None).unwrap();
        std::fs::write(graph.default_mount_path(&fs1.id).join("marker"), b"x").unwrap();
        let layer1 = graph.create_layer(&fs1.id).unwrap();
        let image2 = distribution.create_image(&mut graph, skeleton(), &[layer1]).unwrap();

        distribution.add_tag(&image1.id, "x:latest").unwrap();
        distribution.add_tag(&image2.id, "x:latest").unwrap();

        let resolved = distribution.get_image(&graph, "x:latest").unwrap();
        assert_eq!(resolved.id, image2.id);
        let first = distribution.get_image(&graph, &image1.id).unwrap();
        assert!(!first.tags.contains(&"x:latest".to_string()));
    }
}
