//! Image entity and the caller-supplied skeleton used to build one.

use oci_spec::image::{ImageConfiguration, ImageManifest};
use ocifs_graph::Layer;

/// The minimal, runtime-independent description of what an image should
/// run, from which [`crate::Distribution::create_image`] builds the full
/// OCI config and history.
#[derive(Debug, Clone, Default)]
pub struct ImageConfigSkeleton {
    /// Target architecture, e.g. `"amd64"`.
    pub architecture: String,
    /// Target OS, e.g. `"linux"`.
    pub os: String,
    /// Default entrypoint, if any. Recorded in the image config for
    /// inspection; container process args are derived from `cmd` alone
    /// (§4.4), not from `entrypoint` + `cmd`.
    pub entrypoint: Option<Vec<String>>,
    /// Default command, used verbatim as a container's process args when it
    /// starts without an explicit command override.
    pub cmd: Option<Vec<String>>,
    /// Environment variables, `KEY=value`.
    pub env: Vec<String>,
    /// Default working directory.
    pub working_dir: Option<String>,
    /// Default user (`uid[:gid]` or name).
    pub user: Option<String>,
    /// Declared exposed ports, e.g. `"80/tcp"`.
    pub exposed_ports: Vec<String>,
    /// Free-form labels.
    pub labels: std::collections::BTreeMap<String, String>,
}

/// A fully assembled, content-addressed image: manifest, config, and the
/// ordered layers it stacks.
#[derive(Debug, Clone)]
pub struct Image {
    /// SHA-256 of the serialized manifest.
    pub id: String,
    /// The OCI image manifest.
    pub manifest: ImageManifest,
    /// The OCI image configuration.
    pub config: ImageConfiguration,
    /// Layers in bottom-to-top order, resolved from the graph driver.
    pub layers: Vec<Layer>,
    /// Tags currently pointing at this image, e.g. `"alpine:latest"`.
    pub tags: Vec<String>,
}

impl Image {
    /// The top (most recently committed) layer — the one a new container's
    /// filesystem is cloned from.
    #[must_use]
    pub fn top_layer(&self) -> Option<&Layer> {
        self.layers.last()
    }
}
