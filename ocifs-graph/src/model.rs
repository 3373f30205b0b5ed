//! In-memory entity shapes for the filesystem/layer graph.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// OCI content descriptor, `{digest, size, mediaType}`.
///
/// Kept local to this crate rather than pulled from `oci-spec` because the
/// graph driver only ever round-trips these three fields through
/// `driver.json`; `ocifs-distribution` is where the full OCI manifest/config
/// machinery (and `oci-spec`) is actually needed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Descriptor {
    /// `sha256:<hex>` digest of the blob.
    pub digest: String,
    /// Size of the blob in bytes.
    pub size: u64,
    /// OCI media type, e.g. `application/vnd.oci.image.layer.v1.tar+gzip`.
    #[serde(rename = "mediaType")]
    pub media_type: String,
}

/// Media type for a gzip-compressed OCI image layer tar.
pub const LAYER_MEDIA_TYPE: &str = "application/vnd.oci.image.layer.v1.tar+gzip";

/// A mutable working tree, or a committed (read-only) snapshot-backed
/// dataset once it owns a [`Layer`].
#[derive(Debug, Clone)]
pub struct Filesystem {
    /// Random 256-bit id while uncommitted; the owning layer's `diff_id`
    /// once committed (see the dataset-naming open question in the design
    /// notes).
    pub id: String,
    /// The layer this filesystem was cloned from, if any.
    pub parent_layer_id: Option<String>,
    /// Id of the layer committed from this filesystem, if any (at most one,
    /// per graph invariant G2).
    pub child_layer_id: Option<String>,
    /// Id of the container currently mounting this filesystem, if any.
    pub container_id: Option<String>,
}

impl Filesystem {
    /// `true` if a container currently has this filesystem mounted.
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.container_id.is_some()
    }
}

/// An immutable layer: a snapshot of a [`Filesystem`] plus the compressed
/// blob derived from its changeset.
#[derive(Debug, Clone)]
pub struct Layer {
    /// SHA-256 of the compressed blob (the OCI content digest, without the
    /// `sha256:` prefix).
    pub id: String,
    /// SHA-256 of the uncompressed changeset tar (the OCI `DiffID`, without
    /// the `sha256:` prefix).
    pub diff_id: String,
    /// Size of the compressed blob in bytes.
    pub size: u64,
    /// OCI descriptor for the compressed blob (`digest` mirrors `id`).
    pub descriptor: Descriptor,
    /// Id of the filesystem whose snapshot backs this layer.
    pub filesystem_id: String,
    /// Image ids that reference this layer.
    pub images: BTreeSet<String>,
}

impl Layer {
    /// `true` if no image references this layer.
    #[must_use]
    pub fn is_unreferenced(&self) -> bool {
        self.images.is_empty()
    }
}
