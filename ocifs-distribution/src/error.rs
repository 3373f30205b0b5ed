//! Error types for the distribution (image registry) component.

/// Errors returned by distribution operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    /// No image matches the given id, short id, or tag.
    #[error("image unknown: {0}")]
    ImageUnknown(String),

    /// An image with this exact manifest digest already exists.
    #[error("image exists: {0}")]
    ImageExists(String),

    /// The image cannot be removed while a container still depends on it.
    #[error("image in use: {0}")]
    ImageInUse(String),

    /// A reference string or image configuration was structurally invalid.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The graph driver rejected a layer operation performed on its behalf.
    #[error(transparent)]
    Graph(#[from] ocifs_graph::GraphError),

    /// Building or serializing an OCI type failed.
    #[error(transparent)]
    Oci(#[from] oci_spec::OciSpecError),

    /// An I/O error occurred while persisting or reading blobs.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `distribution.json` or a manifest/config blob could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, DistributionError>`.
pub type Result<T> = std::result::Result<T, DistributionError>;
