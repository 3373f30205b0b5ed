//! Error types for the graph driver.

/// Errors returned by graph driver operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    /// No filesystem with the given id is registered.
    #[error("filesystem unknown: {0}")]
    FilesystemUnknown(String),

    /// A filesystem cannot be removed because it is mounted or has a child
    /// layer.
    #[error("filesystem in use: {0}")]
    FilesystemInUse(String),

    /// No layer with the given id (or diff id) is registered.
    #[error("layer unknown: {0}")]
    LayerUnknown(String),

    /// A layer cannot be removed because it is still referenced by an image
    /// or a child filesystem.
    #[error("layer in use: {0}")]
    LayerInUse(String),

    /// The persisted `driver.json` names a backend type that does not match
    /// the backend this driver was constructed with.
    #[error("unsupported driver type: {0}")]
    UnsupportedDriver(String),

    /// An argument was structurally invalid (e.g. a changeset entry
    /// referencing a path outside the filesystem root).
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The underlying storage backend reported an error.
    #[error(transparent)]
    Backend(#[from] ocifs_backend::BackendError),

    /// An I/O error occurred while persisting or reading graph state.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `driver.json` could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, GraphError>`.
pub type Result<T> = std::result::Result<T, GraphError>;
