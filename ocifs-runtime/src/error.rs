//! Error types for the runtime component.

/// Errors returned by runtime operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// No container matches the given id, short id, or name.
    #[error("container unknown: {0}")]
    ContainerUnknown(String),

    /// The container's image does not match the host's os/arch, or the
    /// requested operation (`exec`) is not implemented.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// An image's os/arch does not match this host.
    #[error("incompatible image: {0}")]
    IncompatibleImage(String),

    /// The external runtime (`runc`) exited with a non-zero status.
    #[error("runc {op} failed ({status}): {stderr}")]
    RuncFailed {
        /// The `runc` subcommand invoked (`create`, `start`, `delete`).
        op: &'static str,
        /// The process's exit status, formatted for display.
        status: String,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// The graph driver rejected a filesystem operation performed on its
    /// behalf (mounting/unmounting the container's rootfs).
    #[error(transparent)]
    Graph(#[from] ocifs_graph::GraphError),

    /// The distribution component rejected an image lookup.
    #[error(transparent)]
    Distribution(#[from] ocifs_distribution::DistributionError),

    /// An I/O error occurred while persisting or reading container state.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// `runtime.json` or a container/config blob could not be parsed.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `std::result::Result<T, RuntimeError>`.
pub type Result<T> = std::result::Result<T, RuntimeError>;
