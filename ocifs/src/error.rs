//! Aggregate error type wrapping every component's own error enum.

/// Convenience alias for `std::result::Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the facade, covering every component it wires
/// together plus its own configuration loading.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The storage backend rejected a low-level filesystem operation.
    #[error(transparent)]
    Backend(#[from] ocifs_backend::BackendError),

    /// The graph driver rejected a filesystem or layer operation.
    #[error(transparent)]
    Graph(#[from] ocifs_graph::GraphError),

    /// The distribution component rejected an image operation.
    #[error(transparent)]
    Distribution(#[from] ocifs_distribution::DistributionError),

    /// The runtime component rejected a container operation.
    #[error(transparent)]
    Runtime(#[from] ocifs_runtime::RuntimeError),

    /// The configuration file could not be parsed.
    #[error(transparent)]
    Config(#[from] toml::de::Error),

    /// An I/O error occurred reading configuration or backend state.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
