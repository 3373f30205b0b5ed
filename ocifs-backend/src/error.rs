//! Error types for the storage backend.

/// Errors returned by storage backend operations.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// An external backend command (e.g. `zfs`) exited with a non-zero status.
    #[error("{op}: command failed ({status}): {stderr}")]
    CommandFailed {
        /// Name of the backend operation that invoked the command.
        op: &'static str,
        /// The process's exit status, formatted for display.
        status: String,
        /// Captured stderr, trimmed.
        stderr: String,
    },

    /// A dataset property had a value this backend does not know how to parse.
    #[error("unparsable property value for {prop}: {value:?}")]
    InvalidProperty {
        /// Property name.
        prop: String,
        /// Raw value returned by the backend.
        value: String,
    },

    /// An unsupported compression method was requested.
    #[error("unsupported compression method: {0}")]
    UnsupportedCompression(String),

    /// An I/O error occurred outside of a child process (reading/writing local files).
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Convenience alias for `std::result::Result<T, BackendError>`.
pub type Result<T> = std::result::Result<T, BackendError>;
