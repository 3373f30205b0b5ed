//! Logging initialization for the out-of-process binary that embeds this
//! crate. Library code never installs a subscriber itself; only the binary
//! entry point should call [`init`].

/// Install a `tracing` subscriber that reads its filter from `RUST_LOG`,
/// defaulting to `info` when unset.
pub fn init() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")))
        .init();
}
