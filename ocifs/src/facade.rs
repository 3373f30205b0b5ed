//! Wires the four components together behind one handle, rooted at a
//! single [`Config`].

use std::path::Path;

use ocifs_backend::StorageBackend;
use ocifs_distribution::Distribution;
use ocifs_graph::GraphDriver;
use ocifs_runtime::{Runc, Runtime};

use crate::config::Config;
use crate::Result;

/// A single handle onto the graph driver, image distribution, and container
/// runtime, all rooted at `config.global.path`.
///
/// `B` is the storage backend implementation; callers pick it the same way
/// they pick [`ocifs_graph::GraphDriver`]'s backend — normally
/// [`ocifs_backend::ZfsBackend`] in production, a fake in tests.
#[derive(Debug)]
pub struct Ocifs<B: StorageBackend> {
    /// Filesystem/layer graph.
    pub graph: GraphDriver<B>,
    /// Image registry.
    pub distribution: Distribution,
    /// Container registry.
    pub runtime: Runtime,
}

impl<B: StorageBackend> Ocifs<B> {
    /// Open every component rooted at `config.global.path`, using `backend`
    /// for the graph driver and the `runc`-compatible binary on `$PATH` for
    /// the runtime.
    pub fn open(config: &Config, backend: B) -> Result<Self> {
        Self::open_with_runc(config, backend, Runc::new())
    }

    /// Same as [`Self::open`], but with an explicit external runtime
    /// binary — useful for tests or nonstandard `runc` installs.
    pub fn open_with_runc(config: &Config, backend: B, runc: Runc) -> Result<Self> {
        let root = config.global.path.as_path();
        Self::ensure_root(root)?;

        let graph = GraphDriver::open(root, config.graph.driver.as_str(), config.graph.zfs.filesystem.as_str(), config.graph.zfs.compression.as_str(), backend)?;
        let distribution = Distribution::open(root)?;
        let runtime = Runtime::open(root, config.global.run_path.as_path(), runc)?;

        Ok(Self { graph, distribution, runtime })
    }

    fn ensure_root(root: &Path) -> Result<()> {
        std::fs::create_dir_all(root)?;
        Ok(())
    }
}
