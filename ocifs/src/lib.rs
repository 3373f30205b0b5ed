//! `ocifs`: an OCI-compliant image and container manager whose storage
//! plane is a copy-on-write ZFS graph driver. This crate wires the storage
//! backend, graph driver, distribution, and runtime components together
//! behind one configuration-driven entry point.

mod config;
mod error;
mod facade;
mod logging;

pub use config::{Config, GlobalConfig, GraphConfig, ZfsConfig, DEFAULT_CONFIG_PATH};
pub use error::{Error, Result};
pub use facade::Ocifs;
pub use logging::init as init_logging;

pub use ocifs_backend::{StorageBackend, ZfsBackend};
pub use ocifs_distribution::{Distribution, Image, ImageConfigSkeleton};
pub use ocifs_graph::{Filesystem, GraphDriver, Layer};
pub use ocifs_runtime::{Container, Runc, Runtime, State};
