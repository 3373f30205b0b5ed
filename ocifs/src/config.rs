//! On-disk configuration, loaded once at process start and overridable by
//! a small set of environment variables.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Default location of the configuration file, checked by [`Config::load`]
/// when no explicit path is given.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/ocifs/config.toml";

/// Top-level configuration: where the storage backend keeps its state, and
/// which graph driver backs it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Paths shared by every component.
    pub global: GlobalConfig,
    /// Graph driver selection and backend-specific settings.
    pub graph: GraphConfig,
}

/// `[global]` — paths shared across the storage backend, graph driver,
/// distribution, and runtime components.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GlobalConfig {
    /// Root directory for persisted state: `driver.json`, `distribution.json`,
    /// `runtime.json`, layer blobs, and container bundles.
    pub path: PathBuf,
    /// Directory the external OCI runtime records live process state in.
    /// Read-only as far as this crate is concerned.
    pub run_path: PathBuf,
}

impl Default for GlobalConfig {
    fn default() -> Self {
        Self { path: PathBuf::from("/var/lib/oci"), run_path: PathBuf::from("/var/run/oci") }
    }
}

/// `[graph]` — which backend the graph driver is bound to.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphConfig {
    /// Backend name; currently only `"zfs"` is implemented.
    pub driver: String,
    /// `[graph.zfs]` settings, used when `driver = "zfs"`.
    pub zfs: ZfsConfig,
}

impl Default for GraphConfig {
    fn default() -> Self {
        Self { driver: "zfs".to_string(), zfs: ZfsConfig::default() }
    }
}

/// `[graph.zfs]` — the ZFS storage backend's own settings.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ZfsConfig {
    /// Root dataset new filesystems and layers are created under, e.g. `tank/ocifs`.
    pub filesystem: String,
    /// Default `compression` property for new datasets.
    pub compression: String,
}

impl Default for ZfsConfig {
    fn default() -> Self {
        Self { filesystem: "tank/ocifs".to_string(), compression: "lz4".to_string() }
    }
}

impl Config {
    /// Load configuration from `path` if given, else from
    /// [`DEFAULT_CONFIG_PATH`] if that file exists, else compiled-in
    /// defaults — then apply `OCI_PATH`/`OCI_RUN_PATH` environment
    /// overrides on top.
    pub fn load(path: Option<&Path>) -> crate::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_PATH).is_file() => Self::from_file(Path::new(DEFAULT_CONFIG_PATH))?,
            None => Self::default(),
        };

        if let Ok(path) = std::env::var("OCI_PATH") {
            config.global.path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var("OCI_RUN_PATH") {
            config.global.run_path = PathBuf::from(path);
        }

        Ok(config)
    }

    fn from_file(path: &Path) -> crate::Result<Self> {
        let data = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&data)?)
    }
}
