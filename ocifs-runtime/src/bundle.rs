//! OCI runtime-spec bundle construction.
//!
//! `runc` bundles are built as plain JSON rather than through `oci-spec`'s
//! typed runtime-spec builders: the Solaris `anet` stanza this backend
//! needs is not part of the portable runtime spec those types model, and a
//! bundle config is otherwise a write-once, read-never (by us) document —
//! `runc` is the only reader.

use std::path::Path;

use serde_json::{Value, json};

use ocifs_distribution::Image;

/// Host identity used to validate image compatibility and, on Solaris-style
/// hosts, to lay out the rootfs and network stanza accordingly.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostKind {
    /// A conventional Linux host; rootfs lives directly at `<bundle>/rootfs`.
    Linux,
    /// A Solaris-derived host with zone-style `anet` networking; rootfs
    /// lives at `<bundle>/rootfs/root`.
    Solaris,
}

impl HostKind {
    /// Detect the host this process is running on.
    #[must_use]
    pub fn detect() -> Self {
        if cfg!(target_os = "solaris") || cfg!(target_os = "illumos") {
            Self::Solaris
        } else {
            Self::Linux
        }
    }

    /// Path to the rootfs directory inside a bundle, relative to the
    /// bundle root.
    #[must_use]
    pub fn rootfs_relative_path(self) -> &'static str {
        match self {
            Self::Linux => "rootfs",
            Self::Solaris => "rootfs/root",
        }
    }
}

/// What a container should actually run, overriding the image's own
/// defaults where the caller supplied them.
#[derive(Debug, Clone, Default)]
pub struct ProcessOverride {
    /// Command (and arguments) to run instead of the image's `Cmd`/`Entrypoint`.
    pub command: Option<Vec<String>>,
    /// Working directory, overriding the image's `WorkingDir`.
    pub working_dir: Option<String>,
}

/// Build the `config.json` document for a container bundle.
pub fn build_config(image: &Image, overrides: &ProcessOverride, hostname: &str, host: HostKind) -> Value {
    let image_config = image.config.config().clone().unwrap_or_default();

    let args = overrides
        .command
        .clone()
        .or_else(|| image_config.cmd().clone())
        .unwrap_or_else(|| vec!["/bin/sh".to_string()]);
    let cwd = overrides.working_dir.clone().or_else(|| image_config.working_dir().clone()).filter(|d| !d.is_empty()).unwrap_or_else(|| "/".to_string());
    let env = image_config.env().clone().unwrap_or_default();

    let mut spec = json!({
        "ociVersion": "1.0.2",
        "process": {
            "terminal": true,
            "user": { "uid": 0, "gid": 0 },
            "args": args,
            "env": env,
            "cwd": cwd,
        },
        "root": {
            "path": host.rootfs_relative_path(),
            "readonly": false,
        },
        "hostname": hostname,
    });

    if host == HostKind::Solaris {
        spec["solaris"] = json!({
            "anet": [{
                "linkname": "net0",
                "lowerLink": "auto",
                "allowedAddress": "",
                "configureAllowedAddress": true,
                "defrouter": "",
                "linkProtection": "mac-nartag",
                "macAddress": "auto",
            }],
        });
    }

    spec
}

/// Path to the bundle directory for a container, under `containers_root`.
#[must_use]
pub fn bundle_path(containers_root: &Path, container_id: &str) -> std::path::PathBuf {
    containers_root.join(container_id)
}
