//! OCI runtime-spec `State` document.
//!
//! `runc` writes this file itself once a container exists; this crate only
//! ever reads it. Once the container has exited and `runc` has cleaned up
//! its own state directory, the file is gone and a synthesized stand-in is
//! returned instead — matching `oci_api.runtime.container.Container.state`
//! in the implementation this crate was distilled from.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// The `State` document, either read verbatim from `runc`'s state file or
/// synthesized for a container `runc` no longer tracks.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct State {
    /// OCI runtime spec version, when read from `runc`'s own state file.
    #[serde(rename = "ociVersion", default, skip_serializing_if = "Option::is_none")]
    pub oci_version: Option<String>,
    /// The `runc_id` (container short id).
    pub id: String,
    /// Lifecycle status: `creating`, `created`, `running`, `stopped`, or the
    /// synthesized `exited` once `runc`'s own record is gone.
    pub status: String,
    /// Container init process pid, when `runc` is tracking one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pid: Option<i32>,
    /// Path to the container's bundle directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bundle: Option<String>,
    /// Free-form annotations carried over from the bundle config.
    #[serde(default, skip_serializing_if = "std::collections::BTreeMap::is_empty")]
    pub annotations: std::collections::BTreeMap<String, String>,
}

impl State {
    /// `true` if the runtime can still transition this container (`runc
    /// start` is meaningful in these states).
    #[must_use]
    pub fn is_startable(&self) -> bool {
        matches!(self.status.as_str(), "created" | "stopped")
    }

    /// `true` if the runtime no longer has a live process for this
    /// container (either `runc` said `stopped`/`exited`, or there was no
    /// state file at all).
    #[must_use]
    pub fn is_exited(&self) -> bool {
        matches!(self.status.as_str(), "stopped" | "exited")
    }
}

/// Read `<state_dir>/<runc_id>.state`, or synthesize `{id, status: exited,
/// bundle}` if the file does not exist (the container's process has
/// already exited and `runc` has removed its own bookkeeping).
pub fn query(state_dir: &Path, runc_id: &str, bundle: &Path) -> Result<State> {
    let state_path = state_dir.join(format!("{runc_id}.state"));
    if state_path.is_file() {
        let data = std::fs::read(&state_path)?;
        Ok(serde_json::from_slice(&data)?)
    } else {
        Ok(State {
            oci_version: None,
            id: runc_id.to_string(),
            status: "exited".to_string(),
            pid: None,
            bundle: Some(bundle.display().to_string()),
            annotations: std::collections::BTreeMap::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthesizes_exited_state_when_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        let state = query(dir.path(), "abc123", Path::new("/var/lib/oci/containers/xyz")).unwrap();
        assert_eq!(state.status, "exited");
        assert!(state.is_exited());
        assert!(!state.is_startable());
    }

    #[test]
    fn reads_real_state_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join("abc123.state"),
            br#"{"ociVersion":"1.0.2","id":"abc123","status":"running","pid":42,"bundle":"/b"}"#,
        )
        .unwrap();
        let state = query(dir.path(), "abc123", Path::new("/b")).unwrap();
        assert_eq!(state.status, "running");
        assert_eq!(state.pid, Some(42));
        assert!(!state.is_exited());
    }

    #[test]
    fn startable_states() {
        let mut state = State { oci_version: None, id: "x".into(), status: "created".into(), pid: None, bundle: None, annotations: Default::default() };
        assert!(state.is_startable());
        state.status = "stopped".into();
        assert!(state.is_startable());
        state.status = "running".into();
        assert!(!state.is_startable());
    }
}
