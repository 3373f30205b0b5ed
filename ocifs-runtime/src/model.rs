//! Container entity.

use chrono::{DateTime, Utc};

/// A running (or exited, not-yet-removed) container.
#[derive(Debug, Clone)]
pub struct Container {
    /// Random 256-bit id.
    pub id: String,
    /// Unique human name (auto-generated if the caller didn't supply one).
    pub name: String,
    /// When the container was created.
    pub create_time: DateTime<Utc>,
    /// Image this container was created from.
    pub image_id: String,
    /// The writable filesystem cloned from the image's top layer.
    pub filesystem_id: String,
}

impl Container {
    /// The id `runc` was given — the conventional 12-character short id.
    #[must_use]
    pub fn runc_id(&self) -> &str {
        ocifs_graph::short_id(&self.id)
    }
}
