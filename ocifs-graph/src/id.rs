//! Random content-free identifiers.
//!
//! Filesystems, containers, and (indirectly, via manifest hashing) images
//! all share the same 256-bit hex id shape; this module is the one place
//! that generates the random flavor (layer and image ids are always
//! content hashes, never random).

use rand::RngCore;

/// Generate a random 256-bit id, hex-encoded (64 characters), the same
/// shape as a content digest but with no relation to any blob.
#[must_use]
pub fn random_id() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// First 12 characters of an id — the conventional "short id" used in
/// human-facing resolution (`get_image`, `get_container`, …).
#[must_use]
pub fn short_id(id: &str) -> &str {
    &id[..id.len().min(12)]
}
