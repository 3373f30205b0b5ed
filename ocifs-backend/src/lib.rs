//! Storage backend adapter: a copy-on-write filesystem abstraction plus the
//! content hashing, compression, and tar packing primitives the graph
//! driver builds layers out of.
//!
//! The only shipped backend is [`zfs::ZfsBackend`]; the [`zfs::StorageBackend`]
//! trait exists so the graph driver can be exercised in tests against a
//! fake implementation without a real ZFS pool.

mod compress;
mod error;
mod hash;
mod tar;
mod zfs;

pub use compress::{ExternalMethod, compress_file, uncompress_file};
pub use error::{BackendError, Result};
pub use hash::{LayerDigest, LayerWriter, sha256_hex};
pub use tar::{pack_dir, unpack_into};
pub use zfs::{ChangeKind, DiffEntry, PropertyValue, StorageBackend, ZfsBackend};
