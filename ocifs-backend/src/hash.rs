//! Streaming content hashing for layer blobs.
//!
//! A layer's two identities — the `DiffID` of its uncompressed changeset and
//! the digest of its compressed blob — are both derived from a single pass
//! over the changeset bytes. [`LayerWriter`] tees the uncompressed stream
//! into a SHA-256 hasher, pipes it through a gzip encoder, and tees the
//! encoder's output into a second hasher, so neither representation of the
//! layer is ever buffered wholly in memory.

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::GzEncoder;
use sha2::{Digest, Sha256};

/// Digests and size produced by [`LayerWriter::finish`].
#[derive(Debug, Clone)]
pub struct LayerDigest {
    /// SHA-256 of the uncompressed changeset tar (the OCI `DiffID`), hex-encoded.
    pub diff_id: String,
    /// SHA-256 of the compressed blob, hex-encoded.
    pub layer_id: String,
    /// Size in bytes of the compressed blob.
    pub compressed_size: u64,
}

/// A [`Write`] adapter that hashes everything written through it before
/// forwarding to `inner`.
struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    len: u64,
}

impl<W: Write> Write for HashingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.hasher.update(&buf[..n]);
        self.len += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Writer that gzip-compresses a changeset tar while computing both its
/// uncompressed and compressed SHA-256 digests in a single pass.
pub struct LayerWriter<W: Write> {
    gz: GzEncoder<HashingWriter<W>>,
    uncompressed_hash: Sha256,
}

impl<W: Write> LayerWriter<W> {
    /// Create a writer that streams compressed bytes into `sink`.
    pub fn new(sink: W) -> Self {
        let hashing = HashingWriter { inner: sink, hasher: Sha256::new(), len: 0 };
        Self { gz: GzEncoder::new(hashing, Compression::default()), uncompressed_hash: Sha256::new() }
    }

    /// Flush the gzip stream and return the computed digests.
    pub fn finish(self) -> io::Result<LayerDigest> {
        let hashing = self.gz.finish()?;
        Ok(LayerDigest {
            diff_id: hex_digest(self.uncompressed_hash),
            layer_id: hex_digest(hashing.hasher),
            compressed_size: hashing.len,
        })
    }
}

impl<W: Write> Write for LayerWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.gz.write(buf)?;
        self.uncompressed_hash.update(&buf[..n]);
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.gz.flush()
    }
}

fn hex_digest(hasher: Sha256) -> String {
    hex::encode(hasher.finalize())
}

/// Compute the hex-encoded SHA-256 digest of a byte slice (used for config
/// and manifest blobs, which are never gzipped).
pub fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
