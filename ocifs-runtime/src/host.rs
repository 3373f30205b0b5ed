//! Host identity: the architecture/OS pair an image is checked against at
//! container-create time.
//!
//! The implementation this crate was distilled from derives these from
//! `platform.processor()`/`platform.system()` (`i386` -> `amd64`, `sparc`
//! -> `sparc64`); the mapping below is the same idea applied to Rust's
//! compile-time `std::env::consts` target info, which already gives us the
//! normalized family rather than a raw platform string to parse.

use oci_spec::image::{Arch, Os};

/// The architecture/OS pair of the host this process runs on.
#[must_use]
pub fn detect() -> (Arch, Os) {
    (detect_arch(), detect_os())
}

fn detect_arch() -> Arch {
    match std::env::consts::ARCH {
        "x86_64" => Arch::Amd64,
        "x86" => Arch::I386,
        "aarch64" => Arch::ARM64,
        "arm" => Arch::ARM,
        "mips" => Arch::Mips,
        "mips64" => Arch::Mips64,
        "powerpc64" => Arch::PowerPC64,
        "s390x" => Arch::S390x,
        // no catch-all: Arch is a closed enum mirroring Go's GOARCH list, so
        // an unrecognized build target falls back to the common case rather
        // than failing to compile a match arm.
        _ => Arch::Amd64,
    }
}

fn detect_os() -> Os {
    match std::env::consts::OS {
        "linux" => Os::Linux,
        "macos" => Os::Darwin,
        "freebsd" => Os::FreeBSD,
        "openbsd" => Os::OpenBSD,
        "solaris" => Os::Solaris,
        _ => Os::Linux,
    }
}
