//! Pre-exec hardening for the `runc` child process.
//!
//! Applied after `fork()` but before `exec()`: die with the parent
//! (`PR_SET_PDEATHSIG`) so a crashed control process never leaves an
//! orphaned `runc` invocation behind. On non-Linux this is a no-op.

use std::process::Command;

/// Install pre-exec hooks on `cmd`.
#[cfg(not(target_os = "linux"))]
pub fn apply(_cmd: &mut Command) {}

/// Install pre-exec hooks on `cmd`.
#[cfg(target_os = "linux")]
pub fn apply(cmd: &mut Command) {
    use std::os::unix::process::CommandExt;

    // SAFETY: prctl is async-signal-safe.
    unsafe {
        cmd.pre_exec(|| {
            libc::prctl(libc::PR_SET_PDEATHSIG, libc::SIGKILL);
            Ok(())
        });
    }
}
