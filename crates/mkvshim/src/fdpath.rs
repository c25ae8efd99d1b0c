//! Descriptor-to-path lookup.
//!
//! Best effort and inherently racy: the file can be renamed or unlinked between
//! the lookup and any later use of the path. Callers treat `None` as "unknown".

use libc::c_int;
use std::path::PathBuf;

/// Current path of `fd` in this process, if the OS can tell.
pub fn resolve_fd_path(fd: c_int) -> Option<PathBuf> {
    if fd < 0 {
        return None;
    }
    resolve_impl(fd)
}

#[cfg(target_os = "linux")]
fn resolve_impl(fd: c_int) -> Option<PathBuf> {
    // Unlinked files come back with a " (deleted)" suffix, which the
    // classifier rejects on its own.
    let path = std::fs::read_link(format!("/proc/self/fd/{}", fd)).ok()?;
    path.is_absolute().then_some(path)
}

#[cfg(target_os = "macos")]
fn resolve_impl(fd: c_int) -> Option<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let mut buf = [0 as libc::c_char; libc::PATH_MAX as usize];
    if unsafe { libc::fcntl(fd, libc::F_GETPATH, buf.as_mut_ptr()) } < 0 {
        return None;
    }
    let bytes = unsafe { CStr::from_ptr(buf.as_ptr()) }.to_bytes();
    if bytes.is_empty() {
        return None;
    }
    Some(PathBuf::from(OsStr::from_bytes(bytes)))
}

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
fn resolve_impl(_fd: c_int) -> Option<PathBuf> {
    None
}
