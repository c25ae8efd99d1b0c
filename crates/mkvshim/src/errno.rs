//! Thread-local `errno` access.
//!
//! Work done after the real `close` must leave the host seeing the errno that
//! call produced; [`SavedErrno`] restores it on drop.

use libc::c_int;

#[cfg(target_os = "linux")]
unsafe fn location() -> *mut c_int {
    libc::__errno_location()
}

#[cfg(target_os = "macos")]
unsafe fn location() -> *mut c_int {
    libc::__error()
}

pub fn get() -> c_int {
    unsafe { *location() }
}

pub fn set(errno: c_int) {
    unsafe { *location() = errno }
}

/// Restores the captured errno on drop, so work done after a delegated call
/// never leaks into what the host observes.
pub struct SavedErrno(c_int);

impl SavedErrno {
    pub fn capture() -> Self {
        Self(get())
    }
}

impl Drop for SavedErrno {
    fn drop(&mut self) {
        set(self.0);
    }
}
