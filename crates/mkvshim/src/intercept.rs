//! open/close interception.
//!
//! The `*_with` functions hold the logic and take the real implementation and
//! collaborators explicitly; the `*_hook` functions bind them to the process
//! context and are what the exported symbols call.

use libc::{c_char, c_int, mode_t};
use std::ffi::CStr;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

use mkvshim_config::{log_channel_debug, log_channel_warn, log_shim_debug, FORCED_MODE};

use crate::channel::Notify;
use crate::classify::ManagedPolicy;
use crate::errno::SavedErrno;
use crate::error::ShimError;
use crate::fdpath::resolve_fd_path;
use crate::guard::ShimGuard;
use crate::reals::{reals, CloseFn, OpenFn};
use crate::state::context;

static DEFAULT_POLICY: ManagedPolicy = ManagedPolicy::DEFAULT;

/// Mode the real open receives for `path`.
#[inline]
pub fn effective_mode(policy: &ManagedPolicy, path: &[u8], mode: mode_t) -> mode_t {
    if policy.matches(path) {
        FORCED_MODE as mode_t
    } else {
        mode
    }
}

/// Delegate to `real`, forcing 0666 for managed paths.
///
/// The umask can only remove bits, so the override has to happen on the mode
/// argument itself. The result is returned untouched.
pub unsafe fn open_with(
    real: OpenFn,
    policy: &ManagedPolicy,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    if path.is_null() {
        return real(path, flags, mode);
    }
    let bytes = CStr::from_ptr(path).to_bytes();
    let forced = effective_mode(policy, bytes, mode);
    if forced != mode {
        log_shim_debug!(
            "Forcing creation mode",
            path = %Path::new(std::ffi::OsStr::from_bytes(bytes)).display(),
            requested = mode,
            forced = forced
        );
    }
    real(path, flags, forced)
}

/// Delegate to `real` and report the file if it was a completed managed file.
///
/// The path is resolved before the descriptor goes away. The real close's
/// return value and errno are what the caller sees, whatever happens after.
pub unsafe fn close_with(
    real: CloseFn,
    policy: &ManagedPolicy,
    notifier: Option<&dyn Notify>,
    fd: c_int,
) -> c_int {
    let Some(notifier) = notifier else {
        return real(fd);
    };

    let path = resolve_fd_path(fd);
    let ret = real(fd);
    let _errno = SavedErrno::capture();

    if let Some(path) = path {
        if is_completed(policy, &path) {
            deliver(notifier, &path);
        }
    }
    ret
}

/// Managed and non-empty. Stat failures count as "not completed".
pub fn is_completed(policy: &ManagedPolicy, path: &Path) -> bool {
    if !policy.matches(path.as_os_str().as_bytes()) {
        return false;
    }
    match std::fs::metadata(path) {
        Ok(meta) => meta.len() > 0,
        Err(e) => {
            log_shim_debug!("Stat failed after close", path = %path.display(), error = %e);
            false
        }
    }
}

fn deliver(notifier: &dyn Notify, path: &Path) {
    match notifier.notify(path) {
        Ok(()) => log_channel_debug!("Title completed", path = %path.display()),
        Err(ShimError::ChannelDisabled) => {}
        Err(e) => log_channel_warn!("Notification failed", path = %path.display(), error = %e),
    }
}

/// Entry point for the exported `open`.
#[inline]
pub unsafe fn open_hook(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    let real = reals().open;
    let policy = context().map(|ctx| ctx.policy()).unwrap_or(&DEFAULT_POLICY);
    open_with(real, policy, path, flags, mode)
}

/// Entry point for the exported `open64`.
#[inline]
pub unsafe fn open64_hook(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    let real = reals().open64;
    let policy = context().map(|ctx| ctx.policy()).unwrap_or(&DEFAULT_POLICY);
    open_with(real, policy, path, flags, mode)
}

/// Entry point for the exported `close`.
///
/// Passes straight through before attach completes and for closes issued by
/// the shim itself.
#[inline]
pub unsafe fn close_hook(fd: c_int) -> c_int {
    let real = reals().close;
    let Some(_guard) = ShimGuard::enter() else {
        return real(fd);
    };
    match context() {
        Some(ctx) => close_with(real, ctx.policy(), ctx.notifier(), fd),
        None => real(fd),
    }
}
