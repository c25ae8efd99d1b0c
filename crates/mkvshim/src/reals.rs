//! Real libc entry points, captured once behind `dlsym(RTLD_NEXT, ..)`.

use libc::{c_char, c_int, c_void, mode_t};
use std::ffi::CStr;
use std::sync::OnceLock;

use crate::error::{Result, ShimError};

pub type OpenFn = unsafe extern "C" fn(*const c_char, c_int, mode_t) -> c_int;
pub type CloseFn = unsafe extern "C" fn(c_int) -> c_int;

/// The uninterposed implementations the shim delegates to.
#[derive(Clone, Copy)]
pub struct RealFns {
    pub open: OpenFn,
    pub open64: OpenFn,
    pub close: CloseFn,
}

impl std::fmt::Debug for RealFns {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealFns")
            .field("open", &(self.open as *const ()))
            .field("open64", &(self.open64 as *const ()))
            .field("close", &(self.close as *const ()))
            .finish()
    }
}

static REAL_FNS: OnceLock<RealFns> = OnceLock::new();

/// Next definition of `name` after the calling object in lookup order.
pub fn lookup_next(name: &'static CStr) -> Result<*mut c_void> {
    let ptr = unsafe { libc::dlsym(libc::RTLD_NEXT, name.as_ptr()) };
    if ptr.is_null() {
        return Err(ShimError::SymbolNotFound(
            name.to_str().unwrap_or("<non-utf8 symbol>"),
        ));
    }
    Ok(ptr)
}

impl RealFns {
    /// Resolve every symbol, failing on the first one missing.
    pub fn resolve() -> Result<Self> {
        let open = lookup_next(c"open")?;
        #[cfg(target_os = "linux")]
        let open64 = lookup_next(c"open64")?;
        #[cfg(not(target_os = "linux"))]
        let open64 = open;
        let close = lookup_next(c"close")?;

        unsafe {
            Ok(Self {
                open: std::mem::transmute::<*mut c_void, OpenFn>(open),
                open64: std::mem::transmute::<*mut c_void, OpenFn>(open64),
                close: std::mem::transmute::<*mut c_void, CloseFn>(close),
            })
        }
    }
}

/// Cached function table.
///
/// Resolution runs at most once per process. A missing symbol aborts: without it
/// every delegated call would recurse into the shim.
pub fn reals() -> &'static RealFns {
    REAL_FNS.get_or_init(|| match RealFns::resolve() {
        Ok(fns) => fns,
        Err(e) => fatal(&e),
    })
}

/// Whether [`reals`] has already run.
pub fn is_resolved() -> bool {
    REAL_FNS.get().is_some()
}

fn fatal(err: &ShimError) -> ! {
    mkvshim_config::log_shim_error!("cannot delegate to libc, aborting", error = %err);
    let msg = format!("mkvshim: fatal: {}\n", err);
    unsafe {
        libc::write(2, msg.as_ptr() as *const c_void, msg.len());
    }
    std::process::abort()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolves_libc_symbols() {
        let fns = RealFns::resolve().unwrap();
        assert!(!(fns.open as *const ()).is_null());
        assert!(!(fns.close as *const ()).is_null());
    }

    #[test]
    fn test_missing_symbol_reported() {
        let err = lookup_next(c"mkvshim_definitely_not_a_symbol").unwrap_err();
        assert!(matches!(err, ShimError::SymbolNotFound("mkvshim_definitely_not_a_symbol")));
    }

    #[test]
    fn test_reals_cached() {
        let a = reals() as *const RealFns;
        let b = reals() as *const RealFns;
        assert_eq!(a, b);
        assert!(is_resolved());
    }

    #[test]
    fn test_real_close_works() {
        let fns = reals();
        let file = tempfile::tempfile().unwrap();
        let fd = std::os::unix::io::IntoRawFd::into_raw_fd(file);
        assert_eq!(unsafe { (fns.close)(fd) }, 0);
    }
}
