//! # mkvshim-preload
//!
//! `LD_PRELOAD` shim for the disc ripper.
//!
//! ## Usage
//!
//! ```bash
//! LD_PRELOAD=/usr/lib/libmkvshim_preload.so makemkvcon mkv disc:0 all /output
//! ```
//!
//! Titles created under `/output/` with a `.mkv` extension get mode 0666 no
//! matter what the ripper asks for or what the umask is. Each completed title
//! is reported to the supervisor.
//!
//! ## Environment Variables
//!
//! - `MKVSHIM_NOTIFY`: `fifo` (default), `signal` or `none`
//! - `MKVSHIM_FIFO`: message channel endpoint (default: `/tmp/titles_done`)
//! - `MKVSHIM_SIGNAL_PID`: signal target; defaults to the parent's parent
//! - `MKVSHIM_LOG`: tracing filter (default: `warn`)

#![allow(clippy::missing_safety_doc)]

use libc::{c_char, c_int, mode_t};

use mkvshim::intercept;

// `open` is variadic in C; the mode slot is only meaningful with O_CREAT or
// O_TMPFILE, and it is read that way on every supported ABI.

/// Intercept open()
#[no_mangle]
pub unsafe extern "C" fn open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    intercept::open_hook(path, flags, mode)
}

/// Intercept open64() (glibc large-file alias; used by std and most shells)
#[cfg(target_os = "linux")]
#[no_mangle]
pub unsafe extern "C" fn open64(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    intercept::open64_hook(path, flags, mode)
}

/// Intercept close()
#[no_mangle]
pub unsafe extern "C" fn close(fd: c_int) -> c_int {
    intercept::close_hook(fd)
}

// ============================================================================
// Module initialization (constructor / destructor)
// ============================================================================

/// Called when the library is loaded
#[used]
#[cfg_attr(target_os = "linux", link_section = ".init_array")]
#[cfg_attr(target_os = "macos", link_section = "__DATA,__mod_init_func")]
static INIT: extern "C" fn() = {
    extern "C" fn init() {
        mkvshim::attach();
    }
    init
};

/// Called when the library is unloaded or the process exits
#[used]
#[cfg_attr(target_os = "linux", link_section = ".fini_array")]
#[cfg_attr(target_os = "macos", link_section = "__DATA,__mod_term_func")]
static FINI: extern "C" fn() = {
    extern "C" fn fini() {
        mkvshim::detach();
    }
    fini
};
