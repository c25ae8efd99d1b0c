//! # mkvshim
//!
//! Interception logic behind the `mkvshim-preload` shared object.
//!
//! The preload library exports `open`, `open64` and `close`; every one of them
//! lands in [`intercept`]. Output titles under `/output/` ending in `.mkv` are
//! created with mode 0666 regardless of umask, and each completed (closed,
//! non-empty) title is reported to the supervising script through the configured
//! [`channel`].
//!
//! Everything else is a transparent passthrough: the host always sees exactly
//! what libc returned.

// Allow unsafe FFI functions without safety docs - these are inherently unsafe C ABI
#![allow(clippy::missing_safety_doc)]

#[cfg(not(any(target_os = "linux", target_os = "macos")))]
compile_error!("mkvshim supports Linux and macOS only");

pub mod channel;
pub mod classify;
pub mod errno;
pub mod error;
pub mod fdpath;
pub mod guard;
pub mod intercept;
pub mod reals;
pub mod state;

pub use channel::{Channel, Notify};
pub use classify::{is_managed, ManagedPolicy};
pub use error::{Result, ShimError};
pub use state::{attach, attach_with, context, detach, ShimContext};
