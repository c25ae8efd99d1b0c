//! Per-thread recursion guard.
//!
//! The shim itself opens and closes files (procfs, the channel endpoint). Those
//! calls land back in the interposed entry points; while a guard is held they
//! must pass straight through.

use std::cell::Cell;

thread_local! {
    static IN_SHIM: Cell<bool> = const { Cell::new(false) };
}

pub struct ShimGuard(());

impl ShimGuard {
    /// `None` if this thread is already inside the shim, or if its TLS is gone
    /// (thread teardown).
    pub fn enter() -> Option<Self> {
        IN_SHIM
            .try_with(|flag| {
                if flag.replace(true) {
                    None
                } else {
                    Some(ShimGuard(()))
                }
            })
            .ok()
            .flatten()
    }

    #[cfg(test)]
    fn is_active() -> bool {
        IN_SHIM.try_with(Cell::get).unwrap_or(true)
    }
}

impl Drop for ShimGuard {
    fn drop(&mut self) {
        let _ = IN_SHIM.try_with(|flag| flag.set(false));
    }
}
