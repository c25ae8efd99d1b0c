//! Process-wide shim context.
//!
//! Built exactly once when the library attaches, torn down exactly once when it
//! detaches. Interceptors only ever see it through [`context`].

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::OnceLock;

use mkvshim_config::{log_config_warn, log_shim_info, Config};

use crate::channel::{Channel, Notify};
use crate::classify::ManagedPolicy;
use crate::guard::ShimGuard;
use crate::reals;

static CONTEXT: OnceLock<ShimContext> = OnceLock::new();

#[derive(Debug)]
pub struct ShimContext {
    policy: ManagedPolicy,
    channel: Channel,
    detached: AtomicBool,
}

impl ShimContext {
    pub fn new(policy: ManagedPolicy, channel: Channel) -> Self {
        Self {
            policy,
            channel,
            detached: AtomicBool::new(false),
        }
    }

    pub fn policy(&self) -> &ManagedPolicy {
        &self.policy
    }

    pub fn channel(&self) -> &Channel {
        &self.channel
    }

    /// `None` for the mode-only deployment, so close skips path resolution.
    pub fn notifier(&self) -> Option<&dyn Notify> {
        match self.channel {
            Channel::Disabled => None,
            _ => Some(&self.channel),
        }
    }

    pub fn is_detached(&self) -> bool {
        self.detached.load(Ordering::Acquire)
    }

    /// Release the channel. Only the first call has any effect.
    pub fn detach(&self) {
        if self.detached.swap(true, Ordering::AcqRel) {
            return;
        }
        self.channel.detach();
    }
}

/// The attached context, if attach has completed.
///
/// Never blocks: hooks running while attach is still in progress (including
/// the attach thread's own file operations) see `None` and pass through.
#[inline]
pub fn context() -> Option<&'static ShimContext> {
    CONTEXT.get()
}

/// Attach using configuration from the environment.
pub fn attach() -> &'static ShimContext {
    let (config, errors) = Config::load();
    mkvshim_config::logging::init_logging(&config.log_filter);
    for e in &errors {
        log_config_warn!("Ignoring invalid setting", error = %e);
    }
    attach_with(&config)
}

/// Resolve the real symbols, then set up the configured channel.
///
/// Symbol resolution failure aborts the process. Later calls return the
/// context built by the first one.
pub fn attach_with(config: &Config) -> &'static ShimContext {
    let _guard = ShimGuard::enter();
    reals::reals();
    CONTEXT.get_or_init(|| {
        let channel = Channel::attach(config);
        log_shim_info!(
            "Attached",
            pid = std::process::id(),
            strategy = %channel.strategy(),
            notifying = channel.is_enabled()
        );
        ShimContext::new(ManagedPolicy::DEFAULT, channel)
    })
}

/// Tear down the context, if any.
pub fn detach() {
    let _guard = ShimGuard::enter();
    if let Some(ctx) = context() {
        ctx.detach();
        log_shim_info!("Detached", pid = std::process::id());
    }
}
